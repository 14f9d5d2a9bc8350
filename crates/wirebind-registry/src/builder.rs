//! Registration phase of the registry.
//!
//! A [`RegistryBuilder`] accumulates descriptors on a single thread at
//! startup. [`RegistryBuilder::build`] is the one-way transition into the
//! serving phase: it validates every cross-reference and produces an
//! immutable [`Registry`]. There is no way back.
//!
//! Registration conflicts are fatal. A duplicate name or handle is rejected
//! when it is registered, and the rejection is remembered so that `build()`
//! refuses to produce a registry at all.
//!
//! # Example
//!
//! ```
//! use wirebind_core::{MethodKind, TypeHash, TypeKind};
//! use wirebind_registry::{MethodDef, RegistryBuilder};
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register_default_primitives().unwrap();
//! let point = builder.register_class("Point", TypeKind::value::<[f64; 2]>(), None).unwrap();
//! builder
//!     .register_method(MethodDef::member(
//!         point,
//!         MethodKind::Constructor,
//!         "Point",
//!         vec![TypeHash::from_name("float64_t"), TypeHash::from_name("float64_t")],
//!         point,
//!     ))
//!     .unwrap();
//!
//! let registry = builder.build().unwrap();
//! assert_eq!(registry.class(point).unwrap().constructors.len(), 1);
//! ```

use rustc_hash::{FxHashMap, FxHashSet};
use wirebind_core::{EntityKind, MethodKind, PrimitiveFlags, RegistrationError, TypeHash, TypeKind};

use crate::descriptors::{
    ClassDescriptor, MethodDef, MethodDescriptor, PrimitiveDescriptor, TypeDescriptor, ValueExport,
};
use crate::primitive::{NativeBuiltin, NativePrimitive};
use crate::registry::{Registry, TypeSlot};

/// Accumulates descriptors during the registration phase.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    primitives: Vec<PrimitiveDescriptor>,
    types: Vec<TypeDescriptor>,
    classes: Vec<ClassDescriptor>,
    methods: Vec<MethodDescriptor>,
    values: Vec<ValueExport>,

    /// Primitive and type names share one namespace
    type_names: FxHashMap<String, TypeHash>,
    /// Primitive and type handles share one handle space
    type_ids: FxHashMap<TypeHash, EntityKind>,
    method_ids: FxHashSet<TypeHash>,
    /// (owner, kind, name, arity) of every method; overloads differ by arity
    signatures: FxHashSet<(Option<TypeHash>, MethodKind, String, usize)>,
    value_names: FxHashSet<String>,

    /// Every rejected registration; any entry blocks `build()`
    errors: Vec<RegistrationError>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject<T>(&mut self, error: RegistrationError) -> Result<T, RegistrationError> {
        log::error!("registration rejected: {}", error);
        self.errors.push(error.clone());
        Err(error)
    }

    fn type_conflict(&self, name: &str, id: TypeHash) -> Option<RegistrationError> {
        if let Some(existing) = self.type_names.get(name) {
            let kind = self.type_ids.get(existing).copied().unwrap_or(EntityKind::Type);
            return Some(RegistrationError::DuplicateName {
                name: name.to_string(),
                kind,
            });
        }
        self.type_ids
            .get(&id)
            .map(|kind| RegistrationError::DuplicateHandle {
                handle: id,
                kind: *kind,
            })
    }

    fn claim_type(&mut self, name: &str, id: TypeHash, kind: EntityKind) {
        self.type_names.insert(name.to_string(), id);
        self.type_ids.insert(id, kind);
    }

    // =========================================================================
    // Primitives and types
    // =========================================================================

    /// Register a primitive by size (in bytes) and flags.
    ///
    /// The name, and from it the handle, derive from the flags.
    pub fn register_primitive_raw(
        &mut self,
        size: u32,
        flags: PrimitiveFlags,
    ) -> Result<TypeHash, RegistrationError> {
        let descriptor = PrimitiveDescriptor::new(size, flags);
        if let Some(conflict) = self.type_conflict(&descriptor.name, descriptor.id) {
            return self.reject(conflict);
        }
        log::debug!("registered primitive {} ({})", descriptor.name, descriptor.id);
        let id = descriptor.id;
        self.claim_type(&descriptor.name, id, EntityKind::Primitive);
        self.primitives.push(descriptor);
        Ok(id)
    }

    /// Register a Rust numeric type as a primitive.
    pub fn register_primitive<T: NativePrimitive>(&mut self) -> Result<TypeHash, RegistrationError> {
        self.register_primitive_raw(T::SIZE, T::FLAGS)
    }

    /// Register a type that is not a class.
    pub fn register_type(
        &mut self,
        name: &str,
        kind: TypeKind,
    ) -> Result<TypeHash, RegistrationError> {
        let id = TypeHash::from_name(name);
        if let Some(conflict) = self.type_conflict(name, id) {
            return self.reject(conflict);
        }
        log::debug!("registered type {} ({})", name, id);
        self.claim_type(name, id, EntityKind::Type);
        self.types.push(TypeDescriptor {
            id,
            name: name.to_string(),
            kind,
            class: None,
        });
        Ok(id)
    }

    /// Register a Rust builtin (`bool`, `String`, ...) under its wire name.
    pub fn register_builtin<T: NativeBuiltin>(&mut self) -> Result<TypeHash, RegistrationError> {
        self.register_type(T::TYPE_NAME, T::kind())
    }

    /// Register every Rust numeric primitive and the builtins the
    /// conversion layer understands (`void`, `bool`, `char32_t`,
    /// `std::string`, `size_t`, `ssize_t`, `object`).
    pub fn register_default_primitives(&mut self) -> Result<(), RegistrationError> {
        self.register_primitive::<i8>()?;
        self.register_primitive::<i16>()?;
        self.register_primitive::<i32>()?;
        self.register_primitive::<i64>()?;
        self.register_primitive::<u8>()?;
        self.register_primitive::<u16>()?;
        self.register_primitive::<u32>()?;
        self.register_primitive::<u64>()?;
        self.register_primitive::<f32>()?;
        self.register_primitive::<f64>()?;

        self.register_builtin::<()>()?;
        self.register_builtin::<bool>()?;
        self.register_builtin::<char>()?;
        self.register_builtin::<String>()?;
        self.register_builtin::<isize>()?;
        self.register_builtin::<usize>()?;
        self.register_builtin::<wirebind_core::ObjectHandle>()?;
        Ok(())
    }

    // =========================================================================
    // Classes
    // =========================================================================

    /// Register a class together with its three type views: `Name`,
    /// `Name *` and `const Name *`.
    ///
    /// Returns the class handle, which is also the handle of `Name`.
    pub fn register_class(
        &mut self,
        name: &str,
        kind: TypeKind,
        base: Option<TypeHash>,
    ) -> Result<TypeHash, RegistrationError> {
        let id = TypeHash::from_name(name);
        let pointer_name = format!("{} *", name);
        let const_pointer_name = format!("const {} *", name);
        let pointer_id = TypeHash::from_name(&pointer_name);
        let const_pointer_id = TypeHash::from_name(&const_pointer_name);

        // all three views or none
        for (view_name, view_id) in [
            (name, id),
            (pointer_name.as_str(), pointer_id),
            (const_pointer_name.as_str(), const_pointer_id),
        ] {
            if let Some(conflict) = self.type_conflict(view_name, view_id) {
                let conflict = match conflict {
                    RegistrationError::DuplicateName { name, .. } if view_id == id => {
                        RegistrationError::DuplicateName {
                            name,
                            kind: EntityKind::Class,
                        }
                    }
                    other => other,
                };
                return self.reject(conflict);
            }
        }

        for (view_name, view_id, view_kind) in [
            (name.to_string(), id, kind),
            (pointer_name, pointer_id, TypeKind::pointer(id, false)),
            (const_pointer_name, const_pointer_id, TypeKind::pointer(id, true)),
        ] {
            self.claim_type(&view_name, view_id, EntityKind::Type);
            self.types.push(TypeDescriptor {
                id: view_id,
                name: view_name,
                kind: view_kind,
                class: Some(id),
            });
        }

        log::debug!("registered class {} ({})", name, id);
        self.classes.push(ClassDescriptor {
            id,
            name: name.to_string(),
            value_type: id,
            pointer_type: pointer_id,
            const_pointer_type: const_pointer_id,
            base,
            constructors: Vec::new(),
            methods: Vec::new(),
        });
        Ok(id)
    }

    // =========================================================================
    // Methods and values
    // =========================================================================

    /// Register a constructor, method, accessor or function.
    ///
    /// Overloads of one name are told apart by arity, so a second member
    /// with the same owner, kind, name and arity is rejected. Type
    /// references are checked by [`build`](Self::build), so classes and
    /// their members may register in any order.
    pub fn register_method(&mut self, def: MethodDef) -> Result<TypeHash, RegistrationError> {
        let arity = def.arg_types.len();
        if let Err(e) = def.policies.validate(arity) {
            return self.reject(e);
        }

        let signature = (def.owner, def.kind, def.name.clone(), arity);
        if self.signatures.contains(&signature) {
            return self.reject(RegistrationError::DuplicateName {
                name: format!("{}/{}", def.name, arity),
                kind: EntityKind::Method,
            });
        }

        let id = def.id();
        if self.method_ids.contains(&id) {
            return self.reject(RegistrationError::DuplicateHandle {
                handle: id,
                kind: EntityKind::Method,
            });
        }

        log::debug!("registered {} {} ({}, arity {})", def.kind, def.name, id, arity);
        self.method_ids.insert(id);
        self.signatures.insert(signature);
        self.methods.push(MethodDescriptor {
            id,
            owner: def.owner,
            name: def.name,
            kind: def.kind,
            policies: def.policies.resolve(arity),
            arg_types: def.arg_types,
            return_type: def.return_type,
        });
        Ok(id)
    }

    /// Export a named value whose producer is the method `exporter`.
    pub fn bind_value(&mut self, name: &str, exporter: TypeHash) -> Result<(), RegistrationError> {
        if self.value_names.contains(name) {
            return self.reject(RegistrationError::DuplicateName {
                name: name.to_string(),
                kind: EntityKind::Value,
            });
        }
        log::debug!("bound value {} -> {}", name, exporter);
        self.value_names.insert(name.to_string());
        self.values.push(ValueExport {
            name: name.to_string(),
            exporter,
        });
        Ok(())
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Look up a registered primitive or type by name.
    pub fn lookup_type(&self, name: &str) -> Option<TypeHash> {
        self.type_names.get(name).copied()
    }

    pub fn has_type(&self, id: TypeHash) -> bool {
        self.type_ids.contains_key(&id)
    }

    pub fn has_method(&self, id: TypeHash) -> bool {
        self.method_ids.contains(&id)
    }

    /// True once any registration has been rejected.
    pub fn is_poisoned(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[RegistrationError] {
        &self.errors
    }

    // =========================================================================
    // Build
    // =========================================================================

    fn check_references(&self) -> Vec<RegistrationError> {
        let class_ids: FxHashSet<TypeHash> = self.classes.iter().map(|c| c.id).collect();
        let mut errors = Vec::new();
        let mut missing = |handle: TypeHash, referenced_by: &str| {
            errors.push(RegistrationError::TypeNotFound {
                handle,
                referenced_by: referenced_by.to_string(),
            });
        };

        for class in &self.classes {
            if let Some(base) = class.base
                && !class_ids.contains(&base)
            {
                missing(base, &class.name);
            }
        }

        for method in &self.methods {
            if let Some(owner) = method.owner
                && !class_ids.contains(&owner)
            {
                missing(owner, &method.name);
            }
            for ty in method.arg_types.iter().chain([&method.return_type]) {
                if !self.type_ids.contains_key(ty) {
                    missing(*ty, &method.name);
                }
            }
        }

        for value in &self.values {
            if !self.method_ids.contains(&value.exporter) {
                missing(value.exporter, &value.name);
            }
        }

        errors
    }

    /// Freeze into a serving [`Registry`].
    ///
    /// # Errors
    ///
    /// Every registration rejected earlier, or, if there were none, every
    /// reference to a class or type that was never registered.
    pub fn build(mut self) -> Result<Registry, Vec<RegistrationError>> {
        if !self.errors.is_empty() {
            log::error!(
                "registry not frozen: {} registration(s) were rejected",
                self.errors.len()
            );
            return Err(self.errors);
        }

        let errors = self.check_references();
        if !errors.is_empty() {
            for e in &errors {
                log::error!("registry not frozen: {}", e);
            }
            return Err(errors);
        }

        let class_index: FxHashMap<TypeHash, usize> = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();

        for method in &self.methods {
            let Some(class) = method
                .owner
                .and_then(|owner| class_index.get(&owner))
                .and_then(|&i| self.classes.get_mut(i))
            else {
                continue;
            };
            if method.kind == MethodKind::Constructor {
                class.constructors.push(method.id);
            } else {
                class.methods.push(method.id);
            }
        }

        let mut type_index = FxHashMap::default();
        for (i, p) in self.primitives.iter().enumerate() {
            type_index.insert(p.id, TypeSlot::Primitive(i));
        }
        for (i, t) in self.types.iter().enumerate() {
            type_index.insert(t.id, TypeSlot::Type(i));
        }
        let method_index = self.methods.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
        let value_index = self
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.clone(), i))
            .collect();

        log::debug!(
            "registry frozen: {} primitives, {} types, {} classes, {} methods, {} values",
            self.primitives.len(),
            self.types.len(),
            self.classes.len(),
            self.methods.len(),
            self.values.len()
        );

        Ok(Registry {
            primitives: self.primitives,
            types: self.types,
            classes: self.classes,
            methods: self.methods,
            values: self.values,
            type_index,
            type_names: self.type_names,
            class_index,
            method_index,
            value_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirebind_core::{Policy, PolicyList};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn builder_with_defaults() -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();
        builder.register_default_primitives().unwrap();
        builder
    }

    #[test]
    fn duplicate_primitive_is_rejected() {
        init_logging();
        let mut builder = builder_with_defaults();
        let err = builder.register_primitive::<i32>().unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateName {
                name: "int32_t".into(),
                kind: EntityKind::Primitive,
            }
        );
        assert!(builder.is_poisoned());
        assert_eq!(builder.build().unwrap_err(), vec![err]);
    }

    #[test]
    fn duplicate_class_is_rejected_atomically() {
        init_logging();
        let mut builder = builder_with_defaults();
        builder.register_class("Point", TypeKind::value::<u64>(), None).unwrap();
        let types_before = builder.types.len();

        let err = builder
            .register_class("Point", TypeKind::value::<u64>(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::DuplicateName { kind: EntityKind::Class, .. }
        ));
        assert_eq!(builder.types.len(), types_before);
        assert_eq!(builder.classes.len(), 1);
    }

    #[test]
    fn class_registers_three_views() {
        let mut builder = RegistryBuilder::new();
        let id = builder.register_class("Point", TypeKind::value::<u64>(), None).unwrap();
        assert_eq!(builder.lookup_type("Point"), Some(id));
        assert!(builder.lookup_type("Point *").is_some());
        assert!(builder.lookup_type("const Point *").is_some());
        assert_eq!(builder.types.len(), 3);
    }

    #[test]
    fn duplicate_method_is_rejected() {
        let mut builder = builder_with_defaults();
        let void = TypeHash::from_name("void");
        builder.register_method(MethodDef::function("tick", vec![], void)).unwrap();
        let err = builder
            .register_method(MethodDef::function("tick", vec![], void))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::DuplicateName { kind: EntityKind::Method, .. }
        ));
    }

    #[test]
    fn overloads_by_argument_types_coexist() {
        let mut builder = builder_with_defaults();
        let void = TypeHash::from_name("void");
        let int = TypeHash::from_name("int32_t");
        let a = builder.register_method(MethodDef::function("tick", vec![], void)).unwrap();
        let b = builder
            .register_method(MethodDef::function("tick", vec![int], void))
            .unwrap();
        assert_ne!(a, b);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn same_arity_overloads_are_rejected() {
        let mut builder = builder_with_defaults();
        let void = TypeHash::from_name("void");
        let int = TypeHash::from_name("int32_t");
        let float = TypeHash::from_name("float64_t");
        builder
            .register_method(MethodDef::function("tick", vec![int], void))
            .unwrap();
        let err = builder
            .register_method(MethodDef::function("tick", vec![float], void))
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateName {
                name: "tick/1".into(),
                kind: EntityKind::Method,
            }
        );
    }

    #[test]
    fn out_of_range_policy_is_rejected() {
        let mut builder = builder_with_defaults();
        let void = TypeHash::from_name("void");
        let def = MethodDef::function("tick", vec![], void)
            .with_policies(PolicyList::new().with(0, Policy::Nullable));
        assert!(matches!(
            builder.register_method(def),
            Err(RegistrationError::PolicyOutOfRange { index: 0, arity: 0, .. })
        ));
    }

    #[test]
    fn dangling_references_fail_build() {
        init_logging();
        let mut builder = builder_with_defaults();
        let ghost = TypeHash::from_name("Ghost");
        builder
            .register_method(MethodDef::member(
                ghost,
                MethodKind::Method,
                "haunt",
                vec![TypeHash::from_name("Chain")],
                TypeHash::from_name("void"),
            ))
            .unwrap();
        builder.bind_value("spirit", TypeHash(1)).unwrap();

        let errors = builder.build().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, RegistrationError::TypeNotFound { .. })));
    }

    #[test]
    fn duplicate_value_export_is_rejected() {
        let mut builder = builder_with_defaults();
        let void = TypeHash::from_name("void");
        let f = builder.register_method(MethodDef::function("make", vec![], void)).unwrap();
        builder.bind_value("origin", f).unwrap();
        assert!(builder.bind_value("origin", f).is_err());
        assert!(builder.build().is_err());
    }

    #[test]
    fn members_attach_to_their_class() {
        let mut builder = builder_with_defaults();
        let void = TypeHash::from_name("void");
        let point = builder.register_class("Point", TypeKind::value::<u64>(), None).unwrap();
        let ctor = builder
            .register_method(MethodDef::member(point, MethodKind::Constructor, "Point", vec![], point))
            .unwrap();
        let reset = builder
            .register_method(MethodDef::member(point, MethodKind::Method, "reset", vec![], void))
            .unwrap();

        let registry = builder.build().unwrap();
        let class = registry.class(point).unwrap();
        assert_eq!(class.constructors, vec![ctor]);
        assert_eq!(class.methods, vec![reset]);
    }
}
