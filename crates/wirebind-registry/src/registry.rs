//! Serving phase of the registry.

use rustc_hash::FxHashMap;
use wirebind_core::{TypeHash, UnknownTypeError};

use crate::descriptors::{
    ClassDescriptor, MethodDescriptor, PrimitiveDescriptor, TypeDescriptor, ValueExport,
};
use crate::visitor::{CallbackVisitor, ReflectVisitor, TypeDetail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeSlot {
    Primitive(usize),
    Type(usize),
}

/// Immutable catalog of everything bound, produced by
/// [`RegistryBuilder::build`](crate::RegistryBuilder::build).
///
/// A `Registry` is read-only, so it can be shared behind an `Arc` and
/// queried from any thread without locking. Descriptors are stored in
/// registration order, which is the order `reflect` reports them in.
#[derive(Debug)]
pub struct Registry {
    pub(crate) primitives: Vec<PrimitiveDescriptor>,
    pub(crate) types: Vec<TypeDescriptor>,
    pub(crate) classes: Vec<ClassDescriptor>,
    pub(crate) methods: Vec<MethodDescriptor>,
    pub(crate) values: Vec<ValueExport>,

    pub(crate) type_index: FxHashMap<TypeHash, TypeSlot>,
    pub(crate) type_names: FxHashMap<String, TypeHash>,
    pub(crate) class_index: FxHashMap<TypeHash, usize>,
    pub(crate) method_index: FxHashMap<TypeHash, usize>,
    pub(crate) value_index: FxHashMap<String, usize>,
}

impl Registry {
    // =========================================================================
    // Reflection
    // =========================================================================

    /// Report every descriptor to `visitor`: all primitives, then all types,
    /// then all classes, then all methods, each in registration order.
    pub fn reflect<V: ReflectVisitor + ?Sized>(&self, visitor: &mut V) {
        for primitive in &self.primitives {
            visitor.visit_primitive(primitive);
        }
        for ty in &self.types {
            visitor.visit_type(ty);
        }
        for class in &self.classes {
            visitor.visit_class(class);
        }
        for method in &self.methods {
            visitor.visit_method(method);
        }
    }

    /// [`reflect`](Self::reflect) with one callback per category.
    pub fn reflect_with(
        &self,
        on_primitive: impl FnMut(&PrimitiveDescriptor),
        on_type: impl FnMut(&TypeDescriptor),
        on_class: impl FnMut(&ClassDescriptor),
        on_method: impl FnMut(&MethodDescriptor),
    ) {
        self.reflect(&mut CallbackVisitor {
            on_primitive,
            on_type,
            on_class,
            on_method,
        });
    }

    /// Resolve a type handle.
    ///
    /// # Errors
    ///
    /// [`UnknownTypeError`] if nothing was registered under `handle`.
    pub fn query_type(&self, handle: TypeHash) -> Result<TypeDetail<'_>, UnknownTypeError> {
        let detail = match self.type_index.get(&handle) {
            Some(TypeSlot::Primitive(i)) => self.primitives.get(*i).map(TypeDetail::Primitive),
            Some(TypeSlot::Type(i)) => self.types.get(*i).map(|descriptor| TypeDetail::Type {
                descriptor,
                class: descriptor.class.and_then(|c| self.class(c)),
            }),
            None => None,
        };
        detail.ok_or_else(|| {
            log::debug!("query for unknown type handle {}", handle);
            UnknownTypeError { handle }
        })
    }

    /// Resolve a type handle and hand the result to `out_type_detail`.
    ///
    /// The callback is not invoked for an unknown handle.
    pub fn query_type_with<R>(
        &self,
        handle: TypeHash,
        out_type_detail: impl FnOnce(TypeDetail<'_>) -> R,
    ) -> Result<R, UnknownTypeError> {
        self.query_type(handle).map(out_type_detail)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn lookup_type(&self, name: &str) -> Option<TypeHash> {
        self.type_names.get(name).copied()
    }

    pub fn class(&self, handle: TypeHash) -> Option<&ClassDescriptor> {
        self.class_index.get(&handle).and_then(|&i| self.classes.get(i))
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassDescriptor> {
        self.lookup_type(name).and_then(|id| self.class(id))
    }

    pub fn method(&self, id: TypeHash) -> Option<&MethodDescriptor> {
        self.method_index.get(&id).and_then(|&i| self.methods.get(i))
    }

    pub fn value_export(&self, name: &str) -> Option<&ValueExport> {
        self.value_index.get(name).and_then(|&i| self.values.get(i))
    }

    pub fn primitives(&self) -> &[PrimitiveDescriptor] {
        &self.primitives
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    pub fn classes(&self) -> &[ClassDescriptor] {
        &self.classes
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn value_exports(&self) -> &[ValueExport] {
        &self.values
    }
}
