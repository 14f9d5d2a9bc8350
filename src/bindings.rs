//! The host-integration surface.
//!
//! [`BindingsBuilder`] is the Registration phase: classes, free functions
//! and exported values are bound through it, and [`BindingsBuilder::build`]
//! freezes them into [`Bindings`], the Serving phase. `Bindings` pairs the
//! frozen [`Registry`] with the callable tables the host dispatches into.
//!
//! Every member call resolves its overload by name and argument count, then
//! converts the arguments under the policies recorded in the registry.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use wirebind_core::{
    ArgList, ArgPolicy, BindError, ConversionError, IntoWire, MethodKind, NativeClass,
    NativeError, ObjectHandle, ObjectHeap, PolicyList, RegistrationError, TypeHash, TypeKind,
    UnknownTypeError, WireValue,
};
use wirebind_registry::{
    ClassDescriptor, MethodDef, MethodDescriptor, PrimitiveDescriptor, Registry, RegistryBuilder,
    ReflectVisitor, TypeDescriptor, TypeDetail,
};

use crate::call_context::CallContext;
use crate::class_builder::{CONSTRUCTOR_NAME, ClassBuilder};
use crate::creator::ConstructorFn;
use crate::native_fn::NativeFn;
use crate::storage::ArgStorage;

/// Runtime configuration of a [`BindingsBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingsConfig {
    /// Signature-wide baseline prepended to every bound policy list.
    pub default_policy: ArgPolicy,
    /// Register the Rust primitives and builtins on creation.
    pub register_default_primitives: bool,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            default_policy: ArgPolicy::BY_VALUE,
            register_default_primitives: true,
        }
    }
}

/// Overload ids by owner and kind, then by name.
type OverloadTable = FxHashMap<(Option<TypeHash>, MethodKind), FxHashMap<String, Vec<TypeHash>>>;

// ============================================================================
// Registration phase
// ============================================================================

/// Collects bindings until [`build`](Self::build).
pub struct BindingsBuilder {
    config: BindingsConfig,
    registry: RegistryBuilder,
    constructors: FxHashMap<TypeHash, Arc<dyn ConstructorFn>>,
    natives: FxHashMap<TypeHash, NativeFn>,
    class_by_type: FxHashMap<TypeId, TypeHash>,
}

impl BindingsBuilder {
    pub fn new() -> Self {
        Self::with_config(BindingsConfig::default())
    }

    pub fn with_config(config: BindingsConfig) -> Self {
        let mut registry = RegistryBuilder::new();
        if config.register_default_primitives {
            // a rejection poisons the registry builder and resurfaces in build()
            if let Err(err) = registry.register_default_primitives() {
                log::warn!("default primitives not registered: {err}");
            }
        }
        Self {
            config,
            registry,
            constructors: FxHashMap::default(),
            natives: FxHashMap::default(),
            class_by_type: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> &BindingsConfig {
        &self.config
    }

    /// The underlying registry builder, for primitives and plain types.
    pub fn registry(&self) -> &RegistryBuilder {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RegistryBuilder {
        &mut self.registry
    }

    /// Register a named type that is not a bound class.
    pub fn register_type(&mut self, name: &str, kind: TypeKind) -> Result<TypeHash, RegistrationError> {
        self.registry.register_type(name, kind)
    }

    /// Start binding `T` as a class named [`NativeClass::NAME`].
    pub fn register_class<T: NativeClass>(&mut self) -> ClassBuilder<'_, T> {
        ClassBuilder::new(self)
    }

    pub(crate) fn add_constructor(
        &mut self,
        def: MethodDef,
        creator: Arc<dyn ConstructorFn>,
    ) -> Result<TypeHash, RegistrationError> {
        let id = self.registry.register_method(def)?;
        self.constructors.insert(id, creator);
        Ok(id)
    }

    pub(crate) fn add_native(&mut self, def: MethodDef, f: NativeFn) -> Result<TypeHash, RegistrationError> {
        let id = self.registry.register_method(def)?;
        self.natives.insert(id, f);
        Ok(id)
    }

    pub(crate) fn map_class(&mut self, type_id: TypeId, class: TypeHash) {
        self.class_by_type.insert(type_id, class);
    }

    fn function_def(&self, name: &str, arg_types: Vec<TypeHash>, return_type: TypeHash, policies: PolicyList) -> MethodDef {
        MethodDef::function(name, arg_types, return_type)
            .with_policies(policies.with_baseline(self.config.default_policy))
    }

    /// Bind a free function.
    pub fn function<A, R, F>(&mut self, name: &str, f: F) -> Result<TypeHash, RegistrationError>
    where
        A: ArgList + 'static,
        R: IntoWire + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.function_with(name, PolicyList::new(), f)
    }

    /// Bind a free function with explicit argument policies.
    pub fn function_with<A, R, F>(
        &mut self,
        name: &str,
        policies: PolicyList,
        f: F,
    ) -> Result<TypeHash, RegistrationError>
    where
        A: ArgList + 'static,
        R: IntoWire + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.function_raw(name, A::type_hashes(), R::type_hash(), policies, move |ctx: &mut CallContext<'_>| {
            let args: A = ctx.args()?;
            let ret = f(args);
            ctx.set_return(ret)
        })
    }

    /// Bind a free function that works on the [`CallContext`] directly.
    pub fn function_raw<F>(
        &mut self,
        name: &str,
        arg_types: Vec<TypeHash>,
        return_type: TypeHash,
        policies: PolicyList,
        f: F,
    ) -> Result<TypeHash, RegistrationError>
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), BindError> + Send + Sync + 'static,
    {
        let def = self.function_def(name, arg_types, return_type, policies);
        let native = NativeFn::new(def.id(), f);
        self.add_native(def, native)
    }

    /// Export a named value produced by `f` each time the host reads it.
    pub fn bind_value<R, F>(&mut self, name: &str, f: F) -> Result<(), RegistrationError>
    where
        R: IntoWire + 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        let exporter = self.function(name, move |(): ()| f())?;
        self.registry.bind_value(name, exporter)
    }

    /// Freeze every binding.
    ///
    /// # Errors
    ///
    /// All registration errors, as reported by [`RegistryBuilder::build`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(self) -> Result<Bindings, Vec<RegistrationError>> {
        let registry = self.registry.build()?;

        let mut overloads = OverloadTable::default();
        for method in registry.methods() {
            overloads
                .entry((method.owner, method.kind))
                .or_default()
                .entry(method.name.clone())
                .or_default()
                .push(method.id);
        }

        log::debug!(
            "bindings frozen: {} constructors, {} native functions, {} classes",
            self.constructors.len(),
            self.natives.len(),
            self.class_by_type.len()
        );

        Ok(Bindings {
            registry: Arc::new(registry),
            constructors: self.constructors,
            natives: self.natives,
            overloads,
            class_by_type: self.class_by_type,
        })
    }
}

impl Default for BindingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BindingsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingsBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("constructors", &self.constructors.len())
            .field("natives", &self.natives.len())
            .finish()
    }
}

// ============================================================================
// Serving phase
// ============================================================================

/// Frozen bindings: the registry plus everything the host can call.
///
/// Cloning is cheap and every clone serves the same registry.
#[derive(Clone)]
pub struct Bindings {
    registry: Arc<Registry>,
    constructors: FxHashMap<TypeHash, Arc<dyn ConstructorFn>>,
    natives: FxHashMap<TypeHash, NativeFn>,
    overloads: OverloadTable,
    class_by_type: FxHashMap<TypeId, TypeHash>,
}

impl Bindings {
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Class handle of a bound Rust type.
    pub fn class_id<T: NativeClass>(&self) -> Option<TypeHash> {
        self.class_by_type.get(&TypeId::of::<T>()).copied()
    }

    fn class(&self, class: TypeHash) -> Result<&ClassDescriptor, UnknownTypeError> {
        self.registry
            .class(class)
            .ok_or(UnknownTypeError { handle: class })
    }

    /// Class of a heap object, from the Rust type it was allocated as.
    fn class_of(&self, this: ObjectHandle) -> Result<TypeHash, NativeError> {
        self.class_by_type
            .get(&this.type_id)
            .copied()
            .ok_or_else(|| NativeError::invalid_this("object of a type that is not bound as a class"))
    }

    /// Pick the overload of `name` taking `arity` arguments.
    ///
    /// `Ok(None)` means the name is bound but no overload fits and more
    /// than one exists.
    fn overload(
        &self,
        owner: Option<TypeHash>,
        kind: MethodKind,
        name: &str,
        arity: usize,
    ) -> Result<Option<TypeHash>, BindError> {
        let candidates = self
            .overloads
            .get(&(owner, kind))
            .and_then(|by_name| by_name.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut sole = None;
        for id in candidates {
            let Some(method) = self.registry.method(*id) else {
                continue;
            };
            if method.arity() == arity {
                return Ok(Some(*id));
            }
            sole = Some(method.arity());
        }
        match (candidates.len(), sole) {
            (0, _) => Err(NativeError::UnknownFunction {
                name: name.to_string(),
            }
            .into()),
            (1, Some(expected)) => Err(ConversionError::ArityMismatch {
                expected,
                actual: arity,
            }
            .into()),
            _ => Ok(None),
        }
    }

    fn resolve_constructor(&self, class: TypeHash, arity: usize) -> Result<&Arc<dyn ConstructorFn>, BindError> {
        let descriptor = self.class(class)?;
        let no_constructor = || NativeError::NoConstructor {
            class: descriptor.name.clone(),
            arity,
        };
        let id = match self.overload(Some(class), MethodKind::Constructor, CONSTRUCTOR_NAME, arity) {
            Ok(Some(id)) => id,
            Ok(None) | Err(BindError::Native(NativeError::UnknownFunction { .. })) => {
                return Err(no_constructor().into());
            }
            Err(e) => return Err(e),
        };
        self.constructors.get(&id).ok_or_else(|| no_constructor().into())
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Heap-construct an instance of `class`; the host receives the only
    /// reference as [`WireValue::Object`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn construct(&self, class: TypeHash, args: &[WireValue], heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        self.resolve_constructor(class, args.len())?.construct_object(args, heap)
    }

    /// Construct an instance of `class` into a host-owned slot.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn construct_value(
        &self,
        class: TypeHash,
        storage: &mut dyn ArgStorage,
        args: &[WireValue],
        heap: &mut ObjectHeap,
    ) -> Result<(), BindError> {
        self.resolve_constructor(class, args.len())?.construct_in(storage, args, heap)
    }

    /// Destroy a heap-constructed object through its class's `free`.
    pub fn destroy(&self, this: ObjectHandle, heap: &mut ObjectHeap) -> Result<(), BindError> {
        let class = self.class_of(this)?;
        let id = TypeHash::from_destructor(class);
        if !self.natives.contains_key(&id) {
            return Err(NativeError::NoDestructor {
                class: self.class(class)?.name.clone(),
            }
            .into());
        }
        self.call(id, Some(this), &[], heap).map(|_| ())
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Call a bound function or method by id.
    ///
    /// Arguments convert under the policies recorded for `id`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call(
        &self,
        id: TypeHash,
        this: Option<ObjectHandle>,
        args: &[WireValue],
        heap: &mut ObjectHeap,
    ) -> Result<WireValue, BindError> {
        let (Some(native), Some(method)) = (self.natives.get(&id), self.registry.method(id)) else {
            return Err(NativeError::UnknownFunction { name: id.to_string() }.into());
        };
        log::trace!("calling {} {} with {} argument(s)", method.kind, method.name, args.len());

        let mut ret = WireValue::Void;
        let mut ctx = CallContext::new(this, args, &method.policies, &mut ret, heap);
        native.call(&mut ctx).inspect_err(|e| {
            log::warn!("call to {} {} failed: {}", method.kind, method.name, e);
        })?;
        Ok(ret)
    }

    pub fn call_method(
        &self,
        this: ObjectHandle,
        name: &str,
        args: &[WireValue],
        heap: &mut ObjectHeap,
    ) -> Result<WireValue, BindError> {
        let class = self.class_of(this)?;
        let id = self.member(class, MethodKind::Method, name, args.len())?;
        self.call(id, Some(this), args, heap)
    }

    pub fn get_property(&self, this: ObjectHandle, name: &str, heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        let class = self.class_of(this)?;
        let id = self.member(class, MethodKind::Getter, name, 0)?;
        self.call(id, Some(this), &[], heap)
    }

    pub fn set_property(
        &self,
        this: ObjectHandle,
        name: &str,
        value: WireValue,
        heap: &mut ObjectHeap,
    ) -> Result<(), BindError> {
        let class = self.class_of(this)?;
        let id = self.member(class, MethodKind::Setter, name, 1)?;
        self.call(id, Some(this), &[value], heap).map(|_| ())
    }

    /// Call a function bound on `class` that takes no receiver.
    pub fn call_static(
        &self,
        class: TypeHash,
        name: &str,
        args: &[WireValue],
        heap: &mut ObjectHeap,
    ) -> Result<WireValue, BindError> {
        self.class(class)?;
        let id = self.member(class, MethodKind::Function, name, args.len())?;
        self.call(id, None, args, heap)
    }

    pub fn call_function(&self, name: &str, args: &[WireValue], heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        let id = self
            .overload(None, MethodKind::Function, name, args.len())?
            .ok_or_else(|| NativeError::NoOverload {
                name: name.to_string(),
                arity: args.len(),
            })?;
        self.call(id, None, args, heap)
    }

    fn member(&self, class: TypeHash, kind: MethodKind, name: &str, arity: usize) -> Result<TypeHash, BindError> {
        self.overload(Some(class), kind, name, arity)?.ok_or_else(|| {
            NativeError::NoOverload {
                name: name.to_string(),
                arity,
            }
            .into()
        })
    }

    /// Read an exported value.
    pub fn value(&self, name: &str, heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        let export = self
            .registry
            .value_export(name)
            .ok_or_else(|| NativeError::UnknownFunction { name: name.to_string() })?;
        self.call(export.exporter, None, &[], heap)
    }

    // =========================================================================
    // Reflection
    // =========================================================================

    pub fn reflect<V: ReflectVisitor + ?Sized>(&self, visitor: &mut V) {
        self.registry.reflect(visitor)
    }

    pub fn reflect_with(
        &self,
        on_primitive: impl FnMut(&PrimitiveDescriptor),
        on_type: impl FnMut(&TypeDescriptor),
        on_class: impl FnMut(&ClassDescriptor),
        on_method: impl FnMut(&MethodDescriptor),
    ) {
        self.registry.reflect_with(on_primitive, on_type, on_class, on_method)
    }

    pub fn query_type(&self, handle: TypeHash) -> Result<TypeDetail<'_>, UnknownTypeError> {
        self.registry.query_type(handle)
    }

    pub fn query_type_with<R>(
        &self,
        handle: TypeHash,
        out_type_detail: impl FnOnce(TypeDetail<'_>) -> R,
    ) -> Result<R, UnknownTypeError> {
        self.registry.query_type_with(handle, out_type_detail)
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("classes", &self.registry.classes().len())
            .field("methods", &self.registry.methods().len())
            .field("constructors", &self.constructors.len())
            .finish_non_exhaustive()
    }
}
