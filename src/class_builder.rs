//! ClassBuilder for binding native types.
//!
//! ClassBuilder provides a fluent API for binding one Rust type as a class:
//! its constructors, methods, property accessors, static functions and
//! destructor. Nothing reaches the registry until [`ClassBuilder::build`].
//!
//! # Example
//!
//! ```
//! use wirebind::{BindingsBuilder, Creator};
//! use wirebind_core::NativeClass;
//!
//! struct Counter {
//!     value: i64,
//! }
//!
//! impl NativeClass for Counter {
//!     const NAME: &'static str = "Counter";
//! }
//!
//! let mut builder = BindingsBuilder::new();
//! builder
//!     .register_class::<Counter>()
//!     .constructor(Creator::infallible(|(value,): (i64,)| Counter { value }))
//!     .method("add", |c: &mut Counter, (n,): (i64,)| c.value += n)
//!     .getter("value", |c: &Counter| c.value)
//!     .destructor()
//!     .build()
//!     .unwrap();
//! let bindings = builder.build().unwrap();
//! assert!(bindings.registry().class_by_name("Counter").is_some());
//! ```

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use wirebind_core::{
    ArgList, BindError, FromWire, IntoWire, MethodKind, NativeClass, PolicyList,
    RegistrationError, TypeHash, TypeKind, WireType, WireValue,
};
use wirebind_registry::MethodDef;

use crate::bindings::BindingsBuilder;
use crate::call_context::CallContext;
use crate::creator::{ConstructorFn, Creator};
use crate::native_fn::NativeFn;

/// Registered name of every constructor; overloads differ by arity.
pub const CONSTRUCTOR_NAME: &str = "constructor";

/// Registered name of the destructor.
pub const DESTRUCTOR_NAME: &str = "free";

enum PendingMember {
    Constructor {
        def: MethodDef,
        creator: Arc<dyn ConstructorFn>,
    },
    Native {
        def: MethodDef,
        f: NativeFn,
    },
}

/// Builder for one bound class.
///
/// Created by [`BindingsBuilder::register_class`].
pub struct ClassBuilder<'b, T: NativeClass> {
    bindings: &'b mut BindingsBuilder,
    /// Class handle, also the handle of the value type `T`
    id: TypeHash,
    kind: TypeKind,
    base: Option<TypeHash>,
    members: Vec<PendingMember>,
    _marker: PhantomData<fn() -> T>,
}

impl<'b, T: NativeClass> ClassBuilder<'b, T> {
    pub(crate) fn new(bindings: &'b mut BindingsBuilder) -> Self {
        Self {
            bindings,
            id: TypeHash::from_name(T::NAME),
            kind: TypeKind::value::<T>(),
            base: None,
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Handle the class will be registered under.
    pub fn id(&self) -> TypeHash {
        self.id
    }

    /// Record `B` as the base class. This is reflection metadata only;
    /// members of `B` are not callable through `T`.
    pub fn base<B: NativeClass>(mut self) -> Self {
        self.base = Some(TypeHash::from_name(B::NAME));
        self
    }

    fn member(
        &self,
        kind: MethodKind,
        name: &str,
        arg_types: Vec<TypeHash>,
        return_type: TypeHash,
        policies: PolicyList,
    ) -> MethodDef {
        let baseline = self.bindings.config().default_policy;
        MethodDef::member(self.id, kind, name, arg_types, return_type)
            .with_policies(policies.with_baseline(baseline))
    }

    fn push_native<F>(mut self, def: MethodDef, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), BindError> + Send + Sync + 'static,
    {
        let f = NativeFn::new(def.id(), f);
        self.members.push(PendingMember::Native { def, f });
        self
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Add a constructor overload.
    ///
    /// The configured default policy becomes the baseline of the creator's
    /// own policy list.
    pub fn constructor<A: ArgList + 'static>(mut self, creator: Creator<T, A>) -> Self {
        let creator = creator.with_baseline(self.bindings.config().default_policy);
        let def = MethodDef::member(
            self.id,
            MethodKind::Constructor,
            CONSTRUCTOR_NAME,
            A::type_hashes(),
            self.id,
        )
        .with_policies(creator.policy_list().clone());
        self.members.push(PendingMember::Constructor {
            def,
            creator: Arc::new(creator),
        });
        self
    }

    /// Bind `free`, which destroys a heap-constructed object.
    pub fn destructor(self) -> Self {
        let def = self.member(
            MethodKind::Destructor,
            DESTRUCTOR_NAME,
            Vec::new(),
            <()>::type_hash(),
            PolicyList::new(),
        );
        self.push_native(def, |ctx: &mut CallContext<'_>| {
            let handle = ctx.this_handle()?;
            ctx.this::<T>()?;
            ctx.heap_mut().free(handle);
            log::trace!("freed {} at index {}", T::NAME, handle.index);
            Ok(())
        })
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Add a method taking the arguments `A`.
    pub fn method<A, R, F>(self, name: &str, f: F) -> Self
    where
        A: ArgList + 'static,
        R: IntoWire + 'static,
        F: Fn(&mut T, A) -> R + Send + Sync + 'static,
    {
        self.method_with(name, PolicyList::new(), f)
    }

    /// Add a method with explicit argument policies.
    pub fn method_with<A, R, F>(self, name: &str, policies: PolicyList, f: F) -> Self
    where
        A: ArgList + 'static,
        R: IntoWire + 'static,
        F: Fn(&mut T, A) -> R + Send + Sync + 'static,
    {
        let def = self.member(MethodKind::Method, name, A::type_hashes(), R::type_hash(), policies);
        self.push_native(def, move |ctx: &mut CallContext<'_>| {
            // receiver first, so a bad receiver causes no conversion side effects
            ctx.this_handle()?;
            let args: A = ctx.args()?;
            let ret = f(ctx.this_mut::<T>()?, args);
            ctx.set_return(ret)
        })
    }

    /// Add a method that works on the [`CallContext`] directly.
    pub fn method_raw<F>(
        self,
        name: &str,
        arg_types: Vec<TypeHash>,
        return_type: TypeHash,
        policies: PolicyList,
        f: F,
    ) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), BindError> + Send + Sync + 'static,
    {
        let def = self.member(MethodKind::Method, name, arg_types, return_type, policies);
        self.push_native(def, f)
    }

    /// Add a function on the class that takes no receiver.
    pub fn static_function<A, R, F>(self, name: &str, f: F) -> Self
    where
        A: ArgList + 'static,
        R: IntoWire + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.static_function_with(name, PolicyList::new(), f)
    }

    pub fn static_function_with<A, R, F>(self, name: &str, policies: PolicyList, f: F) -> Self
    where
        A: ArgList + 'static,
        R: IntoWire + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let def = self.member(MethodKind::Function, name, A::type_hashes(), R::type_hash(), policies);
        self.push_native(def, move |ctx: &mut CallContext<'_>| {
            let args: A = ctx.args()?;
            let ret = f(args);
            ctx.set_return(ret)
        })
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Add a read accessor for property `name`.
    pub fn getter<R, F>(self, name: &str, f: F) -> Self
    where
        R: IntoWire + 'static,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let def = self.member(MethodKind::Getter, name, Vec::new(), R::type_hash(), PolicyList::new());
        self.push_native(def, move |ctx: &mut CallContext<'_>| {
            ctx.this_handle()?;
            ctx.args::<()>()?;
            let ret = f(ctx.this::<T>()?);
            ctx.set_return(ret)
        })
    }

    /// Add a write accessor for property `name`.
    pub fn setter<V, F>(self, name: &str, f: F) -> Self
    where
        V: FromWire + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let def = self.member(
            MethodKind::Setter,
            name,
            vec![V::type_hash()],
            <()>::type_hash(),
            PolicyList::new(),
        );
        self.push_native(def, move |ctx: &mut CallContext<'_>| {
            ctx.this_handle()?;
            let (value,): (V,) = ctx.args()?;
            f(ctx.this_mut::<T>()?, value);
            ctx.set_return_slot(WireValue::Void);
            Ok(())
        })
    }

    /// Add both accessors for property `name`.
    pub fn property<V, G, S>(self, name: &str, getter: G, setter: S) -> Self
    where
        V: IntoWire + FromWire + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.getter(name, getter).setter(name, setter)
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Register the class, its three type views and every member.
    ///
    /// # Errors
    ///
    /// The first [`RegistrationError`]; the builder is then poisoned and
    /// [`BindingsBuilder::build`] reports it again.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(self) -> Result<TypeHash, RegistrationError> {
        let id = self
            .bindings
            .registry_mut()
            .register_class(T::NAME, self.kind, self.base)?;
        for member in self.members {
            match member {
                PendingMember::Constructor { def, creator } => {
                    self.bindings.add_constructor(def, creator)?;
                }
                PendingMember::Native { def, f } => {
                    self.bindings.add_native(def, f)?;
                }
            }
        }
        self.bindings.map_class(TypeId::of::<T>(), id);
        Ok(id)
    }
}
