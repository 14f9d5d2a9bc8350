//! The construction bridge.
//!
//! A [`Creator`] binds one constructor signature of a native type to the
//! two construction strategies:
//!
//! - heap construction ([`Creator::create`]), returning an owned box
//! - in-place construction ([`Creator::create_value`]), initializing a
//!   host-owned [`ArgStorage`] slot
//!
//! Both convert the wire arguments identically: left to right, each under
//! its own policy, stopping at the first failure. The constructor only runs
//! when every argument converted.
//!
//! # Example
//!
//! ```
//! use wirebind::{Creator, TypedArgStorage};
//! use wirebind_core::{ObjectHeap, Policy, PolicyList, WireValue};
//!
//! #[derive(Debug, PartialEq)]
//! struct Tag {
//!     id: i32,
//!     label: String,
//! }
//!
//! let creator = Creator::infallible(|(id, label): (i32, String)| Tag { id, label })
//!     .with_policies(PolicyList::new().with(1, Policy::ByConstRef));
//!
//! let mut heap = ObjectHeap::new();
//! let args = [WireValue::Int(7), WireValue::from("y")];
//!
//! let boxed = creator.create(&args, &mut heap).unwrap();
//! let mut slot = TypedArgStorage::<Tag>::new();
//! creator.create_value(&mut slot, &args, &mut heap).unwrap();
//! assert_eq!(slot.get(), Some(&*boxed));
//! ```

use std::any::Any;
use std::fmt;

use wirebind_core::{
    ArgList, ArgPolicy, BindError, ConstructionError, ObjectHeap, PolicyList, TypeHash, WireValue,
};

use crate::storage::{ArgStorage, typed_slot};

type ConstructorClosure<Bound, Args> =
    Box<dyn Fn(Args) -> Result<Bound, ConstructionError> + Send + Sync>;

/// One bound constructor signature of `Bound`.
pub struct Creator<Bound, Args> {
    constructor: ConstructorClosure<Bound, Args>,
    policy_list: PolicyList,
    /// `policy_list` folded once per argument position
    policies: Vec<ArgPolicy>,
}

impl<Bound: 'static, Args: ArgList + 'static> Creator<Bound, Args> {
    /// Bind a fallible constructor. Its error reaches the host unchanged.
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(Args) -> Result<Bound, ConstructionError> + Send + Sync + 'static,
    {
        Self {
            constructor: Box::new(constructor),
            policy_list: PolicyList::new(),
            policies: vec![ArgPolicy::BY_VALUE; Args::ARITY],
        }
    }

    /// Bind a constructor that cannot fail.
    pub fn infallible<F>(constructor: F) -> Self
    where
        F: Fn(Args) -> Bound + Send + Sync + 'static,
    {
        Self::new(move |args| Ok(constructor(args)))
    }

    /// Replace the policy list of this signature.
    pub fn with_policies(mut self, policies: PolicyList) -> Self {
        self.policies = policies.resolve(Args::ARITY);
        self.policy_list = policies;
        self
    }

    /// Prepend a signature-wide baseline that explicit policies still override.
    pub fn with_baseline(self, baseline: ArgPolicy) -> Self {
        let policies = self.policy_list.clone().with_baseline(baseline);
        self.with_policies(policies)
    }

    pub fn policy_list(&self) -> &PolicyList {
        &self.policy_list
    }

    /// Effective policy per argument position.
    pub fn policies(&self) -> &[ArgPolicy] {
        &self.policies
    }

    pub fn arity(&self) -> usize {
        Args::ARITY
    }

    pub fn arg_types(&self) -> Vec<TypeHash> {
        Args::type_hashes()
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn construct(&self, args: &[WireValue], heap: &mut ObjectHeap) -> Result<Bound, BindError> {
        let converted = Args::from_wire_list(args, &self.policies, heap).inspect_err(|e| {
            log::warn!("constructor arguments for {} rejected: {}", std::any::type_name::<Bound>(), e);
        })?;
        log::trace!("constructing {}", std::any::type_name::<Bound>());
        (self.constructor)(converted).map_err(|e| {
            log::warn!("constructor of {} failed: {}", std::any::type_name::<Bound>(), e);
            BindError::from(e)
        })
    }

    /// Heap construction: convert `args` and return the new object boxed.
    ///
    /// # Errors
    ///
    /// A [`ConversionError`](wirebind_core::ConversionError) naming the
    /// first argument that failed, or the constructor's own
    /// [`ConstructionError`].
    pub fn create(&self, args: &[WireValue], heap: &mut ObjectHeap) -> Result<Box<Bound>, BindError> {
        self.construct(args, heap).map(Box::new)
    }

    /// In-place construction: convert `args` and initialize `storage`.
    ///
    /// The slot is checked before any argument converts, so a bad slot
    /// causes no conversion side effects.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create), plus a
    /// [`StorageError`](wirebind_core::StorageError) when `storage` is not a
    /// slot for `Bound` or already holds an object.
    pub fn create_value(
        &self,
        storage: &mut dyn ArgStorage,
        args: &[WireValue],
        heap: &mut ObjectHeap,
    ) -> Result<(), BindError> {
        let slot = typed_slot::<Bound>(storage)?;
        if slot.is_initialized() {
            return Err(wirebind_core::StorageError::Occupied {
                type_name: std::any::type_name::<Bound>(),
            }
            .into());
        }
        let value = self.construct(args, heap)?;
        slot.init(value)?;
        Ok(())
    }
}

impl<Bound, Args> fmt::Debug for Creator<Bound, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Creator")
            .field("bound", &std::any::type_name::<Bound>())
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

/// A constructor with its bound type erased.
///
/// This is how the host-integration surface stores the constructors of
/// many classes side by side.
pub trait ConstructorFn: Send + Sync {
    fn arity(&self) -> usize;

    fn arg_types(&self) -> Vec<TypeHash>;

    fn policy_list(&self) -> &PolicyList;

    /// Heap construction into `heap`; the host receives the only reference.
    fn construct_object(&self, args: &[WireValue], heap: &mut ObjectHeap) -> Result<WireValue, BindError>;

    /// In-place construction into a host-owned slot.
    fn construct_in(
        &self,
        storage: &mut dyn ArgStorage,
        args: &[WireValue],
        heap: &mut ObjectHeap,
    ) -> Result<(), BindError>;
}

impl<Bound, Args> ConstructorFn for Creator<Bound, Args>
where
    Bound: Any + Send + Sync,
    Args: ArgList + 'static,
{
    fn arity(&self) -> usize {
        Args::ARITY
    }

    fn arg_types(&self) -> Vec<TypeHash> {
        Args::type_hashes()
    }

    fn policy_list(&self) -> &PolicyList {
        &self.policy_list
    }

    fn construct_object(&self, args: &[WireValue], heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        let boxed = self.create(args, heap)?;
        Ok(WireValue::Object(heap.allocate_boxed(boxed)))
    }

    fn construct_in(
        &self,
        storage: &mut dyn ArgStorage,
        args: &[WireValue],
        heap: &mut ObjectHeap,
    ) -> Result<(), BindError> {
        self.create_value(storage, args, heap)
    }
}
