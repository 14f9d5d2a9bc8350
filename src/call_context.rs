//! Call context bridging the host and native Rust functions.

use std::fmt;

use wirebind_core::{
    ArgList, ArgPolicy, BindError, ConversionError, FromWire, IntoWire, NativeClass, NativeError,
    ObjectHandle, ObjectHeap, WireValue,
};

/// Context for one native call.
///
/// Holds the wire arguments the host supplied, the effective policy of each
/// argument position, the receiver for member calls, and the slot the return
/// value goes to.
///
/// ## Typed Argument Access
///
/// ```
/// # use wirebind::{CallContext, ObjectHeap, WireValue};
/// # fn main() -> Result<(), wirebind::BindError> {
/// # let mut heap = ObjectHeap::new();
/// # let mut ret = WireValue::Void;
/// let args = [WireValue::Int(3), WireValue::Float(0.5)];
/// let mut ctx = CallContext::new(None, &args, &[], &mut ret, &mut heap);
/// let count: i32 = ctx.arg(0)?;
/// let (n, scale): (i32, f64) = ctx.args()?;
/// assert_eq!((count, n, scale), (3, 3, 0.5));
/// # Ok(())
/// # }
/// ```
///
/// ## Return Values
///
/// ```
/// # use wirebind::{CallContext, ObjectHeap, WireValue};
/// # fn main() -> Result<(), wirebind::BindError> {
/// # let mut heap = ObjectHeap::new();
/// let mut ret = WireValue::Void;
/// let args = [WireValue::Int(21)];
/// let mut ctx = CallContext::new(None, &args, &[], &mut ret, &mut heap);
/// let count: i32 = ctx.arg(0)?;
/// ctx.set_return(count * 2)?;
/// assert_eq!(ret, WireValue::Int(42));
/// # Ok(())
/// # }
/// ```
pub struct CallContext<'a> {
    /// Receiver of a member call
    this: Option<ObjectHandle>,
    /// Wire arguments, excluding the receiver
    args: &'a [WireValue],
    /// Effective policy per argument position
    policies: &'a [ArgPolicy],
    return_slot: &'a mut WireValue,
    heap: &'a mut ObjectHeap,
}

impl<'a> CallContext<'a> {
    pub fn new(
        this: Option<ObjectHandle>,
        args: &'a [WireValue],
        policies: &'a [ArgPolicy],
        return_slot: &'a mut WireValue,
        heap: &'a mut ObjectHeap,
    ) -> Self {
        Self {
            this,
            args,
            policies,
            return_slot,
            heap,
        }
    }

    /// Number of arguments, excluding the receiver.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Get a raw reference to an argument slot.
    pub fn arg_slot(&self, index: usize) -> Result<&WireValue, ConversionError> {
        self.args.get(index).ok_or(ConversionError::ArityMismatch {
            expected: index + 1,
            actual: self.args.len(),
        })
    }

    /// Effective policy of argument `index`; by-value when none was declared.
    pub fn policy(&self, index: usize) -> ArgPolicy {
        self.policies.get(index).copied().unwrap_or_default()
    }

    /// Convert one argument under its declared policy.
    pub fn arg<T: FromWire>(&mut self, index: usize) -> Result<T, BindError> {
        let policy = self.policy(index);
        let args = self.args;
        let value = args.get(index).ok_or(ConversionError::ArityMismatch {
            expected: index + 1,
            actual: args.len(),
        })?;
        let converted = T::from_wire(value, policy, self.heap)
            .map_err(|e| BindError::from(e.at_argument(index, policy)))?;
        converted.acquire(policy, self.heap);
        Ok(converted)
    }

    /// Convert the whole argument list, left to right.
    pub fn args<A: ArgList>(&mut self) -> Result<A, BindError> {
        A::from_wire_list(self.args, self.policies, self.heap).map_err(BindError::from)
    }

    /// Handle of the receiver.
    pub fn this_handle(&self) -> Result<ObjectHandle, NativeError> {
        let handle = self
            .this
            .ok_or_else(|| NativeError::invalid_this("no receiver for a member call"))?;
        if !self.heap.is_live(handle) {
            return Err(NativeError::invalid_this(format!(
                "receiver at index {} has been freed",
                handle.index
            )));
        }
        Ok(handle)
    }

    /// Get an immutable reference to the receiver.
    pub fn this<T: NativeClass>(&self) -> Result<&T, NativeError> {
        let handle = self.this_handle()?;
        self.heap
            .get::<T>(handle)
            .ok_or_else(|| NativeError::invalid_this(format!("receiver is not a {}", T::NAME)))
    }

    /// Get a mutable reference to the receiver.
    pub fn this_mut<T: NativeClass>(&mut self) -> Result<&mut T, NativeError> {
        let handle = self.this_handle()?;
        self.heap
            .get_mut::<T>(handle)
            .ok_or_else(|| NativeError::invalid_this(format!("receiver is not a {}", T::NAME)))
    }

    /// Set the return value from a raw slot.
    pub fn set_return_slot(&mut self, value: WireValue) {
        *self.return_slot = value;
    }

    /// Set a typed return value.
    pub fn set_return<T: IntoWire>(&mut self, value: T) -> Result<(), BindError> {
        *self.return_slot = value.into_wire(self.heap)?;
        Ok(())
    }

    pub fn heap(&self) -> &ObjectHeap {
        self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ObjectHeap {
        self.heap
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("this", &self.this)
            .field("arg_count", &self.arg_count())
            .field("policies", &self.policies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirebind_core::{Policy, WireKind};

    #[derive(Debug, PartialEq)]
    struct Counter {
        value: i64,
    }

    impl NativeClass for Counter {
        const NAME: &'static str = "Counter";
    }

    #[test]
    fn typed_args_and_return() {
        let mut heap = ObjectHeap::new();
        let mut ret = WireValue::Void;
        let args = [WireValue::Int(2), WireValue::Float(0.5)];
        let mut ctx = CallContext::new(None, &args, &[], &mut ret, &mut heap);

        let n: i32 = ctx.arg(0).unwrap();
        let x: f64 = ctx.arg(1).unwrap();
        ctx.set_return(f64::from(n) + x).unwrap();
        assert_eq!(ret, WireValue::Float(2.5));
    }

    #[test]
    fn arg_error_names_position_and_policy() {
        let mut heap = ObjectHeap::new();
        let mut ret = WireValue::Void;
        let args = [WireValue::Int(1), WireValue::Bool(true)];
        let policies = [ArgPolicy::BY_VALUE, ArgPolicy::BY_VALUE.apply(Policy::ByConstRef)];
        let mut ctx = CallContext::new(None, &args, &policies, &mut ret, &mut heap);

        let err = ctx.arg::<String>(1).unwrap_err();
        let conversion = err.as_conversion().unwrap();
        assert_eq!(conversion.argument_index(), Some(1));
        assert_eq!(
            conversion.root(),
            &ConversionError::TypeMismatch { expected: "std::string", actual: WireKind::Bool }
        );
    }

    #[test]
    fn missing_argument() {
        let mut heap = ObjectHeap::new();
        let mut ret = WireValue::Void;
        let mut ctx = CallContext::new(None, &[], &[], &mut ret, &mut heap);
        assert!(ctx.arg::<i32>(0).unwrap_err().is_conversion());
    }

    #[test]
    fn receiver_access() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(Counter { value: 1 });
        let mut ret = WireValue::Void;
        let mut ctx = CallContext::new(Some(handle), &[], &[], &mut ret, &mut heap);

        ctx.this_mut::<Counter>().unwrap().value += 1;
        assert_eq!(ctx.this::<Counter>().unwrap().value, 2);
    }

    #[test]
    fn missing_or_freed_receiver() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(Counter { value: 1 });
        heap.free(handle);

        let mut ret = WireValue::Void;
        let ctx = CallContext::new(None, &[], &[], &mut ret, &mut heap);
        assert!(matches!(ctx.this::<Counter>(), Err(NativeError::InvalidThis { .. })));

        let mut ret = WireValue::Void;
        let ctx = CallContext::new(Some(handle), &[], &[], &mut ret, &mut heap);
        assert!(matches!(ctx.this::<Counter>(), Err(NativeError::InvalidThis { .. })));
    }
}
