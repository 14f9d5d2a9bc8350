//! Whole-signature argument conversion.
//!
//! [`ArgList`] is implemented for tuples of up to eight [`FromWire`] types.
//! Arguments convert left to right; the first failure stops the walk, so a
//! later argument is never looked at once an earlier one has failed.
//! Ownership transfers ([`FromWire::acquire`]) are applied only after every
//! argument converted, so a failed list leaves the heap untouched.

use crate::convert::FromWire;
use crate::error::ConversionError;
use crate::{ArgPolicy, ObjectHeap, TypeHash, WireValue};

/// An ordered native argument list convertible from wire values.
pub trait ArgList: Sized {
    /// Number of declared arguments.
    const ARITY: usize;

    /// Registered type handles of the arguments, in declared order.
    fn type_hashes() -> Vec<TypeHash>;

    /// Registered type names of the arguments, in declared order.
    fn type_names() -> Vec<&'static str>;

    /// Convert `values` using one policy per position.
    ///
    /// Positions without an entry in `policies` convert by value.
    fn from_wire_list(
        values: &[WireValue],
        policies: &[ArgPolicy],
        heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError>;
}

/// Fail with `ArityMismatch` unless exactly `expected` values were supplied.
pub fn check_arity(expected: usize, values: &[WireValue]) -> Result<(), ConversionError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(ConversionError::ArityMismatch {
            expected,
            actual: values.len(),
        })
    }
}

fn convert_arg<T: FromWire>(
    values: &[WireValue],
    policies: &[ArgPolicy],
    index: usize,
    heap: &mut ObjectHeap,
) -> Result<T, ConversionError> {
    let policy = policies.get(index).copied().unwrap_or_default();
    let value = values.get(index).ok_or(ConversionError::ArityMismatch {
        expected: index + 1,
        actual: values.len(),
    })?;
    log::trace!("converting argument {} {:?} to {} ({})", index, value, T::TYPE_NAME, policy);
    T::from_wire(value, policy, heap).map_err(|e| e.at_argument(index, policy))
}

macro_rules! impl_arg_list {
    ($count:expr; $($name:ident : $idx:tt),*) => {
        impl<$($name: FromWire),*> ArgList for ($($name,)*) {
            const ARITY: usize = $count;

            fn type_hashes() -> Vec<TypeHash> {
                vec![$($name::type_hash()),*]
            }

            fn type_names() -> Vec<&'static str> {
                vec![$($name::TYPE_NAME),*]
            }

            #[allow(unused_variables)]
            fn from_wire_list(
                values: &[WireValue],
                policies: &[ArgPolicy],
                heap: &mut ObjectHeap,
            ) -> Result<Self, ConversionError> {
                check_arity(Self::ARITY, values)?;
                // tuple fields evaluate left to right, and `?` stops at the first error
                let converted = ($(convert_arg::<$name>(values, policies, $idx, heap)?,)*);
                $(converted.$idx.acquire(policies.get($idx).copied().unwrap_or_default(), heap);)*
                Ok(converted)
            }
        }
    };
}

impl_arg_list!(0;);
impl_arg_list!(1; A: 0);
impl_arg_list!(2; A: 0, B: 1);
impl_arg_list!(3; A: 0, B: 1, C: 2);
impl_arg_list!(4; A: 0, B: 1, C: 2, D: 3);
impl_arg_list!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_arg_list!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_arg_list!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_arg_list!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ObjectHandle, Policy, PolicyList, WireKind};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn converts_in_order() {
        init_logging();
        let mut heap = ObjectHeap::new();
        let values = [WireValue::Int(42), WireValue::from("x")];
        let (n, s) = <(i32, String)>::from_wire_list(&values, &[], &mut heap).unwrap();
        assert_eq!(n, 42);
        assert_eq!(s, "x");
    }

    #[test]
    fn empty_list() {
        let mut heap = ObjectHeap::new();
        assert!(<()>::from_wire_list(&[], &[], &mut heap).is_ok());
        assert!(<()>::type_hashes().is_empty());
        assert_eq!(<()>::ARITY, 0);
    }

    #[test]
    fn arity_is_checked_first() {
        let mut heap = ObjectHeap::new();
        let err = <(i32, String)>::from_wire_list(&[WireValue::from("bad")], &[], &mut heap)
            .unwrap_err();
        assert_eq!(err, ConversionError::ArityMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn failure_names_argument_and_policy() {
        let mut heap = ObjectHeap::new();
        let policies = PolicyList::new()
            .with(0, Policy::ByValue)
            .with(1, Policy::ByConstRef)
            .resolve(2);
        let values = [WireValue::Int(1), WireValue::Int(2)];
        let err = <(i32, String)>::from_wire_list(&values, &policies, &mut heap).unwrap_err();

        assert_eq!(err.argument_index(), Some(1));
        assert_eq!(
            err.root(),
            &ConversionError::TypeMismatch { expected: "std::string", actual: WireKind::Int }
        );
        assert!(err.to_string().contains("by-const-reference"));
    }

    #[test]
    fn policies_apply_per_position() {
        let mut heap = ObjectHeap::new();
        let policies = PolicyList::new().with(1, Policy::Nullable).resolve(2);
        let values = [WireValue::Int(1), WireValue::Null];
        let (a, b) = <(i32, Option<i32>)>::from_wire_list(&values, &policies, &mut heap).unwrap();
        assert_eq!((a, b), (1, None));

        let values = [WireValue::Null, WireValue::Null];
        let err = <(Option<i32>, Option<i32>)>::from_wire_list(&values, &policies, &mut heap)
            .unwrap_err();
        assert_eq!(err.argument_index(), Some(0));
    }

    #[test]
    fn transfer_applies_only_after_the_whole_list_converts() {
        init_logging();
        let mut heap = ObjectHeap::new();
        let object = heap.allocate(5u32);
        let policies = PolicyList::new().with(0, Policy::Transfer).resolve(2);

        let values = [WireValue::Object(object), WireValue::Bool(true)];
        assert!(<(ObjectHandle, i32)>::from_wire_list(&values, &policies, &mut heap).is_err());
        assert_eq!(heap.ref_count(object), Some(1));

        let values = [WireValue::Object(object), WireValue::Int(1)];
        let (handle, _) = <(ObjectHandle, i32)>::from_wire_list(&values, &policies, &mut heap).unwrap();
        assert_eq!(handle, object);
        assert_eq!(heap.ref_count(object), Some(2));
    }

    #[test]
    fn type_metadata() {
        assert_eq!(<(i32, String, bool)>::ARITY, 3);
        assert_eq!(
            <(i32, String, bool)>::type_names(),
            vec!["int32_t", "std::string", "bool"]
        );
        assert_eq!(<(f64,)>::type_hashes(), vec![TypeHash::from_name("float64_t")]);
    }
}
