//! Conversion traits between wire values and native Rust types.
//!
//! - [`FromWire`]: convert one [`WireValue`] into a native argument under an
//!   [`ArgPolicy`]
//! - [`IntoWire`]: convert a native return value back into a [`WireValue`]
//! - [`ArgFromWire`]: the per-argument strategy object, fixed to one policy
//!
//! Behavior depends only on the `(policy, type)` pair. Conversion itself has
//! no side effects. The one documented effect, the reference taken by object
//! arguments under [`Passing::Transfer`](crate::Passing::Transfer), happens in
//! [`FromWire::acquire`], which only runs once conversion succeeded.
//!
//! ## Supported Types
//!
//! - Integers: `i8`..`i64`, `u8`..`u64`, `isize`, `usize`
//! - Floats: `f32`, `f64`
//! - `bool`, `char`, `String`, `()`
//! - Objects: [`ObjectHandle`], [`ObjectRef<T>`], [`Cloned<T>`], [`NewObject<T>`] (return only)
//! - `Option<T>` for nullable arguments, `Result<T, E>` for fallible returns
//!
//! ## Example
//!
//! ```
//! use wirebind_core::{ArgFromWire, ArgPolicy, ObjectHeap, Policy, WireValue};
//!
//! let mut heap = ObjectHeap::new();
//! let strict = ArgPolicy::BY_VALUE.apply(Policy::Strict);
//!
//! let n = ArgFromWire::<i32>::new(ArgPolicy::BY_VALUE).get(&WireValue::Float(3.0), &mut heap);
//! assert_eq!(n.unwrap(), 3);
//! assert!(ArgFromWire::<i32>::new(strict).get(&WireValue::Float(3.0), &mut heap).is_err());
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{BindError, ConversionError, NativeError};
use crate::{ArgPolicy, ObjectHandle, ObjectHeap, TypeHash, WireValue};

/// A native type with a registered name on the wire.
pub trait WireType {
    /// Name of the registered type this Rust type maps to.
    const TYPE_NAME: &'static str;

    /// Handle of the registered type this Rust type maps to.
    fn type_hash() -> TypeHash {
        TypeHash::from_name(Self::TYPE_NAME)
    }
}

/// Convert a wire value into a native value.
pub trait FromWire: WireType + Sized {
    /// Convert `value` under `policy`. Never mutates `heap`.
    fn from_wire(
        value: &WireValue,
        policy: ArgPolicy,
        heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError>;

    /// Take whatever `policy` transfers to the native side.
    ///
    /// Called once per converted value, and for an argument list only after
    /// every argument converted.
    fn acquire(&self, _policy: ArgPolicy, _heap: &mut ObjectHeap) {}
}

/// Convert a native return value into a wire value.
pub trait IntoWire: WireType {
    fn into_wire(self, heap: &mut ObjectHeap) -> Result<WireValue, BindError>;
}

/// A Rust type that can be bound as a class and live in the [`ObjectHeap`].
pub trait NativeClass: Any + Send + Sync {
    /// Name the class is registered under.
    const NAME: &'static str;
}

/// Strategy object converting one argument position under a fixed policy.
pub struct ArgFromWire<T> {
    policy: ArgPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromWire> ArgFromWire<T> {
    pub fn new(policy: ArgPolicy) -> Self {
        Self {
            policy,
            _marker: PhantomData,
        }
    }

    pub fn policy(&self) -> ArgPolicy {
        self.policy
    }

    /// Produce the native argument from its wire value.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get(&self, value: &WireValue, heap: &mut ObjectHeap) -> Result<T, ConversionError> {
        log::trace!("converting {:?} to {} ({})", value, T::TYPE_NAME, self.policy);
        let converted = T::from_wire(value, self.policy, heap)?;
        converted.acquire(self.policy, heap);
        Ok(converted)
    }
}

impl<T> Clone for ArgFromWire<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArgFromWire<T> {}

impl<T> fmt::Debug for ArgFromWire<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgFromWire")
            .field("type", &std::any::type_name::<T>())
            .field("policy", &self.policy)
            .finish()
    }
}

fn mismatch(expected: &'static str, value: &WireValue) -> ConversionError {
    if value.is_empty() {
        ConversionError::NullValue { expected }
    } else {
        ConversionError::TypeMismatch {
            expected,
            actual: value.kind(),
        }
    }
}

/// Exact integer value of an integral float, if it has one.
fn integral(value: f64) -> Option<i128> {
    // i128 covers every integral f64 below this bound exactly
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1.0e38 {
        Some(value as i128)
    } else {
        None
    }
}

// ============================================================================
// Integers
// ============================================================================

macro_rules! impl_wire_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl WireType for $ty {
                const TYPE_NAME: &'static str = $name;
            }

            impl FromWire for $ty {
                fn from_wire(
                    value: &WireValue,
                    policy: ArgPolicy,
                    _heap: &mut ObjectHeap,
                ) -> Result<Self, ConversionError> {
                    match value {
                        WireValue::Int(v) => match <$ty>::try_from(*v) {
                            Ok(n) => Ok(n),
                            // wrapping cast, explicitly permitted
                            Err(_) if policy.is_lossy() => Ok(*v as $ty),
                            Err(_) => Err(ConversionError::IntegerOverflow {
                                value: i128::from(*v),
                                target_type: $name,
                            }),
                        },
                        WireValue::Float(v) if !policy.is_strict() => {
                            match integral(*v).and_then(|wide| <$ty>::try_from(wide).ok()) {
                                Some(n) => Ok(n),
                                // truncates toward zero, saturating
                                None if policy.is_lossy() => Ok(*v as $ty),
                                None => Err(ConversionError::FloatConversion {
                                    value: *v,
                                    target_type: $name,
                                }),
                            }
                        }
                        other => Err(mismatch($name, other)),
                    }
                }
            }

            impl IntoWire for $ty {
                fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
                    i64::try_from(self).map(WireValue::Int).map_err(|_| {
                        ConversionError::IntegerOverflow {
                            value: self as i128,
                            target_type: "int64_t",
                        }
                        .into()
                    })
                }
            }
        )*
    };
}

impl_wire_int!(
    i8 => "int8_t",
    i16 => "int16_t",
    i32 => "int32_t",
    i64 => "int64_t",
    u8 => "uint8_t",
    u16 => "uint16_t",
    u32 => "uint32_t",
    u64 => "uint64_t",
    isize => "ssize_t",
    usize => "size_t",
);

// ============================================================================
// Floats
// ============================================================================

/// Int to float, rejecting integers the float cannot hold exactly.
fn float_from_int(v: i64, policy: ArgPolicy, target_type: &'static str) -> Result<f64, ConversionError> {
    let f = v as f64;
    if policy.is_lossy() || f as i128 == i128::from(v) {
        Ok(f)
    } else {
        Err(ConversionError::IntegerOverflow {
            value: i128::from(v),
            target_type,
        })
    }
}

impl WireType for f64 {
    const TYPE_NAME: &'static str = "float64_t";
}

impl FromWire for f64 {
    fn from_wire(
        value: &WireValue,
        policy: ArgPolicy,
        _heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        match value {
            WireValue::Float(v) => Ok(*v),
            WireValue::Int(v) if !policy.is_strict() => float_from_int(*v, policy, Self::TYPE_NAME),
            other => Err(mismatch(Self::TYPE_NAME, other)),
        }
    }
}

impl IntoWire for f64 {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::Float(self))
    }
}

impl WireType for f32 {
    const TYPE_NAME: &'static str = "float32_t";
}

impl FromWire for f32 {
    fn from_wire(
        value: &WireValue,
        policy: ArgPolicy,
        _heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        let wide = match value {
            WireValue::Float(v) => *v,
            WireValue::Int(v) if !policy.is_strict() => float_from_int(*v, policy, Self::TYPE_NAME)?,
            other => return Err(mismatch(Self::TYPE_NAME, other)),
        };
        // infinities and NaN carry over unchanged
        let in_range = !wide.is_finite() || wide.abs() <= f32::MAX as f64;
        if in_range || policy.is_lossy() {
            Ok(wide as f32)
        } else {
            Err(ConversionError::FloatConversion {
                value: wide,
                target_type: Self::TYPE_NAME,
            })
        }
    }
}

impl IntoWire for f32 {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::Float(self as f64))
    }
}

// ============================================================================
// Bool, char, strings, unit
// ============================================================================

impl WireType for bool {
    const TYPE_NAME: &'static str = "bool";
}

impl FromWire for bool {
    fn from_wire(
        value: &WireValue,
        _policy: ArgPolicy,
        _heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        match value {
            WireValue::Bool(v) => Ok(*v),
            other => Err(mismatch(Self::TYPE_NAME, other)),
        }
    }
}

impl IntoWire for bool {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::Bool(self))
    }
}

impl WireType for char {
    const TYPE_NAME: &'static str = "char32_t";
}

impl FromWire for char {
    fn from_wire(
        value: &WireValue,
        _policy: ArgPolicy,
        _heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        match value {
            WireValue::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(ConversionError::InvalidString {
                        value: s.clone(),
                        target_type: Self::TYPE_NAME,
                    }),
                }
            }
            other => Err(mismatch(Self::TYPE_NAME, other)),
        }
    }
}

impl IntoWire for char {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::String(self.to_string()))
    }
}

impl WireType for String {
    const TYPE_NAME: &'static str = "std::string";
}

impl FromWire for String {
    fn from_wire(
        value: &WireValue,
        _policy: ArgPolicy,
        _heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        match value {
            WireValue::String(s) => Ok(s.clone()),
            other => Err(mismatch(Self::TYPE_NAME, other)),
        }
    }
}

impl IntoWire for String {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::String(self))
    }
}

impl WireType for &str {
    const TYPE_NAME: &'static str = "std::string";
}

impl IntoWire for &str {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::String(self.to_owned()))
    }
}

impl WireType for () {
    const TYPE_NAME: &'static str = "void";
}

impl FromWire for () {
    fn from_wire(
        value: &WireValue,
        _policy: ArgPolicy,
        _heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        match value {
            WireValue::Void => Ok(()),
            other => Err(ConversionError::TypeMismatch {
                expected: Self::TYPE_NAME,
                actual: other.kind(),
            }),
        }
    }
}

impl IntoWire for () {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::Void)
    }
}

// ============================================================================
// Objects
// ============================================================================

impl WireType for ObjectHandle {
    const TYPE_NAME: &'static str = "object";
}

impl FromWire for ObjectHandle {
    fn from_wire(
        value: &WireValue,
        _policy: ArgPolicy,
        heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        match value {
            WireValue::Object(handle) if heap.is_live(*handle) => Ok(*handle),
            WireValue::Object(handle) => Err(ConversionError::StaleHandle {
                index: handle.index,
            }),
            other => Err(mismatch(Self::TYPE_NAME, other)),
        }
    }

    fn acquire(&self, policy: ArgPolicy, heap: &mut ObjectHeap) {
        if policy.transfers_ownership() {
            heap.add_ref(*self);
        }
    }
}

impl IntoWire for ObjectHandle {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::Object(self))
    }
}

/// A typed reference to a live `T` in the [`ObjectHeap`].
///
/// Borrowing policies leave the reference count alone; the reference is only
/// valid for the duration of the call. Under `Transfer` the conversion takes
/// one reference, which the native side must eventually release.
pub struct ObjectRef<T> {
    handle: ObjectHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T: NativeClass> ObjectRef<T> {
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn get<'h>(&self, heap: &'h ObjectHeap) -> Option<&'h T> {
        heap.get::<T>(self.handle)
    }

    pub fn get_mut<'h>(&self, heap: &'h mut ObjectHeap) -> Option<&'h mut T> {
        heap.get_mut::<T>(self.handle)
    }
}

impl<T> Clone for ObjectRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ObjectRef<T> {}

impl<T> fmt::Debug for ObjectRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}:{})", self.handle.index, self.handle.generation)
    }
}

fn live_object<T: NativeClass>(
    value: &WireValue,
    heap: &ObjectHeap,
) -> Result<ObjectHandle, ConversionError> {
    match value {
        WireValue::Object(handle) if !heap.is_live(*handle) => Err(ConversionError::StaleHandle {
            index: handle.index,
        }),
        WireValue::Object(handle) if heap.get::<T>(*handle).is_some() => Ok(*handle),
        other => Err(mismatch(T::NAME, other)),
    }
}

impl<T: NativeClass> WireType for ObjectRef<T> {
    const TYPE_NAME: &'static str = T::NAME;
}

impl<T: NativeClass> FromWire for ObjectRef<T> {
    fn from_wire(
        value: &WireValue,
        _policy: ArgPolicy,
        heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        let handle = live_object::<T>(value, heap)?;
        Ok(ObjectRef {
            handle,
            _marker: PhantomData,
        })
    }

    fn acquire(&self, policy: ArgPolicy, heap: &mut ObjectHeap) {
        if policy.transfers_ownership() {
            heap.add_ref(self.handle);
        }
    }
}

impl<T: NativeClass> IntoWire for ObjectRef<T> {
    fn into_wire(self, _heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::Object(self.handle))
    }
}

/// A by-value copy of a live `T` in the [`ObjectHeap`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cloned<T>(pub T);

impl<T: NativeClass> WireType for Cloned<T> {
    const TYPE_NAME: &'static str = T::NAME;
}

impl<T: NativeClass + Clone> FromWire for Cloned<T> {
    fn from_wire(
        value: &WireValue,
        _policy: ArgPolicy,
        heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        let handle = live_object::<T>(value, heap)?;
        heap.get::<T>(handle)
            .cloned()
            .map(Cloned)
            .ok_or(ConversionError::StaleHandle {
                index: handle.index,
            })
    }
}

/// A freshly built native object returned to the host.
///
/// Converting it moves the object into the heap; the host receives the
/// only reference.
#[derive(Debug)]
pub struct NewObject<T>(pub T);

impl<T: NativeClass> WireType for NewObject<T> {
    const TYPE_NAME: &'static str = T::NAME;
}

impl<T: NativeClass> IntoWire for NewObject<T> {
    fn into_wire(self, heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        Ok(WireValue::Object(heap.allocate(self.0)))
    }
}

// ============================================================================
// Option and Result
// ============================================================================

impl<T: WireType> WireType for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;
}

impl<T: FromWire> FromWire for Option<T> {
    fn from_wire(
        value: &WireValue,
        policy: ArgPolicy,
        heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        if value.is_empty() {
            return if policy.allows_null() {
                Ok(None)
            } else {
                Err(ConversionError::NullValue {
                    expected: T::TYPE_NAME,
                })
            };
        }
        T::from_wire(value, policy, heap).map(Some)
    }

    fn acquire(&self, policy: ArgPolicy, heap: &mut ObjectHeap) {
        if let Some(v) = self {
            v.acquire(policy, heap);
        }
    }
}

impl<T: IntoWire> IntoWire for Option<T> {
    fn into_wire(self, heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        match self {
            Some(v) => v.into_wire(heap),
            None => Ok(WireValue::Null),
        }
    }
}

impl<T: WireType, E> WireType for Result<T, E> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;
}

impl<T: IntoWire, E: fmt::Display> IntoWire for Result<T, E> {
    fn into_wire(self, heap: &mut ObjectHeap) -> Result<WireValue, BindError> {
        match self {
            Ok(v) => v.into_wire(heap),
            Err(e) => Err(NativeError::failed(e.to_string()).into()),
        }
    }
}
