//! Rust primitives and builtins that can be registered without a class.

use wirebind_core::{ObjectHandle, PrimitiveFlags, TypeKind, WireType};

/// A Rust numeric type registered as a primitive.
///
/// The name derived from `SIZE` and `FLAGS` is the type's `TYPE_NAME`, so
/// argument type handles computed by the conversion layer resolve to the
/// registered primitive.
pub trait NativePrimitive: WireType + Sized {
    const FLAGS: PrimitiveFlags;

    /// Size in bytes.
    const SIZE: u32 = std::mem::size_of::<Self>() as u32;
}

macro_rules! impl_native_primitive {
    ($($ty:ty => $flags:expr),* $(,)?) => {
        $(
            impl NativePrimitive for $ty {
                const FLAGS: PrimitiveFlags = $flags;
            }
        )*
    };
}

impl_native_primitive!(
    i8 => PrimitiveFlags::empty(),
    i16 => PrimitiveFlags::empty(),
    i32 => PrimitiveFlags::empty(),
    i64 => PrimitiveFlags::empty(),
    u8 => PrimitiveFlags::UNSIGNED,
    u16 => PrimitiveFlags::UNSIGNED,
    u32 => PrimitiveFlags::UNSIGNED,
    u64 => PrimitiveFlags::UNSIGNED,
    f32 => PrimitiveFlags::FLOAT,
    f64 => PrimitiveFlags::FLOAT,
);

/// A non-numeric builtin registered as a plain type.
pub trait NativeBuiltin: WireType {
    fn kind() -> TypeKind;
}

macro_rules! impl_native_builtin {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NativeBuiltin for $ty {
                fn kind() -> TypeKind {
                    TypeKind::builtin::<$ty>()
                }
            }
        )*
    };
}

impl_native_builtin!((), bool, char, String, isize, usize, ObjectHandle);
