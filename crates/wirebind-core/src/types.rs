//! Shape metadata for registered types, primitives and methods.

use std::fmt;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::TypeHash;
use crate::error::RegistrationError;

bitflags! {
    /// Flags describing a primitive's representation.
    ///
    /// The bit values are part of the host contract and never change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PrimitiveFlags: u8 {
        const UNSIGNED = 1;
        const FLOAT = 2;
        const POINTER = 4;
        const CONST = 8;
        /// Plain `char`, neither signed nor unsigned.
        const SIGNLESS = 16;
    }
}

impl PrimitiveFlags {
    /// Display name of a primitive with this size (in bytes) and flags.
    ///
    /// ```
    /// use wirebind_core::PrimitiveFlags;
    ///
    /// assert_eq!(PrimitiveFlags::UNSIGNED.type_name(4), "uint32_t");
    /// assert_eq!(PrimitiveFlags::FLOAT.type_name(8), "float64_t");
    /// let c_str = PrimitiveFlags::CONST | PrimitiveFlags::SIGNLESS | PrimitiveFlags::POINTER;
    /// assert_eq!(c_str.type_name(1), "const char *");
    /// ```
    pub fn type_name(self, size: u32) -> String {
        let mut name = String::new();
        if self.contains(Self::CONST) {
            name.push_str("const ");
        }

        if self.contains(Self::SIGNLESS) {
            name.push_str("char");
        } else if self.contains(Self::POINTER) {
            if self.contains(Self::UNSIGNED) {
                name.push_str("un");
            }
            name.push_str("signed char");
        } else {
            if self.contains(Self::UNSIGNED) {
                name.push('u');
            }
            name.push_str(if self.contains(Self::FLOAT) { "float" } else { "int" });
            name.push_str(&format!("{}_t", size * 8));
        }

        if self.contains(Self::POINTER) {
            name.push_str(" *");
        }
        name
    }
}

/// Memory shape of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Built-in scalar or string type with no class behind it.
    Builtin {
        /// Size in bytes
        size: usize,
        /// Alignment requirement
        align: usize,
    },

    /// A bound class used by value.
    Value {
        /// Size in bytes
        size: usize,
        /// Alignment requirement
        align: usize,
    },

    /// Pointer to a bound class, as it crosses the boundary in heap mode.
    Pointer {
        /// Handle of the pointed-to value type
        target: TypeHash,
        is_const: bool,
    },
}

impl TypeKind {
    /// Builtin kind with the size and alignment of `T`.
    pub fn builtin<T>() -> Self {
        TypeKind::Builtin {
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }

    /// Value kind with the size and alignment of `T`.
    pub fn value<T>() -> Self {
        TypeKind::Value {
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }

    pub const fn pointer(target: TypeHash, is_const: bool) -> Self {
        TypeKind::Pointer { target, is_const }
    }

    /// Size in bytes. Pointers report the native pointer width.
    pub const fn size(&self) -> usize {
        match self {
            TypeKind::Builtin { size, .. } | TypeKind::Value { size, .. } => *size,
            TypeKind::Pointer { .. } => std::mem::size_of::<usize>(),
        }
    }

    pub const fn align(&self) -> usize {
        match self {
            TypeKind::Builtin { align, .. } | TypeKind::Value { align, .. } => *align,
            TypeKind::Pointer { .. } => std::mem::align_of::<usize>(),
        }
    }

    pub const fn is_pointer(&self) -> bool {
        matches!(self, TypeKind::Pointer { .. })
    }
}

/// What a method descriptor describes.
///
/// The numeric codes are what the host sees in `reflect` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MethodKind {
    Method = 0,
    Getter = 1,
    Setter = 2,
    Function = 3,
    Constructor = 4,
    Destructor = 5,
}

impl MethodKind {
    /// Decode a kind code received from the host.
    pub fn from_code(code: u8) -> Result<Self, RegistrationError> {
        Self::try_from(code).map_err(|_| RegistrationError::InvalidMethodKind(code))
    }

    /// True for kinds invoked with a `this` object.
    pub const fn has_this(self) -> bool {
        matches!(self, MethodKind::Method | MethodKind::Getter | MethodKind::Setter)
    }

    pub const fn name(self) -> &'static str {
        match self {
            MethodKind::Method => "method",
            MethodKind::Getter => "getter",
            MethodKind::Setter => "setter",
            MethodKind::Function => "function",
            MethodKind::Constructor => "constructor",
            MethodKind::Destructor => "destructor",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names() {
        assert_eq!(PrimitiveFlags::empty().type_name(1), "int8_t");
        assert_eq!(PrimitiveFlags::empty().type_name(8), "int64_t");
        assert_eq!(PrimitiveFlags::UNSIGNED.type_name(2), "uint16_t");
        assert_eq!(PrimitiveFlags::FLOAT.type_name(4), "float32_t");
        assert_eq!(PrimitiveFlags::SIGNLESS.type_name(1), "char");
        assert_eq!(
            (PrimitiveFlags::POINTER | PrimitiveFlags::UNSIGNED).type_name(1),
            "unsigned char *"
        );
        assert_eq!(PrimitiveFlags::POINTER.type_name(1), "signed char *");
        assert_eq!(
            (PrimitiveFlags::CONST | PrimitiveFlags::FLOAT).type_name(8),
            "const float64_t"
        );
    }

    #[test]
    fn flag_bits_are_stable() {
        assert_eq!(PrimitiveFlags::UNSIGNED.bits(), 1);
        assert_eq!(PrimitiveFlags::FLOAT.bits(), 2);
        assert_eq!(PrimitiveFlags::POINTER.bits(), 4);
        assert_eq!(PrimitiveFlags::CONST.bits(), 8);
        assert_eq!(PrimitiveFlags::SIGNLESS.bits(), 16);
    }

    #[test]
    fn type_kind_sizes() {
        let kind = TypeKind::value::<(u64, u8)>();
        assert_eq!(kind.size(), 16);
        assert_eq!(kind.align(), 8);

        let ptr = TypeKind::pointer(TypeHash::from_name("Point"), true);
        assert!(ptr.is_pointer());
        assert_eq!(ptr.size(), std::mem::size_of::<usize>());
    }

    #[test]
    fn method_kind_codes() {
        assert_eq!(u8::from(MethodKind::Getter), 1);
        assert_eq!(MethodKind::from_code(5).unwrap(), MethodKind::Destructor);
        assert_eq!(
            MethodKind::from_code(9),
            Err(RegistrationError::InvalidMethodKind(9))
        );
        assert!(MethodKind::Setter.has_this());
        assert!(!MethodKind::Function.has_this());
    }
}
