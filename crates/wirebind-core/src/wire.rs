//! Host-native values crossing the binding boundary.

use std::fmt;

use crate::ObjectHandle;

/// The dynamic kind of a [`WireValue`], reported in conversion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    Void,
    Null,
    Bool,
    Int,
    Float,
    String,
    Object,
}

impl WireKind {
    /// Human-readable name of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            WireKind::Void => "void",
            WireKind::Null => "null",
            WireKind::Bool => "bool",
            WireKind::Int => "int",
            WireKind::Float => "float",
            WireKind::String => "string",
            WireKind::Object => "object",
        }
    }
}

impl fmt::Display for WireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single argument or return value in the host runtime's representation.
///
/// The core never inspects a `WireValue` except through the conversion
/// traits in [`crate::convert`]. Objects live in an
/// [`ObjectHeap`](crate::ObjectHeap) and cross the boundary as handles.
#[derive(Clone, PartialEq)]
pub enum WireValue {
    /// Absent value (no return, missing optional argument)
    Void,
    /// Explicit null
    Null,
    Bool(bool),
    /// All integer widths travel as i64
    Int(i64),
    /// Both float widths travel as f64
    Float(f64),
    String(String),
    /// Reference to a previously bound native object
    Object(ObjectHandle),
}

impl WireValue {
    /// Get the dynamic kind of this value.
    pub fn kind(&self) -> WireKind {
        match self {
            WireValue::Void => WireKind::Void,
            WireValue::Null => WireKind::Null,
            WireValue::Bool(_) => WireKind::Bool,
            WireValue::Int(_) => WireKind::Int,
            WireValue::Float(_) => WireKind::Float,
            WireValue::String(_) => WireKind::String,
            WireValue::Object(_) => WireKind::Object,
        }
    }

    /// Check if this value is void.
    pub fn is_void(&self) -> bool {
        matches!(self, WireValue::Void)
    }

    /// Check if this value is null or void. Both count as "empty" for
    /// nullability checks.
    pub fn is_empty(&self) -> bool {
        matches!(self, WireValue::Null | WireValue::Void)
    }

    /// Get the object handle if this value refers to a bound object.
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            WireValue::Object(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl Default for WireValue {
    fn default() -> Self {
        WireValue::Void
    }
}

impl fmt::Debug for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Void => write!(f, "Void"),
            WireValue::Null => write!(f, "Null"),
            WireValue::Bool(v) => write!(f, "Bool({})", v),
            WireValue::Int(v) => write!(f, "Int({})", v),
            WireValue::Float(v) => write!(f, "Float({})", v),
            WireValue::String(s) => write!(f, "String({:?})", s),
            WireValue::Object(h) => write!(f, "Object({}:{})", h.index, h.generation),
        }
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        WireValue::Int(v)
    }
}

impl From<i32> for WireValue {
    fn from(v: i32) -> Self {
        WireValue::Int(v as i64)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        WireValue::Float(v)
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        WireValue::Bool(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        WireValue::String(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        WireValue::String(v)
    }
}

impl From<ObjectHandle> for WireValue {
    fn from(v: ObjectHandle) -> Self {
        WireValue::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(WireValue::Void.kind(), WireKind::Void);
        assert_eq!(WireValue::Null.kind(), WireKind::Null);
        assert_eq!(WireValue::Int(1).kind(), WireKind::Int);
        assert_eq!(WireValue::Float(1.0).kind(), WireKind::Float);
        assert_eq!(WireValue::Bool(true).kind(), WireKind::Bool);
        assert_eq!(WireValue::from("x").kind(), WireKind::String);
        assert_eq!(WireKind::String.to_string(), "string");
    }

    #[test]
    fn emptiness() {
        assert!(WireValue::Null.is_empty());
        assert!(WireValue::Void.is_empty());
        assert!(!WireValue::Int(0).is_empty());
        assert!(WireValue::default().is_void());
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", WireValue::Int(42)), "Int(42)");
        assert_eq!(format!("{:?}", WireValue::from("x")), "String(\"x\")");
    }
}
