//! Error types for the binding layer.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BindError (unified)
//! ├── ConversionError    - a wire value does not satisfy the native type under its policy
//! ├── ConstructionError  - a native constructor failed after its arguments converted
//! ├── StorageError       - in-place construction into an unusable storage slot
//! ├── UnknownTypeError   - a type handle that was never registered
//! ├── RegistrationError  - duplicate or dangling registrations (fatal at startup)
//! └── NativeError        - call-boundary failures (bad `this`, no such overload, ...)
//! ```
//!
//! Per-call errors are recoverable and reported to the caller of that one
//! operation. Registration errors prevent the registry from ever serving.

use std::fmt;

use thiserror::Error;

use crate::{ArgPolicy, TypeHash, WireKind};

// ============================================================================
// Conversion Errors
// ============================================================================

/// A wire value could not be converted into the requested native type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The wire value has the wrong dynamic kind.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: WireKind,
    },

    /// A null or void wire value where the policy requires a value.
    #[error("null value cannot be converted to {expected}")]
    NullValue { expected: &'static str },

    /// Integer out of range for the target type.
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow {
        value: i128,
        target_type: &'static str,
    },

    /// Float that cannot be represented by the target type without loss.
    #[error("float conversion error: value {value} cannot be represented as {target_type}")]
    FloatConversion {
        value: f64,
        target_type: &'static str,
    },

    /// A string of the wrong shape, such as a multi-character `char`.
    #[error("invalid string for {target_type}: {value:?}")]
    InvalidString {
        value: String,
        target_type: &'static str,
    },

    /// The object handle refers to a freed object.
    #[error("stale object handle: object at index {index} has been freed")]
    StaleHandle { index: u32 },

    /// The host supplied the wrong number of arguments.
    #[error("expected {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Failure while converting one specific argument.
    #[error("argument {index} ({policy}): {source}")]
    Argument {
        index: usize,
        policy: ArgPolicy,
        #[source]
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    /// Attach the argument position and effective policy to a failure.
    pub fn at_argument(self, index: usize, policy: ArgPolicy) -> Self {
        ConversionError::Argument {
            index,
            policy,
            source: Box::new(self),
        }
    }

    /// Zero-based index of the failing argument, when known.
    pub fn argument_index(&self) -> Option<usize> {
        match self {
            ConversionError::Argument { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The innermost failure, without argument context.
    pub fn root(&self) -> &ConversionError {
        match self {
            ConversionError::Argument { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the native type the conversion expected, when known.
    pub fn expected_type(&self) -> Option<&'static str> {
        match self.root() {
            ConversionError::TypeMismatch { expected, .. }
            | ConversionError::NullValue { expected } => Some(*expected),
            ConversionError::IntegerOverflow { target_type, .. }
            | ConversionError::FloatConversion { target_type, .. }
            | ConversionError::InvalidString { target_type, .. } => Some(*target_type),
            _ => None,
        }
    }
}

// ============================================================================
// Construction Errors
// ============================================================================

/// The native constructor itself failed. Propagated to the host unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("construction failed: {message}")]
pub struct ConstructionError {
    pub message: String,
}

impl ConstructionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Storage Errors
// ============================================================================

/// Problems with a caller-supplied in-place construction slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The slot already holds a live object.
    #[error("storage for {type_name} is already initialized")]
    Occupied { type_name: &'static str },

    /// The slot was sized for a different type.
    #[error("storage mismatch: slot cannot hold {expected}")]
    Mismatch { expected: &'static str },
}

// ============================================================================
// Reflection Errors
// ============================================================================

/// A type handle that does not correspond to any registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown type handle {handle}")]
pub struct UnknownTypeError {
    pub handle: TypeHash,
}

/// Kind of entity involved in a registration conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Primitive,
    Type,
    Class,
    Method,
    Value,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Primitive => "primitive",
            EntityKind::Type => "type",
            EntityKind::Class => "class",
            EntityKind::Method => "method",
            EntityKind::Value => "value",
        })
    }
}

/// Errors raised while populating the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A name was registered twice.
    #[error("duplicate registration: {name} already registered as {kind}")]
    DuplicateName { name: String, kind: EntityKind },

    /// A handle was registered twice (including hash collisions between names).
    #[error("duplicate handle {handle}: already registered as {kind}")]
    DuplicateHandle { handle: TypeHash, kind: EntityKind },

    /// A descriptor references a type handle that was never registered.
    #[error("type not found: {handle} (referenced by {referenced_by})")]
    TypeNotFound {
        handle: TypeHash,
        referenced_by: String,
    },

    /// A policy table names a policy that does not exist.
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    /// A policy entry targets an argument the signature does not have.
    #[error("policy {policy} targets argument {index}, but the signature has {arity} arguments")]
    PolicyOutOfRange {
        policy: &'static str,
        index: usize,
        arity: usize,
    },

    /// A method kind code from the host that is not a known kind.
    #[error("invalid method kind code {0}")]
    InvalidMethodKind(u8),
}

// ============================================================================
// Call Errors
// ============================================================================

/// Failures at the call boundary that are not conversion failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    /// Missing or unusable `this` for a method call.
    #[error("invalid 'this' reference: {message}")]
    InvalidThis { message: String },

    /// No bound function or method under this name.
    #[error("no bound function named {name}")]
    UnknownFunction { name: String },

    /// A name is bound, but no overload takes this many arguments.
    #[error("no overload of {name} takes {arity} arguments")]
    NoOverload { name: String, arity: usize },

    /// No constructor of this class takes this many arguments.
    #[error("no constructor of {class} takes {arity} arguments")]
    NoConstructor { class: String, arity: usize },

    /// The class has no bound destructor.
    #[error("class {class} has no destructor")]
    NoDestructor { class: String },

    /// The native function reported a failure of its own.
    #[error("native function failed: {message}")]
    Failed { message: String },
}

impl NativeError {
    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        NativeError::Failed {
            message: message.into(),
        }
    }
}

// ============================================================================
// Unified Error
// ============================================================================

/// Any error the binding layer reports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Native(#[from] NativeError),
}

impl BindError {
    pub fn is_conversion(&self) -> bool {
        matches!(self, BindError::Conversion(_))
    }

    pub fn is_construction(&self) -> bool {
        matches!(self, BindError::Construction(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, BindError::Storage(_))
    }

    pub fn is_unknown_type(&self) -> bool {
        matches!(self, BindError::UnknownType(_))
    }

    pub fn is_registration(&self) -> bool {
        matches!(self, BindError::Registration(_))
    }

    /// The conversion failure, if this is one.
    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            BindError::Conversion(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias used throughout the binding layer.
pub type BindResult<T> = Result<T, BindError>;
