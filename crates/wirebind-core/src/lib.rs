//! Shared vocabulary of the wirebind crates.
//!
//! This crate is the wire-conversion layer: it turns loosely typed
//! [`WireValue`]s from a scripting host into exact native Rust types under
//! per-argument [`ArgPolicy`]s, and back again for return values. It also
//! defines the handles, shape metadata and error types the registry and the
//! construction bridge build on.
//!
//! # Key Types
//!
//! - [`WireValue`] / [`WireKind`]: host-side values and their dynamic kinds
//! - [`Policy`], [`ArgPolicy`], [`PolicyList`]: conversion policies
//! - [`FromWire`], [`IntoWire`], [`ArgFromWire`], [`ArgList`]: conversion
//! - [`ObjectHeap`] / [`ObjectHandle`]: storage for heap-constructed objects
//! - [`TypeHash`]: stable handles for registered entities
//! - [`BindError`] and its parts: everything that can go wrong

pub mod arg_list;
pub mod convert;
pub mod error;
pub mod object_heap;
pub mod policy;
pub mod type_hash;
pub mod types;
pub mod wire;

pub use arg_list::{ArgList, check_arity};
pub use convert::{ArgFromWire, Cloned, FromWire, IntoWire, NativeClass, NewObject, ObjectRef, WireType};
pub use error::{
    BindError, BindResult, ConstructionError, ConversionError, EntityKind, NativeError,
    RegistrationError, StorageError, UnknownTypeError,
};
pub use object_heap::{ObjectHandle, ObjectHeap};
pub use policy::{ArgPolicy, Passing, Policy, PolicyFlags, PolicyList, PolicyTarget};
pub use type_hash::TypeHash;
pub use types::{MethodKind, PrimitiveFlags, TypeKind};
pub use wire::{WireKind, WireValue};
