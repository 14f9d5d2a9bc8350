//! Native binding layer for embedding Rust types in a scripting host.
//!
//! The workspace is split the way the layers depend on each other:
//!
//! - `wirebind-core`: wire values, conversion policies and the
//!   [`FromWire`]/[`IntoWire`] conversion traits
//! - `wirebind-registry`: the write-once reflection registry
//! - this crate: the construction bridge ([`Creator`], [`ArgStorage`]) and
//!   the host-integration surface ([`BindingsBuilder`], [`Bindings`])
//!
//! # Example
//!
//! ```
//! use wirebind::{BindingsBuilder, Creator, NativeClass, ObjectHeap, WireValue};
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl NativeClass for Point {
//!     const NAME: &'static str = "Point";
//! }
//!
//! let mut builder = BindingsBuilder::new();
//! let point = builder
//!     .register_class::<Point>()
//!     .constructor(Creator::infallible(|(x, y): (i32, i32)| Point { x, y }))
//!     .method("sum", |p: &mut Point, (): ()| p.x + p.y)
//!     .build()
//!     .unwrap();
//! let bindings = builder.build().unwrap();
//!
//! let mut heap = ObjectHeap::new();
//! let p = bindings
//!     .construct(point, &[WireValue::Int(2), WireValue::Int(3)], &mut heap)
//!     .unwrap();
//! let sum = bindings
//!     .call_method(p.as_object().unwrap(), "sum", &[], &mut heap)
//!     .unwrap();
//! assert_eq!(sum, WireValue::Int(5));
//! ```

pub mod bindings;
pub mod call_context;
pub mod class_builder;
pub mod creator;
pub mod native_fn;
pub mod storage;

pub use bindings::{Bindings, BindingsBuilder, BindingsConfig};
pub use call_context::CallContext;
pub use class_builder::{CONSTRUCTOR_NAME, ClassBuilder, DESTRUCTOR_NAME};
pub use creator::{ConstructorFn, Creator};
pub use native_fn::{NativeCallable, NativeFn};
pub use storage::{ArgStorage, TypedArgStorage};

pub use wirebind_core::{
    ArgFromWire, ArgList, ArgPolicy, BindError, BindResult, Cloned, ConstructionError,
    ConversionError, FromWire, IntoWire, MethodKind, NativeClass, NativeError, NewObject,
    ObjectHandle, ObjectHeap, ObjectRef, Policy, PolicyFlags, PolicyList, PrimitiveFlags,
    RegistrationError, StorageError, TypeHash, TypeKind, UnknownTypeError, WireKind, WireType,
    WireValue,
};
pub use wirebind_registry::{
    ClassDescriptor, MethodDescriptor, PrimitiveDescriptor, Registry, RegistryBuilder,
    ReflectVisitor, TypeDescriptor, TypeDetail, ValueExport,
};
