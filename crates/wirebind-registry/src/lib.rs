//! Write-once reflection registry for bound entities.
//!
//! The registry has two phases. During registration a [`RegistryBuilder`]
//! collects [`PrimitiveDescriptor`]s, [`TypeDescriptor`]s,
//! [`ClassDescriptor`]s, [`MethodDescriptor`]s and [`ValueExport`]s. A
//! successful [`RegistryBuilder::build`] freezes them into a [`Registry`],
//! which the host then queries through [`Registry::reflect`] and
//! [`Registry::query_type`].

pub mod builder;
pub mod descriptors;
pub mod primitive;
pub mod registry;
pub mod visitor;

pub use builder::RegistryBuilder;
pub use descriptors::{
    ClassDescriptor, MethodDef, MethodDescriptor, PrimitiveDescriptor, TypeDescriptor, ValueExport,
};
pub use primitive::{NativeBuiltin, NativePrimitive};
pub use registry::Registry;
pub use visitor::{ReflectVisitor, TypeDetail};
