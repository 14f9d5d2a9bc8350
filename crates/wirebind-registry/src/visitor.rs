//! Host-facing reflection callbacks.

use wirebind_core::TypeHash;

use crate::descriptors::{ClassDescriptor, MethodDescriptor, PrimitiveDescriptor, TypeDescriptor};

/// Receives every descriptor during [`Registry::reflect`](crate::Registry::reflect).
///
/// All methods default to doing nothing, so a host only implements the
/// categories it cares about.
pub trait ReflectVisitor {
    fn visit_primitive(&mut self, _primitive: &PrimitiveDescriptor) {}

    fn visit_type(&mut self, _ty: &TypeDescriptor) {}

    fn visit_class(&mut self, _class: &ClassDescriptor) {}

    fn visit_method(&mut self, _method: &MethodDescriptor) {}
}

/// Four independent callbacks acting as one visitor.
pub(crate) struct CallbackVisitor<P, T, C, M> {
    pub(crate) on_primitive: P,
    pub(crate) on_type: T,
    pub(crate) on_class: C,
    pub(crate) on_method: M,
}

impl<P, T, C, M> ReflectVisitor for CallbackVisitor<P, T, C, M>
where
    P: FnMut(&PrimitiveDescriptor),
    T: FnMut(&TypeDescriptor),
    C: FnMut(&ClassDescriptor),
    M: FnMut(&MethodDescriptor),
{
    fn visit_primitive(&mut self, primitive: &PrimitiveDescriptor) {
        (self.on_primitive)(primitive)
    }

    fn visit_type(&mut self, ty: &TypeDescriptor) {
        (self.on_type)(ty)
    }

    fn visit_class(&mut self, class: &ClassDescriptor) {
        (self.on_class)(class)
    }

    fn visit_method(&mut self, method: &MethodDescriptor) {
        (self.on_method)(method)
    }
}

/// What a type handle resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDetail<'a> {
    Primitive(&'a PrimitiveDescriptor),
    Type {
        descriptor: &'a TypeDescriptor,
        /// Present when the type is a view of a bound class.
        class: Option<&'a ClassDescriptor>,
    },
}

impl<'a> TypeDetail<'a> {
    pub fn id(&self) -> TypeHash {
        match self {
            TypeDetail::Primitive(p) => p.id,
            TypeDetail::Type { descriptor, .. } => descriptor.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            TypeDetail::Primitive(p) => &p.name,
            TypeDetail::Type { descriptor, .. } => &descriptor.name,
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        match self {
            TypeDetail::Primitive(p) => p.size as usize,
            TypeDetail::Type { descriptor, .. } => descriptor.kind.size(),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDetail::Primitive(_))
    }

    pub fn class(&self) -> Option<&'a ClassDescriptor> {
        match *self {
            TypeDetail::Type { class, .. } => class,
            TypeDetail::Primitive(_) => None,
        }
    }
}
