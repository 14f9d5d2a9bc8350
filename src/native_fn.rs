//! Native function storage and callable trait.

use std::fmt;
use std::sync::Arc;

use wirebind_core::{BindError, TypeHash};

use crate::call_context::CallContext;

/// Type-erased native function.
///
/// Wraps any callable implementing [`NativeCallable`] so that methods,
/// accessors and free functions of different signatures are stored
/// uniformly. The id is the handle of the method descriptor the function
/// implements.
pub struct NativeFn {
    pub id: TypeHash,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(id: TypeHash, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self {
            id,
            inner: Arc::new(f),
        }
    }

    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), BindError> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Clone for NativeFn {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Something the host can call through a [`CallContext`].
pub trait NativeCallable {
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), BindError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), BindError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), BindError> {
        (self)(ctx)
    }
}
