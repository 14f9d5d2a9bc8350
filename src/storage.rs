//! Host-owned slots for in-place construction.
//!
//! A [`TypedArgStorage<T>`] holds at most one `T` inline, with no
//! allocation. The host owns the slot and decides when the object inside is
//! destroyed; construction only ever initializes an empty slot, and never
//! drops or replaces a live object.
//!
//! [`ArgStorage`] is the type-erased view the construction bridge receives.
//! It is resolved back to the concrete slot type by downcasting, so a slot
//! of the wrong type is a reported error rather than a reinterpretation.

use std::any::Any;
use std::fmt;

use wirebind_core::StorageError;

/// Type-erased view of a construction slot.
pub trait ArgStorage {
    /// Whether the slot currently holds a live object.
    fn is_initialized(&self) -> bool;

    /// Name of the type the slot holds.
    fn type_name(&self) -> &'static str;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An inline slot for one `T`.
pub struct TypedArgStorage<T> {
    slot: Option<T>,
}

impl<T> TypedArgStorage<T> {
    /// An empty slot.
    pub const fn new() -> Self {
        Self { slot: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.slot.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.slot.as_mut()
    }

    /// Move the object out, leaving the slot empty.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Destroy the object in place, leaving the slot empty.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Initialize an empty slot.
    ///
    /// # Errors
    ///
    /// [`StorageError::Occupied`] if the slot already holds an object; the
    /// live object is left untouched and `value` is dropped.
    pub(crate) fn init(&mut self, value: T) -> Result<&mut T, StorageError> {
        if self.slot.is_some() {
            return Err(StorageError::Occupied {
                type_name: std::any::type_name::<T>(),
            });
        }
        Ok(self.slot.insert(value))
    }
}

impl<T> Default for TypedArgStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for TypedArgStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedArgStorage").field(&self.slot).finish()
    }
}

impl<T: Any> ArgStorage for TypedArgStorage<T> {
    fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Resolve an erased slot to the concrete slot for `T`.
pub(crate) fn typed_slot<T: Any>(
    storage: &mut dyn ArgStorage,
) -> Result<&mut TypedArgStorage<T>, StorageError> {
    storage
        .as_any_mut()
        .downcast_mut::<TypedArgStorage<T>>()
        .ok_or(StorageError::Mismatch {
            expected: std::any::type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_once() {
        let mut slot = TypedArgStorage::<String>::new();
        assert!(!slot.is_initialized());
        slot.init("a".to_string()).unwrap();
        assert_eq!(slot.get().map(String::as_str), Some("a"));

        let err = slot.init("b".to_string()).unwrap_err();
        assert!(matches!(err, StorageError::Occupied { .. }));
        assert_eq!(slot.get().map(String::as_str), Some("a"));
    }

    #[test]
    fn take_and_clear_empty_the_slot() {
        let mut slot = TypedArgStorage::new();
        slot.init(5u32).unwrap();
        assert_eq!(slot.take(), Some(5));
        assert!(!slot.is_initialized());

        slot.init(6).unwrap();
        slot.clear();
        assert!(slot.get().is_none());
        assert!(slot.init(7).is_ok());
    }

    #[test]
    fn erased_slot_resolves_only_to_its_type() {
        let mut slot = TypedArgStorage::<u32>::new();
        let erased: &mut dyn ArgStorage = &mut slot;
        assert!(typed_slot::<u32>(erased).is_ok());
        assert_eq!(
            typed_slot::<i64>(erased).unwrap_err(),
            StorageError::Mismatch { expected: "i64" }
        );
        assert_eq!(erased.type_name(), "u32");
    }
}
