//! Generational arena for heap-constructed native objects.
//!
//! Objects built by heap construction are parked here and cross the
//! boundary as [`ObjectHandle`]s. A stale handle (its slot was freed and
//! possibly reused) never resolves, so the host cannot reach a dead object.

use std::any::{Any, TypeId};
use std::fmt;

/// Handle to a heap-allocated object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    /// Index into ObjectHeap.slots
    pub index: u32,
    /// Generation for use-after-free detection
    pub generation: u32,
    /// Rust TypeId of the stored object
    pub type_id: TypeId,
}

impl ObjectHandle {
    /// Create a new object handle.
    pub fn new(index: u32, generation: u32, type_id: TypeId) -> Self {
        Self {
            index,
            generation,
            type_id,
        }
    }

    /// Check whether this handle was issued for an object of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Heap storage with generational indices and reference counts.
pub struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

struct HeapSlot {
    generation: u32,
    value: Option<Box<dyn Any + Send + Sync>>,
    ref_count: u32,
}

impl ObjectHeap {
    /// Create a new empty object heap.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a new object on the heap.
    pub fn allocate<T: Any + Send + Sync>(&mut self, value: T) -> ObjectHandle {
        self.allocate_boxed(Box::new(value))
    }

    /// Allocate an already boxed, type-erased object.
    pub fn allocate_boxed(&mut self, boxed: Box<dyn Any + Send + Sync>) -> ObjectHandle {
        // Deref so the vtable reports the inner type, not the Box.
        let type_id = (*boxed).type_id();

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(boxed);
            slot.ref_count = 1;
            ObjectHandle::new(index, slot.generation, type_id)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                value: Some(boxed),
                ref_count: 1,
            });
            ObjectHandle::new(index, 0, type_id)
        }
    }

    fn live_slot(&self, handle: ObjectHandle) -> Option<&HeapSlot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    fn live_slot_mut(&mut self, handle: ObjectHandle) -> Option<&mut HeapSlot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    /// Check whether the handle still refers to a live object.
    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Get immutable reference to an object.
    ///
    /// Returns None if the handle is stale or the type doesn't match.
    pub fn get<T: Any>(&self, handle: ObjectHandle) -> Option<&T> {
        self.live_slot(handle)?.value.as_ref()?.downcast_ref::<T>()
    }

    /// Get mutable reference to an object.
    ///
    /// Returns None if the handle is stale or the type doesn't match.
    pub fn get_mut<T: Any>(&mut self, handle: ObjectHandle) -> Option<&mut T> {
        self.live_slot_mut(handle)?.value.as_mut()?.downcast_mut::<T>()
    }

    /// Increment reference count.
    pub fn add_ref(&mut self, handle: ObjectHandle) -> bool {
        match self.live_slot_mut(handle) {
            Some(slot) => {
                slot.ref_count = slot.ref_count.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Decrement reference count, free if zero.
    ///
    /// Returns true if the object was freed.
    pub fn release(&mut self, handle: ObjectHandle) -> bool {
        let Some(slot) = self.live_slot_mut(handle) else {
            return false;
        };
        slot.ref_count = slot.ref_count.saturating_sub(1);
        if slot.ref_count == 0 {
            self.free(handle);
            return true;
        }
        false
    }

    /// Remove the object regardless of its reference count and hand it back.
    pub fn remove(&mut self, handle: ObjectHandle) -> Option<Box<dyn Any + Send + Sync>> {
        let slot = self.live_slot_mut(handle)?;
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        slot.ref_count = 0;
        self.free_list.push(handle.index);
        value
    }

    /// Remove a typed object, leaving it in place if the type doesn't match.
    pub fn take<T: Any>(&mut self, handle: ObjectHandle) -> Option<T> {
        self.get::<T>(handle)?;
        let boxed = self.remove(handle)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// Free object immediately.
    pub fn free(&mut self, handle: ObjectHandle) {
        let _ = self.remove(handle);
    }

    /// Get the reference count for an object.
    pub fn ref_count(&self, handle: ObjectHandle) -> Option<u32> {
        self.live_slot(handle).map(|slot| slot.ref_count)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    /// Check if no objects are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}
