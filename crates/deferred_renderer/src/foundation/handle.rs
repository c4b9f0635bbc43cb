//! Generational handles and the registry that issues them
//!
//! Every resource pool in the renderer is a [`Registry`]. A [`Handle`] is an
//! `(index, generation)` pair; the generation stored in the slot changes on
//! every destroy, so a handle kept past the destruction of its slot no longer
//! validates even after the slot has been reused.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Opaque reference to a slot inside a [`Registry<T>`]
///
/// The default handle is the null handle and is never valid in any registry.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The null handle
    pub const NULL: Self = Self::new(u32::MAX, 0);

    const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index inside the owning registry
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// True for the default-constructed sentinel
    pub const fn is_null(&self) -> bool {
        self.generation == 0
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({}v{})", self.index, self.generation)
        }
    }
}

/// Error returned when destroying through a stale or null handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid handle (index {index}, generation {generation})")]
pub struct StaleHandle {
    /// Index carried by the rejected handle
    pub index: u32,
    /// Generation carried by the rejected handle
    pub generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Sparse array with a free list, addressed by [`Handle`]
///
/// Iteration yields live values in the order they were created. Destroyed
/// slots are reused by later creates. The creation-order list keeps entries
/// for destroyed slots until they outnumber the live ones, then drops them
/// in one sweep.
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    /// `(index, generation)` of every create, oldest first
    order: Vec<(u32, u32)>,
    stale: usize,
    live: usize,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            stale: 0,
            live: 0,
        }
    }

    /// Store `value` in a fresh or recycled slot
    pub fn create(&mut self, value: T) -> Handle<T> {
        self.live += 1;

        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Handle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                value: Some(value),
            });
            Handle::new(index, 1)
        };
        self.order.push((handle.index, handle.generation));
        handle
    }

    /// Store a default-constructed value
    pub fn create_default(&mut self) -> Handle<T>
    where
        T: Default,
    {
        self.create(T::default())
    }

    /// Free the slot behind `handle` and return its value
    ///
    /// The slot generation is bumped so every handle previously issued for it
    /// stops validating.
    pub fn destroy(&mut self, handle: Handle<T>) -> Result<T, StaleHandle> {
        if !self.valid(handle) {
            return Err(StaleHandle {
                index: handle.index,
                generation: handle.generation,
            });
        }

        let slot = &mut self.slots[handle.index as usize];
        // Generation 0 is reserved for the null handle
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(handle.index);
        self.live -= 1;
        let value = slot.value.take();

        self.stale += 1;
        if self.stale > self.live {
            self.compact_order();
        }

        value.ok_or(StaleHandle {
            index: handle.index,
            generation: handle.generation,
        })
    }

    fn compact_order(&mut self) {
        let slots = &self.slots;
        self.order.retain(|&(index, generation)| {
            let slot = &slots[index as usize];
            slot.generation == generation && slot.value.is_some()
        });
        self.stale = 0;
    }

    /// True while `handle` addresses a live slot
    pub fn valid(&self, handle: Handle<T>) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    /// Borrow the value behind `handle`, if it is still live
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutably borrow the value behind `handle`, if it is still live
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Number of live values
    pub const fn len(&self) -> usize {
        self.live
    }

    /// True when no value is live
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live values in creation order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.order.iter().filter_map(move |&(index, generation)| {
            let handle = Handle::new(index, generation);
            self.get(handle).map(|value| (handle, value))
        })
    }

    /// Live values in creation order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.iter().map(|(_, value)| value)
    }

    /// Drop every value and invalidate every issued handle
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1).max(1);
                self.free.push(index as u32);
            }
        }
        self.order.clear();
        self.stale = 0;
        self.live = 0;
    }
}

impl<T> Index<Handle<T>> for Registry<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!(
                "invalid {} handle {handle:?}",
                std::any::type_name::<T>()
            ),
        }
    }
}

impl<T> IndexMut<Handle<T>> for Registry<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!(
                "invalid {} handle {handle:?}",
                std::any::type_name::<T>()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_round_trip() {
        let mut registry = Registry::new();
        let handle = registry.create(7_u32);

        assert!(registry.valid(handle));
        assert_eq!(registry[handle], 7);

        assert_eq!(registry.destroy(handle), Ok(7));
        assert!(!registry.valid(handle));
        assert!(registry.get(handle).is_none());
    }

    #[test]
    #[should_panic(expected = "invalid")]
    fn test_index_after_destroy_panics() {
        let mut registry = Registry::new();
        let handle = registry.create(1_u8);
        registry.destroy(handle).unwrap();
        let _ = registry[handle];
    }

    #[test]
    fn test_generation_non_aliasing() {
        let mut registry = Registry::new();
        let first = registry.create("first");
        registry.destroy(first).unwrap();
        let second = registry.create("second");

        // Same slot, different generation
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(!registry.valid(first));
        assert!(registry.valid(second));
        assert_eq!(registry[second], "second");
    }

    #[test]
    fn test_destroy_twice_fails() {
        let mut registry = Registry::new();
        let handle = registry.create(3_i32);
        registry.destroy(handle).unwrap();

        let err = registry.destroy(handle).unwrap_err();
        assert_eq!(err.index, handle.index());
    }

    #[test]
    fn test_null_handle_never_valid() {
        let mut registry: Registry<i32> = Registry::new();
        registry.create(1);
        assert!(Handle::<i32>::default().is_null());
        assert!(!registry.valid(Handle::default()));
        assert!(registry.destroy(Handle::NULL).is_err());
    }

    #[test]
    fn test_iteration_follows_creation_order() {
        let mut registry = Registry::new();
        let a = registry.create('a');
        let _b = registry.create('b');
        let _c = registry.create('c');
        registry.destroy(a).unwrap();
        // Reuses slot 0 but is the newest entry
        registry.create('d');

        let order: String = registry.values().collect();
        assert_eq!(order, "bcd");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_free_list_bounds_memory() {
        let mut registry = Registry::new();
        for i in 0..100 {
            let handle = registry.create(i);
            registry.destroy(handle).unwrap();
        }
        assert_eq!(registry.slots.len(), 1);
        assert!(registry.order.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_order_list_is_compacted_under_churn() {
        let mut registry = Registry::new();
        let kept: Vec<_> = (0..4).map(|i| registry.create(i)).collect();
        for i in 10..200 {
            let handle = registry.create(i);
            registry.destroy(handle).unwrap();
            assert!(registry.order.len() <= 2 * registry.len() + 1);
        }

        let order: Vec<_> = registry.iter().map(|(handle, value)| (handle, *value)).collect();
        assert_eq!(order, kept.iter().copied().zip(0..4).collect::<Vec<_>>());
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut registry = Registry::new();
        let handles: Vec<_> = (0..4).map(|i| registry.create(i)).collect();
        registry.clear();

        assert!(registry.is_empty());
        assert!(handles.iter().all(|h| !registry.valid(*h)));
    }
}
