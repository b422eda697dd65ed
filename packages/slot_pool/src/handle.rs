use std::any::type_name;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A reference to an item stored in a [`SlotPool<T>`][crate::SlotPool].
///
/// Handles are opaque `(index, generation)` pairs returned by
/// [`SlotPool::allocate()`][crate::SlotPool::allocate] and related methods. They are small,
/// freely copyable and carry no ownership: the item lives until it is explicitly deallocated,
/// no matter how many copies of its handle are still around.
///
/// # Stale handles
///
/// Every slot in the pool carries a generation counter that changes each time the slot is
/// allocated or deallocated. A handle only resolves while its generation matches the slot, so
/// once the item is deallocated, every copy of the handle stops resolving, even after the slot
/// is reused for a new item.
///
/// A default-constructed handle has generation zero, which is never assigned to an occupied
/// slot, so it never resolves in any pool.
///
/// # Example
///
/// ```rust
/// use slot_pool::{Handle, SlotPool};
///
/// let mut pool = SlotPool::<String>::new();
///
/// let handle = pool.allocate("Hello".to_string());
/// let copy = handle;
///
/// pool.deallocate(handle);
///
/// // All copies of the handle are now stale.
/// assert!(pool.get(copy).is_none());
///
/// // A default handle never refers to anything.
/// assert!(pool.get(Handle::default()).is_none());
/// ```
pub struct Handle<T> {
    index: u32,
    generation: u32,

    // The handle does not own a T, it only refers to one, so it is Send + Sync + Copy
    // regardless of what T is.
    _item: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Only the pool creates handles that point at a specific slot. Outside this crate the only
    /// way to obtain a handle is to allocate an item or to take the (invalid) default.
    #[must_use]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _item: PhantomData,
        }
    }

    /// The index of the slot the handle refers to.
    ///
    /// Indexes are reused after an item is deallocated, so the index alone does not identify
    /// an item. Use the handle itself for lookups.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// The generation of the slot at the time the handle was issued.
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Whether the handle was ever issued by a pool.
    ///
    /// This does not consult any pool, so a handle whose item has since been deallocated is
    /// still considered valid here. Use [`SlotPool::contains()`][crate::SlotPool::contains]
    /// to check whether the item is still alive.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{Handle, SlotPool};
    ///
    /// assert!(!Handle::<u32>::default().is_valid());
    ///
    /// let mut pool = SlotPool::<u32>::new();
    /// let handle = pool.allocate(42);
    /// assert!(handle.is_valid());
    /// ```
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.generation != 0
    }

    #[must_use]
    pub(crate) fn slot(self) -> usize {
        self.index as usize
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::new(0, 0)
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
        f.debug_struct("Handle")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}
