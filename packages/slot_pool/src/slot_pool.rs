use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::thread;

use crate::{Block, DropOnly, DropPolicy, FixedStack, Handle, SlotPoolBuilder, Teardown};

/// The largest number of slots a pool can have. Slot indexes are 32-bit.
pub const MAX_CAPACITY: usize = u32::MAX as usize;

/// The number of slots a pool preallocates if not configured otherwise.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// The factor by which a pool multiplies its capacity when it runs out of free slots,
/// if not configured otherwise.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// An object pool of unbounded size whose items are referenced by generation-checked handles.
///
/// Every inserted item is assigned a slot and the caller receives a [`Handle<T>`] to it.
/// Handles are small, copyable values; the pool checks on every access that the handle is
/// still current, so a handle to an item that has since been deallocated safely resolves to
/// nothing instead of to whatever item now occupies the slot.
///
/// There are multiple ways to insert items into the pool:
///
/// * [`allocate()`][1] - inserts a value and returns the handle.
/// * [`allocate_with()`][2] - builds the value with a closure and inserts it.
/// * [`allocate_with_handle()`][3] - builds the value with a closure that receives the handle
///   the value will be stored under, useful if the item needs to know its own handle.
/// * [`allocate_default()`][4] - inserts `T::default()`.
///
/// # Slot reuse
///
/// Deallocated slots are reused most-recently-freed first, which tends to keep the hot part of
/// the pool small. Slots added by growth are handed out in ascending index order.
///
/// # Resource usage
///
/// The pool starts with a configurable number of preallocated slots and multiplies its capacity
/// by a configurable growth factor whenever it runs out of free slots. Capacity never shrinks.
///
/// Storage is organized as a list of blocks, with growth appending a new block. Existing blocks
/// are never moved, so the memory address of an item is stable from allocation until
/// deallocation, regardless of growth.
///
/// # Teardown
///
/// Items are dropped when deallocated. Pools built with
/// [`SlotPoolBuilder::dispose_on_free()`][5] additionally call [`Dispose::dispose()`][6] on each
/// item right before it is dropped.
///
/// # Thread safety
///
/// All mutation goes through `&mut self`. The pool is thread-mobile if `T` is, and can be
/// shared between threads behind a lock such as `Mutex`.
///
/// # Example
///
/// ```rust
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<String>::new();
///
/// let hello = pool.allocate("Hello".to_string());
/// assert_eq!(pool.get(hello).map(String::as_str), Some("Hello"));
///
/// pool.deallocate(hello);
/// assert!(pool.get(hello).is_none());
/// ```
///
/// [1]: Self::allocate
/// [2]: Self::allocate_with
/// [3]: Self::allocate_with_handle
/// [4]: Self::allocate_default
/// [5]: crate::SlotPoolBuilder::dispose_on_free
/// [6]: crate::Dispose::dispose
pub struct SlotPool<T, D: Teardown<T> = DropOnly> {
    /// The blocks that provide the storage of the pool, in ascending index order. Together they
    /// cover exactly the index range `0..capacity` without gaps.
    blocks: Vec<Block<T>>,

    /// Generation of every slot, indexed by pool-wide slot index. The length is the capacity.
    generations: Vec<u32>,

    /// Indexes of every vacant slot. Its maximum length always equals the capacity.
    free_list: FixedStack<u32>,

    /// Number of occupied slots.
    len: usize,

    growth_factor: usize,
    drop_policy: DropPolicy,

    _teardown: PhantomData<D>,
}

impl<T> SlotPool<T> {
    /// Creates a new [`SlotPool`] with the default configuration.
    ///
    /// The pool preallocates [`DEFAULT_INITIAL_CAPACITY`] slots and grows by a factor of
    /// [`DEFAULT_GROWTH_FACTOR`] whenever it runs out.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{DEFAULT_INITIAL_CAPACITY, SlotPool};
    ///
    /// let pool = SlotPool::<u64>::new();
    ///
    /// assert!(pool.is_empty());
    /// assert_eq!(pool.capacity(), DEFAULT_INITIAL_CAPACITY);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`SlotPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .initial_capacity(4)
    ///     .growth_factor(3)
    ///     .build();
    ///
    /// assert_eq!(pool.capacity(), 4);
    /// ```
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }
}

impl<T, D: Teardown<T>> SlotPool<T, D> {
    /// Creates a pool from an already validated configuration.
    #[must_use]
    pub(crate) fn new_inner(
        initial_capacity: usize,
        growth_factor: usize,
        drop_policy: DropPolicy,
    ) -> Self {
        debug_assert!(growth_factor >= 2, "validated by the builder");
        debug_assert!(initial_capacity <= MAX_CAPACITY, "validated by the builder");

        let mut pool = Self {
            blocks: Vec::new(),
            generations: Vec::new(),
            free_list: FixedStack::with_capacity(0),
            len: 0,
            growth_factor,
            drop_policy,
            _teardown: PhantomData,
        };

        if initial_capacity > 0 {
            pool.grow_to(initial_capacity);
        }

        pool
    }

    /// The total number of slots in the pool, both occupied and vacant.
    ///
    /// This is the same as [`capacity()`][Self::capacity]. Use [`len()`][Self::len] for the
    /// number of items in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.capacity()
    }

    /// The number of items the pool can hold without growing, including existing items.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u8>::builder().initial_capacity(1).build();
    /// assert_eq!(pool.capacity(), 1);
    ///
    /// let a = pool.allocate(1);
    /// let b = pool.allocate(2);
    ///
    /// // The pool doubled its capacity to fit the second item.
    /// assert_eq!(pool.capacity(), 2);
    /// # pool.deallocate(a);
    /// # pool.deallocate(b);
    /// ```
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    /// The number of items in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool holds no items.
    ///
    /// An empty pool may still be holding unused capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the handle refers to an item that is still in the pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new();
    /// let handle = pool.allocate(42);
    /// assert!(pool.contains(handle));
    ///
    /// pool.deallocate(handle);
    /// assert!(!pool.contains(handle));
    /// ```
    #[must_use]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Inserts an item into the pool and returns its handle.
    ///
    /// If there is no vacant slot, the pool grows first.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<i32>::new();
    ///
    /// let handle = pool.allocate(42);
    /// assert_eq!(pool.get(handle), Some(&42));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool needs to grow but already has [`MAX_CAPACITY`] slots.
    #[must_use]
    pub fn allocate(&mut self, value: T) -> Handle<T> {
        self.allocate_with_handle(|_| value)
    }

    /// Builds an item with the provided closure and inserts it into the pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<Vec<u8>>::new();
    ///
    /// let handle = pool.allocate_with(|| vec![0; 16]);
    /// assert_eq!(pool.get(handle).map(Vec::len), Some(16));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool needs to grow but already has [`MAX_CAPACITY`] slots.
    #[must_use]
    pub fn allocate_with(&mut self, f: impl FnOnce() -> T) -> Handle<T> {
        self.allocate_with_handle(|_| f())
    }

    /// Builds an item with the provided closure, which receives the handle the item will be
    /// stored under, and inserts it into the pool.
    ///
    /// If the closure panics, the pool is left unchanged, apart from any growth that was needed
    /// to find a vacant slot.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::{Handle, SlotPool};
    ///
    /// struct Node {
    ///     me: Handle<Node>,
    /// }
    ///
    /// let mut pool = SlotPool::<Node>::new();
    ///
    /// let handle = pool.allocate_with_handle(|me| Node { me });
    /// assert_eq!(pool.get(handle).map(|node| node.me), Some(handle));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool needs to grow but already has [`MAX_CAPACITY`] slots.
    #[must_use]
    pub fn allocate_with_handle(&mut self, f: impl FnOnce(Handle<T>) -> T) -> Handle<T> {
        let index = self.next_free_index();
        let generation = next_generation(self.generation_at(index));
        let handle = Handle::new(index, generation);

        // Nothing is committed until the value exists, so a panicking closure cannot leave
        // behind a slot that is neither vacant nor occupied.
        let value = f(handle);

        let popped = self.free_list.pop();
        debug_assert_eq!(popped, Some(index), "the free list changed during allocation");

        *self
            .generations
            .get_mut(handle.slot())
            .expect("free list only holds indexes below capacity") = generation;

        let (block, offset) = self
            .locate_mut(index)
            .expect("free list only holds indexes below capacity");
        block.insert(offset, value);

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by capacity <= MAX_CAPACITY");

        handle
    }

    /// Gets a reference to the item the handle refers to.
    ///
    /// Returns `None` if the item has been deallocated, if the handle is the default handle or
    /// if the handle was issued by a different pool and does not match any item here.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::new();
    /// let handle = pool.allocate("Hello, World!".to_string());
    ///
    /// assert_eq!(pool.get(handle).map(String::as_str), Some("Hello, World!"));
    ///
    /// pool.deallocate(handle);
    /// assert_eq!(pool.get(handle), None);
    /// ```
    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if !self.is_current(handle) {
            return None;
        }

        let (block, offset) = self.locate(handle.index())?;
        block.get(offset)
    }

    /// Gets an exclusive reference to the item the handle refers to.
    ///
    /// Returns `None` under the same conditions as [`get()`][Self::get].
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::new();
    /// let handle = pool.allocate("Hello".to_string());
    ///
    /// if let Some(item) = pool.get_mut(handle) {
    ///     item.push_str(", World!");
    /// }
    ///
    /// assert_eq!(pool.get(handle).map(String::as_str), Some("Hello, World!"));
    /// ```
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if !self.is_current(handle) {
            return None;
        }

        let (block, offset) = self.locate_mut(handle.index())?;
        block.get_mut(offset)
    }

    /// Removes the item the handle refers to from the pool and drops it.
    ///
    /// Does nothing if the handle does not refer to an item in the pool, so deallocating the
    /// same handle twice is harmless. Once this returns, the handle and all its copies are
    /// stale, even after the slot is reused for a new item.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::new();
    /// let handle = pool.allocate("Hello".to_string());
    /// assert_eq!(pool.len(), 1);
    ///
    /// pool.deallocate(handle);
    /// assert!(pool.is_empty());
    ///
    /// // Deallocating again is a no-op.
    /// pool.deallocate(handle);
    /// ```
    pub fn deallocate(&mut self, handle: Handle<T>) {
        drop(self.remove(handle));
    }

    /// Removes the item the handle refers to from the pool and returns it.
    ///
    /// Returns `None` and does nothing if the handle does not refer to an item in the pool.
    /// If the pool calls [`Dispose::dispose()`][crate::Dispose::dispose] on its items, this
    /// happens before the item is returned.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::new();
    /// let handle = pool.allocate("Hello".to_string());
    ///
    /// assert_eq!(pool.remove(handle), Some("Hello".to_string()));
    /// assert_eq!(pool.remove(handle), None);
    /// ```
    #[must_use = "use deallocate() if you do not need the removed item"]
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        // A vacant slot keeps the generation it was freed with, so a forged handle can match
        // the generation of a slot that holds nothing.
        let taken = if self.is_current(handle) {
            self.locate_mut(handle.index())
                .and_then(|(block, offset)| block.take(offset))
        } else {
            None
        };

        let Some(mut value) = taken else {
            tracing::trace!(
                item_type = type_name::<T>(),
                index = handle.index(),
                generation = handle.generation(),
                "ignoring removal of stale handle"
            );

            return None;
        };

        self.free_list
            .push(handle.index())
            .expect("free list capacity always matches pool capacity");

        let generation = self
            .generations
            .get_mut(handle.slot())
            .expect("guarded by is_current() above");
        *generation = next_generation(*generation);

        self.len = self
            .len
            .checked_sub(1)
            .expect("we just removed an item so the count must be non-zero");

        // The pool is consistent again before foreign code runs.
        D::teardown(&mut value);

        Some(value)
    }

    /// Deallocates every item in the pool, keeping the capacity.
    ///
    /// All outstanding handles become stale. After clearing, slots are reused in ascending
    /// index order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new();
    /// let a = pool.allocate(1);
    /// let b = pool.allocate(2);
    ///
    /// pool.clear();
    ///
    /// assert!(pool.is_empty());
    /// assert!(!pool.contains(a));
    /// assert!(!pool.contains(b));
    /// ```
    pub fn clear(&mut self) {
        let handles: Vec<_> = self.iter().map(|(handle, _)| handle).collect();

        // Freeing in descending order leaves the lowest index on top of the free list.
        for handle in handles.into_iter().rev() {
            self.deallocate(handle);
        }
    }

    /// Makes sure at least `additional` more items can be allocated without the pool growing.
    ///
    /// If the pool needs to grow for this, it grows by the configured growth factor as many
    /// times as needed, so capacity follows the same progression as organic growth would.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::builder().initial_capacity(4).build();
    ///
    /// pool.reserve(10);
    ///
    /// // 4 -> 8 -> 16
    /// assert_eq!(pool.capacity(), 16);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool would need more than [`MAX_CAPACITY`] slots.
    #[cfg_attr(test, mutants::skip)] // Can be mutated into a growth loop that never ends.
    pub fn reserve(&mut self, additional: usize) {
        let vacant = self.free_list.len();

        let Some(missing) = additional.checked_sub(vacant).filter(|missing| *missing > 0) else {
            return;
        };

        let required_capacity = self
            .capacity()
            .checked_add(missing)
            .filter(|required| *required <= MAX_CAPACITY)
            .unwrap_or_else(|| {
                panic!(
                    "cannot reserve {additional} more slots in pool of {}: exceeds maximum capacity of {MAX_CAPACITY}",
                    type_name::<T>()
                )
            });

        let mut new_capacity = self.capacity();
        while new_capacity < required_capacity {
            new_capacity = self.grown_capacity(new_capacity);
        }

        self.grow_to(new_capacity);
    }

    /// Iterates over the items in the pool, in slot index order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new();
    /// let a = pool.allocate(1);
    /// let b = pool.allocate(2);
    ///
    /// let items: Vec<_> = pool.iter().collect();
    /// assert_eq!(items, vec![(a, &1), (b, &2)]);
    /// ```
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.blocks.iter().flat_map(move |block| {
            block
                .iter()
                .map(move |(index, value)| (Handle::new(index, self.generation_at(index)), value))
        })
    }

    fn is_current(&self, handle: Handle<T>) -> bool {
        handle.is_valid() && self.generations.get(handle.slot()) == Some(&handle.generation())
    }

    fn generation_at(&self, index: u32) -> u32 {
        *self
            .generations
            .get(index as usize)
            .expect("callers only ask for indexes below capacity")
    }

    /// Index of the slot the next allocation will use, growing the pool if there is none.
    fn next_free_index(&mut self) -> u32 {
        if self.free_list.is_empty() {
            let new_capacity = self.grown_capacity(self.capacity());
            self.grow_to(new_capacity);
        }

        *self
            .free_list
            .top()
            .expect("growth always adds at least one vacant slot")
    }

    /// Maps a pool-wide slot index to the block holding it and the offset within that block.
    fn locate(&self, index: u32) -> Option<(&Block<T>, usize)> {
        let block_index = self.block_index_of(index)?;
        let block = self.blocks.get(block_index)?;

        Some((block, offset_in_block(block, index)))
    }

    fn locate_mut(&mut self, index: u32) -> Option<(&mut Block<T>, usize)> {
        let block_index = self.block_index_of(index)?;
        let block = self.blocks.get_mut(block_index)?;
        let offset = offset_in_block(block, index);

        Some((block, offset))
    }

    fn block_index_of(&self, index: u32) -> Option<usize> {
        if index as usize >= self.capacity() {
            return None;
        }

        // Blocks are sorted by first index and there are only a few dozen of them at most,
        // as each one is a multiple of the size of all the previous ones combined.
        self.blocks
            .partition_point(|block| block.first_index() <= index)
            .checked_sub(1)
    }

    /// The capacity the pool grows to from `capacity` when it runs out of slots.
    fn grown_capacity(&self, capacity: usize) -> usize {
        assert!(
            capacity < MAX_CAPACITY,
            "pool of {} cannot grow beyond its maximum capacity of {MAX_CAPACITY}",
            type_name::<T>()
        );

        capacity
            .max(1)
            .checked_mul(self.growth_factor)
            .map_or(MAX_CAPACITY, |grown| grown.min(MAX_CAPACITY))
    }

    /// Appends storage for the slots `capacity..new_capacity` and marks them vacant.
    fn grow_to(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity();

        let added = new_capacity
            .checked_sub(old_capacity)
            .filter(|added| *added > 0)
            .expect("growth must add at least one slot");

        let first_index =
            u32::try_from(old_capacity).expect("guarded by capacity <= MAX_CAPACITY");

        self.blocks.push(Block::new(first_index, added));
        self.generations.resize(new_capacity, 0);
        self.free_list.resize(new_capacity);

        // Pushed in descending order so the lowest new index is popped first.
        for index in (old_capacity..new_capacity).rev() {
            let index = u32::try_from(index).expect("guarded by capacity <= MAX_CAPACITY");

            self.free_list
                .push(index)
                .expect("we just resized the free list to fit every slot");
        }

        tracing::debug!(
            item_type = type_name::<T>(),
            old_capacity,
            new_capacity,
            "slot pool grew"
        );
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let capacity = self.capacity();

        assert_eq!(
            self.free_list.max_len(),
            capacity,
            "free list sized for {} slots but pool has {capacity}",
            self.free_list.max_len()
        );

        let mut expected_first_index = 0_usize;
        for block in &self.blocks {
            assert_eq!(
                block.first_index() as usize,
                expected_first_index,
                "blocks do not cover the index range contiguously"
            );
            expected_first_index = expected_first_index.checked_add(block.len()).unwrap();
        }
        assert_eq!(expected_first_index, capacity, "blocks do not cover capacity");

        let mut is_free = vec![false; capacity];
        let mut stack = self.free_list.clone();
        while let Some(index) = stack.pop() {
            let slot = is_free
                .get_mut(index as usize)
                .expect("free list holds an index beyond capacity");
            assert!(!*slot, "index {index} is on the free list twice");
            *slot = true;
        }

        let mut occupied = 0_usize;
        for (index, free) in is_free.iter().enumerate() {
            let index = u32::try_from(index).unwrap();
            let (block, offset) = self.locate(index).unwrap();

            if *free {
                assert!(
                    !block.is_occupied(offset),
                    "index {index} is on the free list but occupied"
                );
            } else {
                assert!(
                    block.is_occupied(offset),
                    "index {index} is neither on the free list nor occupied"
                );
                assert_ne!(
                    self.generation_at(index),
                    0,
                    "occupied index {index} has generation zero"
                );
                occupied = occupied.checked_add(1).unwrap();
            }
        }

        assert_eq!(occupied, self.len, "len does not match occupied slot count");
    }
}

impl<T: Default, D: Teardown<T>> SlotPool<T, D> {
    /// Inserts `T::default()` into the pool and returns its handle.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::new();
    ///
    /// let handle = pool.allocate_default();
    /// assert_eq!(pool.get(handle).map(String::as_str), Some(""));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool needs to grow but already has [`MAX_CAPACITY`] slots.
    #[must_use]
    pub fn allocate_default(&mut self) -> Handle<T> {
        self.allocate_with(T::default)
    }
}

impl<T, D: Teardown<T>> Default for SlotPool<T, D> {
    /// Creates a new [`SlotPool`] with the default configuration.
    fn default() -> Self {
        SlotPoolBuilder::<T, D>::new_inner().build()
    }
}

impl<T, D: Teardown<T>> fmt::Debug for SlotPool<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("teardown", &format_args!("{}", type_name::<D>()))
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("blocks", &self.blocks.len())
            .field("growth_factor", &self.growth_factor)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T, D: Teardown<T>> Drop for SlotPool<T, D> {
    fn drop(&mut self) {
        let was_empty = self.is_empty();

        for block in &mut self.blocks {
            for (_, value) in block.iter_mut() {
                D::teardown(value);
            }
        }

        // The items themselves are dropped together with the blocks, after this returns.

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty pool of {} with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}

/// Generations only move forward and skip zero, which is reserved for handles that were never
/// issued. After 2^32 steps a generation repeats, at which point a handle that is stale by
/// that many cycles would match again. We accept this.
fn next_generation(generation: u32) -> u32 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

fn offset_in_block<T>(block: &Block<T>, index: u32) -> usize {
    index
        .checked_sub(block.first_index())
        .expect("block lookup only returns blocks starting at or before the index") as usize
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::ptr;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{CallDispose, Dispose};

    assert_impl_all!(SlotPool<u32>: Send, Sync, fmt::Debug, Default);
    assert_impl_all!(SlotPool<Sendable, CallDispose>: Send, Sync);
    assert_not_impl_any!(SlotPool<Rc<u32>>: Send, Sync);
    assert_not_impl_any!(SlotPool<u32>: Clone);

    /// A disposable item that can move between threads.
    struct Sendable {
        disposed: Arc<AtomicUsize>,
    }

    impl Dispose for Sendable {
        fn dispose(&mut self) {
            self.disposed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn pool_with_capacity<T>(capacity: usize) -> SlotPool<T> {
        SlotPool::builder().initial_capacity(capacity).build()
    }

    #[test]
    fn smoke_test() {
        let mut pool = SlotPool::<u32>::new();

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());

        let a = pool.allocate(42);
        let b = pool.allocate(43);
        let c = pool.allocate(44);

        assert_eq!(pool.len(), 3);
        assert!(!pool.is_empty());

        assert_eq!(pool.get(a), Some(&42));
        assert_eq!(pool.get(b), Some(&43));
        assert_eq!(pool.get(c), Some(&44));

        pool.deallocate(b);

        let d = pool.allocate(45);

        assert_eq!(pool.get(a), Some(&42));
        assert_eq!(pool.get(b), None);
        assert_eq!(pool.get(c), Some(&44));
        assert_eq!(pool.get(d), Some(&45));

        pool.integrity_check();
    }

    #[test]
    fn fresh_slots_are_handed_out_in_ascending_order() {
        let mut pool = pool_with_capacity::<u32>(4);

        let handles: Vec<_> = (0..4).map(|value| pool.allocate(value)).collect();

        for (expected_index, handle) in handles.iter().enumerate() {
            assert_eq!(handle.index() as usize, expected_index);
            assert_eq!(handle.generation(), 1);
        }
    }

    #[test]
    fn freed_slot_reused_with_new_generation() {
        let mut pool = pool_with_capacity::<char>(4);

        let handles: Vec<_> = ['A', 'B', 'C', 'D']
            .into_iter()
            .map(|value| pool.allocate(value))
            .collect();

        pool.deallocate(handles[1]);
        assert_eq!(pool.generation_at(1), 2);

        let e = pool.allocate('E');

        assert_eq!(e.index(), 1);
        // Deallocation and reallocation each advance the generation.
        assert_eq!(e.generation(), 3);
        assert_eq!(pool.get(handles[1]), None);
        assert_eq!(pool.get(e), Some(&'E'));
        assert_eq!(pool.capacity(), 4);

        pool.integrity_check();
    }

    #[test]
    fn reuse_is_last_in_first_out() {
        let mut pool = pool_with_capacity::<u32>(8);

        let handles: Vec<_> = (0..8).map(|value| pool.allocate(value)).collect();

        pool.deallocate(handles[2]);
        pool.deallocate(handles[6]);
        pool.deallocate(handles[4]);

        assert_eq!(pool.allocate(100).index(), 4);
        assert_eq!(pool.allocate(101).index(), 6);
        assert_eq!(pool.allocate(102).index(), 2);

        pool.integrity_check();
    }

    #[test]
    fn growth_multiplies_capacity_and_preserves_items() {
        let mut pool = pool_with_capacity::<u32>(4);

        let handles: Vec<_> = (0..4).map(|value| pool.allocate(value)).collect();
        assert_eq!(pool.capacity(), 4);

        let extra = pool.allocate(99);

        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.size(), 8);
        assert_eq!(extra.index(), 4);

        for (value, handle) in (0..4).zip(&handles) {
            assert_eq!(pool.get(*handle), Some(&value));
        }
        assert_eq!(pool.get(extra), Some(&99));

        pool.integrity_check();
    }

    #[test]
    fn custom_growth_factor() {
        let mut pool = SlotPool::<u32>::builder()
            .initial_capacity(2)
            .growth_factor(3)
            .build();

        for value in 0..3 {
            _ = pool.allocate(value);
        }

        assert_eq!(pool.capacity(), 6);
    }

    #[test]
    fn zero_initial_capacity_grows_on_first_allocation() {
        let mut pool = pool_with_capacity::<u32>(0);
        assert_eq!(pool.capacity(), 0);

        let handle = pool.allocate(7);

        assert_eq!(pool.capacity(), DEFAULT_GROWTH_FACTOR);
        assert_eq!(handle.index(), 0);
        assert_eq!(pool.get(handle), Some(&7));

        pool.integrity_check();
    }

    #[test]
    fn items_do_not_move_when_pool_grows() {
        let mut pool = pool_with_capacity::<String>(2);

        let first = pool.allocate("first".to_string());
        let address_before: *const String = pool.get(first).unwrap();

        for _ in 0..100 {
            _ = pool.allocate("filler".to_string());
        }
        assert!(pool.capacity() >= 100);

        let address_after: *const String = pool.get(first).unwrap();
        assert!(ptr::eq(address_before, address_after));
    }

    #[test]
    fn free_then_allocate_same_count_does_not_grow() {
        let mut pool = pool_with_capacity::<u32>(16);

        let handles: Vec<_> = (0..16).map(|value| pool.allocate(value)).collect();
        for handle in &handles {
            pool.deallocate(*handle);
        }

        let handles: Vec<_> = (0..16).map(|value| pool.allocate(value)).collect();

        assert_eq!(pool.capacity(), 16);
        assert_eq!(pool.len(), 16);

        // Freed in ascending order, so reused in descending order.
        assert_eq!(handles[0].index(), 15);
        assert_eq!(handles[15].index(), 0);

        pool.integrity_check();
    }

    #[test]
    fn deallocate_is_idempotent() {
        let mut pool = SlotPool::<u32>::new();

        let a = pool.allocate(1);
        let b = pool.allocate(2);

        pool.deallocate(a);
        pool.deallocate(a);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(b), Some(&2));

        // A stale handle must not free the slot's new occupant.
        let c = pool.allocate(3);
        assert_eq!(c.index(), a.index());
        pool.deallocate(a);
        assert_eq!(pool.get(c), Some(&3));

        pool.integrity_check();
    }

    #[test]
    fn default_handle_never_resolves() {
        let mut pool = pool_with_capacity::<u32>(2);

        assert_eq!(pool.get(Handle::default()), None);

        let a = pool.allocate(1);
        let b = pool.allocate(2);

        assert_eq!(pool.get(Handle::default()), None);
        assert_eq!(pool.get_mut(Handle::default()), None);
        assert_eq!(pool.remove(Handle::default()), None);
        pool.deallocate(Handle::default());

        assert_eq!(pool.get(a), Some(&1));
        assert_eq!(pool.get(b), Some(&2));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn out_of_range_handle_is_stale() {
        let mut pool = pool_with_capacity::<u32>(2);
        _ = pool.allocate(1);

        let forged = Handle::<u32>::new(1234, 1);

        assert_eq!(pool.get(forged), None);
        assert_eq!(pool.get_mut(forged), None);
        assert!(!pool.contains(forged));
        pool.deallocate(forged);

        let at_limit = Handle::<u32>::new(u32::MAX, u32::MAX);
        assert_eq!(pool.get(at_limit), None);

        assert_eq!(pool.len(), 1);
        pool.integrity_check();
    }

    #[test]
    fn vacant_slot_with_guessed_generation_is_stale() {
        let mut pool = pool_with_capacity::<u32>(4);
        let a = pool.allocate(1);
        pool.deallocate(a);

        // Slot 0 now has generation 2 but is vacant.
        assert_eq!(pool.get(Handle::new(0, 2)), None);

        // Slot 1 was never used, generation 0.
        assert_eq!(pool.get(Handle::new(1, 0)), None);

        assert_eq!(pool.remove(Handle::new(0, 2)), None);
        pool.deallocate(Handle::new(0, 2));
        assert_eq!(pool.generation_at(0), 2);

        pool.integrity_check();
    }

    #[test]
    fn get_mut_modifies_in_place() {
        let mut pool = SlotPool::<String>::new();
        let handle = pool.allocate("Hello".to_string());

        pool.get_mut(handle).unwrap().push_str(", World!");

        assert_eq!(pool.get(handle).unwrap(), "Hello, World!");
    }

    #[test]
    fn remove_returns_item() {
        let mut pool = SlotPool::<String>::new();
        let handle = pool.allocate("owned".to_string());

        assert_eq!(pool.remove(handle), Some("owned".to_string()));
        assert_eq!(pool.remove(handle), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn allocate_with_handle_sees_final_handle() {
        struct Node {
            me: Handle<Node>,
        }

        let mut pool = SlotPool::<Node>::builder().initial_capacity(1).build();

        let first = pool.allocate_with_handle(|me| Node { me });
        let second = pool.allocate_with_handle(|me| Node { me });

        assert_eq!(pool.get(first).map(|node| node.me), Some(first));
        assert_eq!(pool.get(second).map(|node| node.me), Some(second));

        pool.deallocate(first);
        let third = pool.allocate_with_handle(|me| Node { me });

        assert_eq!(pool.get(third).map(|node| node.me), Some(third));
        assert_eq!(third.index(), first.index());
        assert_eq!(third.generation(), 3);
    }

    #[test]
    fn panicking_constructor_leaves_pool_consistent() {
        let mut pool = pool_with_capacity::<u32>(1);
        let a = pool.allocate(1);

        let result = catch_unwind(AssertUnwindSafe(|| {
            _ = pool.allocate_with(|| panic!("constructor failed"));
        }));
        assert!(result.is_err());

        // Growth happened, but the slot it would have used is still vacant.
        assert_eq!(pool.len(), 1);
        pool.integrity_check();

        let b = pool.allocate(2);
        assert_eq!(b.index(), 1);
        assert_eq!(b.generation(), 1);
        assert_eq!(pool.get(a), Some(&1));
    }

    #[test]
    fn allocate_default_uses_default() {
        let mut pool = SlotPool::<Vec<u8>>::new();

        let handle = pool.allocate_default();

        assert_eq!(pool.get(handle), Some(&Vec::new()));
    }

    #[test]
    fn iter_visits_items_in_index_order() {
        let mut pool = pool_with_capacity::<u32>(2);

        let a = pool.allocate(10);
        let b = pool.allocate(11);
        let c = pool.allocate(12); // Lands in the second block.
        pool.deallocate(b);

        let items: Vec<_> = pool.iter().collect();

        assert_eq!(items, vec![(a, &10), (c, &12)]);
    }

    #[test]
    fn clear_empties_pool_and_keeps_capacity() {
        let mut pool = pool_with_capacity::<u32>(4);

        let handles: Vec<_> = (0..6).map(|value| pool.allocate(value)).collect();
        let capacity = pool.capacity();

        pool.clear();

        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), capacity);
        assert!(handles.iter().all(|handle| !pool.contains(*handle)));

        assert_eq!(pool.allocate(100).index(), 0);
        assert_eq!(pool.allocate(101).index(), 1);

        pool.integrity_check();
    }

    #[test]
    fn reserve_follows_growth_progression() {
        let mut pool = pool_with_capacity::<u32>(4);

        pool.reserve(3);
        assert_eq!(pool.capacity(), 4);

        pool.reserve(5);
        assert_eq!(pool.capacity(), 8);

        let handles: Vec<_> = (0..8).map(|value| pool.allocate(value)).collect();
        assert_eq!(pool.capacity(), 8);

        pool.reserve(17);
        assert_eq!(pool.capacity(), 32);

        // Reserved slots are handed out in ascending order.
        assert_eq!(pool.allocate(8).index(), 8);
        assert_eq!(pool.get(handles[7]), Some(&7));

        pool.integrity_check();
    }

    #[test]
    fn reserve_zero_is_noop() {
        let mut pool = pool_with_capacity::<u32>(0);

        pool.reserve(0);

        assert_eq!(pool.capacity(), 0);
    }

    #[test]
    fn generation_skips_zero_on_wrap() {
        assert_eq!(next_generation(0), 1);
        assert_eq!(next_generation(1), 2);
        assert_eq!(next_generation(u32::MAX), 1);
    }

    #[test]
    fn grown_capacity_is_clamped_to_maximum() {
        let pool = SlotPool::<u32>::builder()
            .initial_capacity(0)
            .growth_factor(usize::MAX)
            .build();

        assert_eq!(pool.grown_capacity(0), MAX_CAPACITY);
        assert_eq!(pool.grown_capacity(MAX_CAPACITY - 1), MAX_CAPACITY);
    }

    #[test]
    #[should_panic]
    fn grown_capacity_at_maximum_panics() {
        let pool = pool_with_capacity::<u32>(0);

        _ = pool.grown_capacity(MAX_CAPACITY);
    }

    #[test]
    fn many_cycles_stay_consistent() {
        let mut pool = pool_with_capacity::<usize>(3);
        let mut live = Vec::new();

        for round in 0..200_usize {
            if round % 3 == 2 {
                let handle = live.swap_remove(round % live.len());
                pool.deallocate(handle);
            } else {
                live.push(pool.allocate(round));
            }
        }

        pool.integrity_check();
        assert_eq!(pool.len(), live.len());
    }

    #[derive(Default)]
    struct Tracked {
        disposed: Rc<Cell<u32>>,
        dropped: Rc<Cell<u32>>,
        events: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Dispose for Tracked {
        fn dispose(&mut self) {
            self.disposed.set(self.disposed.get() + 1);
            self.events.borrow_mut().push("dispose");
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.set(self.dropped.get() + 1);
            self.events.borrow_mut().push("drop");
        }
    }

    impl Tracked {
        fn sharing_counters(&self) -> Self {
            Self {
                disposed: Rc::clone(&self.disposed),
                dropped: Rc::clone(&self.dropped),
                events: Rc::clone(&self.events),
            }
        }
    }

    #[test]
    fn dispose_runs_before_drop_on_deallocate() {
        let probe = Tracked::default();
        let mut pool = SlotPool::<Tracked>::builder().dispose_on_free().build();

        let handle = pool.allocate(probe.sharing_counters());
        pool.deallocate(handle);
        pool.deallocate(handle);

        assert_eq!(probe.disposed.get(), 1);
        assert_eq!(probe.dropped.get(), 1);
        assert_eq!(*probe.events.borrow(), vec!["dispose", "drop"]);
    }

    #[test]
    fn dispose_runs_on_remove_clear_and_drop() {
        let probe = Tracked::default();
        let mut pool = SlotPool::<Tracked>::builder().dispose_on_free().build();

        let removed = pool.allocate(probe.sharing_counters());
        let removed = pool.remove(removed).unwrap();
        assert_eq!(probe.disposed.get(), 1);
        drop(removed);

        _ = pool.allocate(probe.sharing_counters());
        pool.clear();
        assert_eq!(probe.disposed.get(), 2);

        _ = pool.allocate(probe.sharing_counters());
        _ = pool.allocate(probe.sharing_counters());
        drop(pool);

        assert_eq!(probe.disposed.get(), 4);
        assert_eq!(probe.dropped.get(), 4);
    }

    #[test]
    fn drop_only_pool_does_not_dispose() {
        let probe = Tracked::default();
        let mut pool = SlotPool::<Tracked>::new();

        let handle = pool.allocate(probe.sharing_counters());
        pool.deallocate(handle);
        _ = pool.allocate(probe.sharing_counters());
        drop(pool);

        assert_eq!(probe.disposed.get(), 0);
        assert_eq!(probe.dropped.get(), 2);
    }

    #[test]
    fn vacant_slots_are_never_disposed() {
        let probe = Tracked::default();
        let mut pool = SlotPool::<Tracked>::builder()
            .initial_capacity(8)
            .dispose_on_free()
            .build();

        _ = pool.allocate(probe.sharing_counters());
        drop(pool);

        assert_eq!(probe.disposed.get(), 1);
    }

    #[test]
    #[should_panic]
    fn drop_item_with_forbidden_to_drop_policy_panics() {
        let mut pool = SlotPool::<u32>::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        _ = pool.allocate(123);
    }

    #[test]
    fn drop_emptied_pool_with_forbidden_to_drop_policy_ok() {
        let mut pool = SlotPool::<u32>::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        let handle = pool.allocate(123);
        pool.deallocate(handle);

        drop(pool);
    }

    #[test]
    fn in_refcell_works_fine() {
        let pool = RefCell::new(SlotPool::<u32>::new());

        let a = pool.borrow_mut().allocate(42);
        let b = pool.borrow_mut().allocate(43);

        pool.borrow_mut().deallocate(b);

        let pool = pool.borrow();
        assert_eq!(pool.get(a), Some(&42));
        assert_eq!(pool.get(b), None);
    }

    #[test]
    fn multithreaded_via_mutex() {
        let pool = Arc::new(Mutex::new(pool_with_capacity::<u32>(2)));

        let a = pool.lock().unwrap().allocate(42);
        let b = pool.lock().unwrap().allocate(43);

        let pool_clone = Arc::clone(&pool);
        thread::spawn(move || {
            let mut pool = pool_clone.lock().unwrap();

            pool.deallocate(b);
            _ = pool.allocate(44);
            _ = pool.allocate(45);
        })
        .join()
        .unwrap();

        let pool = pool.lock().unwrap();
        assert_eq!(pool.get(a), Some(&42));
        assert_eq!(pool.get(b), None);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.capacity(), 4);
    }

    #[test]
    fn dispose_pool_moves_between_threads() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut pool = SlotPool::<Sendable>::builder().dispose_on_free().build();

        let first = pool.allocate(Sendable {
            disposed: Arc::clone(&disposed),
        });
        _ = pool.allocate(Sendable {
            disposed: Arc::clone(&disposed),
        });

        thread::spawn(move || {
            pool.deallocate(first);
            assert_eq!(pool.len(), 1);
        })
        .join()
        .unwrap();

        // One item was deallocated, the other was disposed when the pool was dropped.
        assert_eq!(disposed.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn debug_output_describes_pool() {
        let mut pool = pool_with_capacity::<u32>(4);
        _ = pool.allocate(1);

        let output = format!("{pool:?}");

        assert!(output.contains("SlotPool"));
        assert!(output.contains("u32"));
        assert!(output.contains("len: 1"));
        assert!(output.contains("capacity: 4"));
    }

    #[test]
    fn default_matches_new() {
        let pool = SlotPool::<u32>::default();

        assert_eq!(pool.capacity(), DEFAULT_INITIAL_CAPACITY);
        assert!(pool.is_empty());
    }
}
