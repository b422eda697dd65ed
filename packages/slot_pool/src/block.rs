use std::any::type_name;
use std::iter;

/// One page of slot storage in a `SlotPool`.
///
/// A block is allocated once, with a fixed number of slots, and is never resized or moved for
/// as long as the pool lives. The pool grows by appending new blocks, so the address of an item
/// never changes between allocation and deallocation, no matter how much the pool grows.
///
/// Slots are addressed by their offset within the block. The block knows the pool-wide index of
/// its first slot, so the pool can map between pool-wide indexes and block offsets.
#[derive(Debug)]
pub(crate) struct Block<T> {
    /// Pool-wide index of the slot at offset 0.
    first_index: u32,

    slots: Box<[Option<T>]>,
}

impl<T> Block<T> {
    #[must_use]
    pub(crate) fn new(first_index: u32, len: usize) -> Self {
        assert!(len > 0, "a Block must have at least one slot");

        Self {
            first_index,
            slots: iter::repeat_with(|| None).take(len).collect(),
        }
    }

    #[must_use]
    pub(crate) fn first_index(&self) -> u32 {
        self.first_index
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// The item at the offset, or `None` if the slot is vacant or out of bounds.
    #[must_use]
    pub(crate) fn get(&self, offset: usize) -> Option<&T> {
        self.slots.get(offset).and_then(Option::as_ref)
    }

    #[must_use]
    pub(crate) fn get_mut(&mut self, offset: usize) -> Option<&mut T> {
        self.slots.get_mut(offset).and_then(Option::as_mut)
    }

    /// # Panics
    ///
    /// Panics if the offset is out of bounds or the slot is already occupied.
    pub(crate) fn insert(&mut self, offset: usize, value: T) -> &mut T {
        let slot = self.slots.get_mut(offset).unwrap_or_else(|| {
            panic!(
                "offset {offset} out of bounds in block of {}",
                type_name::<T>()
            )
        });

        assert!(
            slot.is_none(),
            "offset {offset} was occupied when inserting into block of {}",
            type_name::<T>()
        );

        slot.insert(value)
    }

    /// Takes the item out of the slot, leaving the slot vacant.
    #[must_use]
    pub(crate) fn take(&mut self, offset: usize) -> Option<T> {
        self.slots.get_mut(offset).and_then(Option::take)
    }

    /// Iterates over the occupied slots as `(pool-wide index, item)` pairs.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        let first_index = self.first_index;

        self.slots.iter().enumerate().filter_map(move |(offset, slot)| {
            slot.as_ref()
                .map(|value| (pool_index(first_index, offset), value))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        let first_index = self.first_index;

        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(move |(offset, slot)| {
                slot.as_mut()
                    .map(|value| (pool_index(first_index, offset), value))
            })
    }

    #[cfg(test)]
    pub(crate) fn is_occupied(&self, offset: usize) -> bool {
        self.get(offset).is_some()
    }
}

fn pool_index(first_index: u32, offset: usize) -> u32 {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| first_index.checked_add(offset))
        .expect("the pool never creates blocks that extend past the u32 index range")
}
