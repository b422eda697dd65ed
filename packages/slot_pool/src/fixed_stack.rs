/// A last-in-first-out stack with a fixed maximum length.
///
/// The storage for all items is reserved when the stack is created (or resized) and is never
/// reallocated by `push()`, so pushing and popping never touch the memory allocator. Pushing
/// onto a full stack fails instead of growing.
///
/// [`SlotPool`][crate::SlotPool] uses this as its list of free slot indexes, resizing it in
/// lockstep with the pool capacity.
///
/// # Example
///
/// ```rust
/// use slot_pool::FixedStack;
///
/// let mut stack = FixedStack::with_capacity(2);
///
/// assert!(stack.push(1).is_ok());
/// assert!(stack.push(2).is_ok());
///
/// // The stack is full, the rejected item is handed back.
/// assert_eq!(stack.push(3), Err(3));
///
/// assert_eq!(stack.top(), Some(&2));
/// assert_eq!(stack.pop(), Some(2));
/// assert_eq!(stack.pop(), Some(1));
/// assert_eq!(stack.pop(), None);
/// ```
#[derive(Clone, Debug)]
pub struct FixedStack<T> {
    items: Vec<T>,

    /// We track this separately from the `Vec` capacity because the allocator
    /// is allowed to give us more than we asked for.
    max_len: usize,
}

impl<T> FixedStack<T> {
    /// Creates an empty stack that can hold up to `max_len` items.
    #[must_use]
    pub fn with_capacity(max_len: usize) -> Self {
        Self {
            items: Vec::with_capacity(max_len),
            max_len,
        }
    }

    /// The number of items on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the stack holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the stack holds `max_len()` items and will reject the next push.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_len
    }

    /// The maximum number of items the stack can hold.
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Pushes an item onto the top of the stack.
    ///
    /// # Errors
    ///
    /// Returns the item back to the caller if the stack is already full.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }

        self.items.push(item);
        Ok(())
    }

    /// Removes the item on the top of the stack and returns it, or `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// The item on the top of the stack, without removing it.
    #[must_use]
    pub fn top(&self) -> Option<&T> {
        self.items.last()
    }

    /// Raises the maximum length of the stack to `new_max_len`, reserving storage for it.
    ///
    /// Existing items are preserved.
    ///
    /// # Panics
    ///
    /// Panics if `new_max_len` is less than the current maximum length. The stack never shrinks.
    pub fn resize(&mut self, new_max_len: usize) {
        assert!(
            new_max_len >= self.max_len,
            "cannot shrink a FixedStack from {} to {new_max_len} items",
            self.max_len
        );

        let additional = new_max_len
            .checked_sub(self.items.len())
            .expect("guarded by the assertion above and len <= max_len");

        self.items.reserve_exact(additional);
        self.max_len = new_max_len;
    }
}
