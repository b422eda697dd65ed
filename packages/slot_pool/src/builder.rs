use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{
    CallDispose, DEFAULT_GROWTH_FACTOR, DEFAULT_INITIAL_CAPACITY, Dispose, DropOnly, DropPolicy,
    Error, MAX_CAPACITY, Result, SlotPool, Teardown,
};

/// Builder for creating an instance of [`SlotPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`SlotPool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<u32>::builder()
///     .initial_capacity(1024)
///     .growth_factor(4)
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
///
/// [1]: SlotPool::new
#[must_use]
pub struct SlotPoolBuilder<T, D = DropOnly> {
    initial_capacity: usize,
    growth_factor: usize,
    drop_policy: DropPolicy,

    _types: PhantomData<fn() -> (T, D)>,
}

impl<T, D> fmt::Debug for SlotPoolBuilder<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("teardown", &format_args!("{}", type_name::<D>()))
            .field("initial_capacity", &self.initial_capacity)
            .field("growth_factor", &self.growth_factor)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> SlotPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self::new_inner()
    }
}

impl<T, D> SlotPoolBuilder<T, D> {
    pub(crate) fn new_inner() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            drop_policy: DropPolicy::default(),
            _types: PhantomData,
        }
    }

    /// Sets the number of slots the pool preallocates.
    ///
    /// Defaults to [`DEFAULT_INITIAL_CAPACITY`]. Zero is allowed, in which case the pool
    /// allocates storage on first use.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder().initial_capacity(10).build();
    ///
    /// assert_eq!(pool.capacity(), 10);
    /// ```
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the factor by which the pool multiplies its capacity when it runs out of slots.
    ///
    /// Defaults to [`DEFAULT_GROWTH_FACTOR`]. Must be at least 2.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::builder()
    ///     .initial_capacity(2)
    ///     .growth_factor(4)
    ///     .build();
    ///
    /// let handles: Vec<_> = (0..3).map(|value| pool.allocate(value)).collect();
    ///
    /// assert_eq!(pool.capacity(), 8);
    /// ```
    pub fn growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat remaining items in the pool when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{DropPolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Makes the pool call [`Dispose::dispose()`] on every item right before the item is
    /// dropped, whether due to deallocation, removal, clearing or the pool itself being dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{Dispose, SlotPool};
    ///
    /// struct Buffer;
    ///
    /// impl Dispose for Buffer {
    ///     fn dispose(&mut self) {
    ///         // Release the GPU memory here.
    ///     }
    /// }
    ///
    /// let pool = SlotPool::<Buffer>::builder().dispose_on_free().build();
    /// ```
    pub fn dispose_on_free(self) -> SlotPoolBuilder<T, CallDispose>
    where
        T: Dispose,
    {
        SlotPoolBuilder {
            initial_capacity: self.initial_capacity,
            growth_factor: self.growth_factor,
            drop_policy: self.drop_policy,
            _types: PhantomData,
        }
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the growth factor is less than 2 or the initial capacity exceeds
    /// [`MAX_CAPACITY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{Error, SlotPool};
    ///
    /// let result = SlotPool::<u32>::builder().growth_factor(1).try_build();
    ///
    /// assert!(matches!(
    ///     result,
    ///     Err(Error::InvalidGrowthFactor { growth_factor: 1 })
    /// ));
    /// ```
    pub fn try_build(self) -> Result<SlotPool<T, D>>
    where
        D: Teardown<T>,
    {
        if self.growth_factor < 2 {
            return Err(Error::InvalidGrowthFactor {
                growth_factor: self.growth_factor,
            });
        }

        if self.initial_capacity > MAX_CAPACITY {
            return Err(Error::InitialCapacityTooLarge {
                requested: self.initial_capacity,
                max: MAX_CAPACITY,
            });
        }

        Ok(SlotPool::new_inner(
            self.initial_capacity,
            self.growth_factor,
            self.drop_policy,
        ))
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. See [`try_build()`][Self::try_build] for the
    /// conditions.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder().build();
    /// ```
    #[must_use]
    pub fn build(self) -> SlotPool<T, D>
    where
        D: Teardown<T>,
    {
        match self.try_build() {
            Ok(pool) => pool,
            Err(error) => panic!("invalid slot pool configuration: {error}"),
        }
    }
}
