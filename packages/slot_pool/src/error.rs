use thiserror::Error;

/// Errors that can occur when configuring a [`SlotPool`][crate::SlotPool].
///
/// Operations on a built pool do not fail with errors: a handle that no longer refers to an
/// item is reported through `Option` (or silently ignored, for deallocation).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool must grow by an integer factor of at least 2 when it runs out of slots.
    #[error("invalid growth factor {growth_factor}: the pool must grow by a factor of at least 2")]
    InvalidGrowthFactor {
        /// The growth factor that was requested.
        growth_factor: usize,
    },

    /// Slot indexes are 32-bit, which limits how many slots a pool can have.
    #[error("initial capacity of {requested} slots exceeds the maximum pool capacity of {max}")]
    InitialCapacityTooLarge {
        /// The initial capacity that was requested.
        requested: usize,

        /// The maximum number of slots a pool can have.
        max: usize,
    },
}

/// A specialized `Result` type for pool configuration, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
