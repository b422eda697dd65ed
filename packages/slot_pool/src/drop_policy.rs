/// Determines item dropping behavior when the pool is dropped.
///
/// By default, the pool will tear down and drop its remaining items when it is dropped.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = SlotPool::<u32>::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool will drop its items when the pool is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if it still contains items when it is dropped.
    ///
    /// This may be valuable if every item is expected to be deallocated explicitly, for example
    /// because other systems hold handles to the items and leaving items behind would indicate
    /// a leak in the owning subsystem.
    MustNotDropItems,
}
