/// Explicit teardown for items that hold resources their `Drop` implementation cannot release.
///
/// A typical example is an item that wraps a handle to a resource owned by another system
/// (a GPU texture, a file in a virtual file system, a registration in some registry), which can
/// only be released while that system is still around.
///
/// Implementing this trait does nothing by itself. The pool only calls [`dispose()`][1] when it
/// is built with [`SlotPoolBuilder::dispose_on_free()`][2], in which case it is called exactly
/// once for every item, right before the item is dropped:
///
/// * when the item is deallocated or removed from the pool;
/// * when the pool is cleared;
/// * when the pool is dropped while still holding the item.
///
/// # Example
///
/// ```rust
/// use slot_pool::{Dispose, SlotPool};
///
/// struct Texture {
///     gpu_id: u32,
/// }
///
/// impl Dispose for Texture {
///     fn dispose(&mut self) {
///         println!("releasing GPU texture {}", self.gpu_id);
///     }
/// }
///
/// let mut pool = SlotPool::<Texture>::builder().dispose_on_free().build();
///
/// let texture = pool.allocate(Texture { gpu_id: 7 });
/// pool.deallocate(texture); // Prints "releasing GPU texture 7".
/// ```
///
/// [1]: Dispose::dispose
/// [2]: crate::SlotPoolBuilder::dispose_on_free
pub trait Dispose {
    /// Releases the resources held by the item. The item is dropped right after this returns.
    fn dispose(&mut self);
}

/// Decides what the pool does with an item right before the item is dropped.
///
/// This is selected at compile time via the second type parameter of
/// [`SlotPool`][crate::SlotPool]. You will not normally name it yourself: [`DropOnly`] is the
/// default and [`CallDispose`] is selected by
/// [`SlotPoolBuilder::dispose_on_free()`][crate::SlotPoolBuilder::dispose_on_free].
pub trait Teardown<T> {
    /// Called once for each item, right before the item is dropped.
    fn teardown(item: &mut T);
}

/// Items are torn down by their `Drop` implementation only. This is the default.
#[derive(Clone, Copy, Debug, Default)]
pub struct DropOnly;

impl<T> Teardown<T> for DropOnly {
    #[cfg_attr(test, mutants::skip)] // Nothing to mutate.
    fn teardown(_item: &mut T) {}
}

/// Items are torn down by calling [`Dispose::dispose()`] before they are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallDispose;

impl<T: Dispose> Teardown<T> for CallDispose {
    fn teardown(item: &mut T) {
        item.dispose();
    }
}
