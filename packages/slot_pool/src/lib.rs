//! An object pool whose items are referenced by small, copyable handles that detect use
//! after free.
//!
//! This crate provides [`SlotPool<T>`], a dynamically growing pool that stores items of one type
//! and hands out a [`Handle<T>`] for each inserted item. Handles are plain `(index, generation)`
//! values that can be stored anywhere, copied freely and compared cheaply. The pool checks the
//! generation on every access, so once an item is deallocated, every copy of its handle stops
//! resolving, even after the slot has been reused for a new item.
//!
//! This makes the pool suitable as the backing store for long-lived resources that many
//! systems refer to, such as the textures, buffers and meshes of a rendering engine, without
//! per-access locking, reference counting or raw pointers.
//!
//! # Key Features
//!
//! - **Stale handle detection**: [`get()`][1] returns `None` for deallocated items and
//!   [`deallocate()`][2] ignores them, so double frees are harmless
//! - **O(1) operations**: allocation, lookup and deallocation do not scan the pool
//! - **Dynamic growth**: capacity multiplies by a configurable factor when the pool runs out
//! - **Stable memory addresses**: growth appends new storage blocks, items never move
//! - **Cache-friendly reuse**: the most recently freed slot is reused first
//! - **Explicit teardown**: items implementing [`Dispose`] can have the pool call
//!   [`Dispose::dispose()`] before they are dropped
//! - **Flexible drop policies**: configure behavior when the pool is dropped with remaining items
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```rust
//! use slot_pool::SlotPool;
//!
//! let mut pool = SlotPool::<String>::new();
//!
//! let alice = pool.allocate("Alice".to_string());
//! let bob = pool.allocate("Bob".to_string());
//!
//! assert_eq!(pool.get(alice).map(String::as_str), Some("Alice"));
//!
//! pool.deallocate(alice);
//!
//! // The handle is now stale, while other items are unaffected.
//! assert!(pool.get(alice).is_none());
//! assert_eq!(pool.get(bob).map(String::as_str), Some("Bob"));
//! ```
//!
//! ## Releasing external resources
//!
//! ```rust
//! use slot_pool::{Dispose, SlotPool};
//!
//! struct Framebuffer {
//!     id: u32,
//! }
//!
//! impl Dispose for Framebuffer {
//!     fn dispose(&mut self) {
//!         // Tell the graphics API to release framebuffer `self.id`.
//!     }
//! }
//!
//! let mut pool = SlotPool::<Framebuffer>::builder()
//!     .initial_capacity(16)
//!     .dispose_on_free()
//!     .build();
//!
//! let framebuffer = pool.allocate(Framebuffer { id: 1 });
//!
//! // Calls `dispose()` and then drops the item.
//! pool.deallocate(framebuffer);
//! ```
//!
//! # Logging
//!
//! The pool emits [`tracing`] events: growth is logged at debug level and ignored deallocation
//! of stale handles at trace level. No subscriber is installed by this crate.
//!
//! [1]: SlotPool::get
//! [2]: SlotPool::deallocate

mod block;
mod builder;
mod drop_policy;
mod error;
mod fixed_stack;
mod handle;
mod slot_pool;
mod teardown;

pub(crate) use block::*;
pub use builder::*;
pub use drop_policy::*;
pub use error::Error;
pub(crate) use error::Result;
pub use fixed_stack::*;
pub use handle::*;
pub use slot_pool::*;
pub use teardown::*;
