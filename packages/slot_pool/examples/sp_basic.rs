//! Basic usage of the `slot_pool` crate:
//!
//! * Creating a pool.
//! * Allocating items.
//! * Retrieving items.
//! * Deallocating items and observing stale handles.

use slot_pool::SlotPool;

fn main() {
    let mut pool = SlotPool::<String>::new();

    // Allocating an item gives you a handle that you can later use to look up the item again.
    let alice = pool.allocate("Alice".to_string());
    let bob = pool.allocate("Bob".to_string());
    let charlie = pool.allocate("Charlie".to_string());

    println!(
        "Slot pool contains {} items, with an auto-adjusting capacity of {}",
        pool.len(),
        pool.capacity()
    );

    // Handles are small `Copy` values. Store them wherever you like.
    println!("Handle of Alice: {alice:?}");

    if let Some(name) = pool.get(alice) {
        println!("Retrieved item: {name}");
    }

    pool.deallocate(bob);
    pool.deallocate(charlie);

    // The handles still exist but no longer resolve to anything.
    println!("Bob after deallocation: {:?}", pool.get(bob));

    // Deallocating again is harmless.
    pool.deallocate(bob);

    // The slot that Bob occupied is reused, with a new generation.
    let dave = pool.allocate("Dave".to_string());
    println!(
        "Dave reuses slot {} with generation {} (Bob had generation {})",
        dave.index(),
        dave.generation(),
        bob.generation()
    );
    println!("Bob still resolves to: {:?}", pool.get(bob));

    // You can also modify the items in-place.
    if let Some(name) = pool.get_mut(alice) {
        name.push_str(" Smith");
    }

    for (handle, name) in pool.iter() {
        println!("Slot {}: {name}", handle.index());
    }
}
