//! # Id Pool
//!
//! Allocator for small integer slot ids with free-list reuse.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Hands out slot ids, reusing released ids before issuing fresh ones.
///
/// When several ids are free the smallest one is returned first, which keeps
/// the backing arrays of the stores dense.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Each store owns its own pool.
///
/// # Example
///
/// ```rust
/// use tessera_core::IdPool;
///
/// let mut pool = IdPool::new();
/// let a = pool.create();
/// let b = pool.create();
/// pool.destroy(a);
/// assert_eq!(pool.create(), a);
/// assert_eq!(pool.create(), b + 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct IdPool {
    /// Released ids, smallest on top.
    free_list: BinaryHeap<Reverse<u32>>,
    /// Next id never handed out before.
    next_id: u32,
    /// Number of ids currently in use.
    allocated_count: usize,
}

impl IdPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes an id from the pool.
    ///
    /// This is an **O(log n)** operation on the free list and never fails.
    pub fn create(&mut self) -> u32 {
        let id = match self.free_list.pop() {
            Some(Reverse(id)) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        self.allocated_count += 1;
        id
    }

    /// Returns an id to the pool.
    ///
    /// The caller guarantees the id is currently allocated; releasing an id
    /// twice hands it out twice.
    pub fn destroy(&mut self, id: u32) {
        debug_assert!(id < self.next_id, "id {id} was never allocated");
        self.free_list.push(Reverse(id));
        self.allocated_count = self.allocated_count.saturating_sub(1);
    }

    /// Returns the number of ids currently in use.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Returns the number of released ids waiting for reuse.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns how many distinct ids have ever been issued.
    #[inline]
    #[must_use]
    pub const fn high_water(&self) -> u32 {
        self.next_id
    }

    /// Forgets every id, as if the pool were new.
    pub fn clear(&mut self) {
        self.free_list.clear();
        self.next_id = 0;
        self.allocated_count = 0;
    }
}
