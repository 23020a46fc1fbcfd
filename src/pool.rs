//! Generic object pool for high-churn payloads.
//!
//! Projectiles, particles and damage popups are created and destroyed every
//! frame; recycling their payloads avoids allocation storms in the hot
//! path. The pool has no identity or ownership semantics beyond "currently
//! checked out vs free": `acquire` pops a recycled instance or builds a new
//! one, `release` runs the pool's reset function and returns the instance
//! to the free list. The free list is a `Mutex<Vec<T>>`; the lock is held
//! only for the push/pop, so contention is negligible at per-frame rates.

use std::sync::Mutex;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Reset<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Concurrent free-list pool. `T` instances handed out by `acquire` are
/// owned by the caller until passed back through `release`.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    factory: Factory<T>,
    reset: Reset<T>,
}

impl<T> Pool<T> {
    /// Create an empty pool with a constructor and a reset function.
    /// The reset function must return every mutable field to its default;
    /// a released item leaks no prior state into its next checkout.
    pub fn new(
        factory: impl Fn() -> T + Send + Sync + 'static,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            reset: Box::new(reset),
        }
    }

    /// Create a pool pre-filled with `capacity` instances.
    pub fn with_capacity(
        capacity: usize,
        factory: impl Fn() -> T + Send + Sync + 'static,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        let pool = Self::new(factory, reset);
        {
            let mut free = pool.free.lock().expect("pool lock poisoned");
            for _ in 0..capacity {
                free.push((pool.factory)());
            }
        }
        pool
    }

    /// Pop a recycled instance, or construct a new one if the free list is
    /// empty.
    pub fn acquire(&self) -> T {
        let recycled = self.free.lock().expect("pool lock poisoned").pop();
        recycled.unwrap_or_else(|| (self.factory)())
    }

    /// Reset an instance and return it to the free list.
    pub fn release(&self, mut item: T) {
        (self.reset)(&mut item);
        self.free.lock().expect("pool lock poisoned").push(item);
    }

    /// Number of instances currently waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.lock().expect("pool lock poisoned").len()
    }
}
