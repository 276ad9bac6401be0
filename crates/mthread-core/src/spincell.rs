//! Small spin-guarded value slot
//!
//! Holds the side data of a managed thread that both the caller and the
//! spawned context read (bound Runnable, name, cached scheduling spec).
//! Critical sections only clone or swap the value; callbacks and OS calls
//! always run outside the guard. Lifecycle state never lives here.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A value guarded by a spin flag
pub struct SpinCell<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// Safety: every access to `value` happens while `locked` is held
unsafe impl<T: Send> Send for SpinCell<T> {}
unsafe impl<T: Send> Sync for SpinCell<T> {}

impl<T> SpinCell<T> {
    pub const fn new(value: T) -> Self {
        SpinCell {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    fn acquire(&self) {
        let mut spins = 0u32;
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                spins = spins.wrapping_add(1);
                if spins % 1024 == 0 {
                    std::thread::yield_now();
                } else {
                    core::hint::spin_loop();
                }
            }
        }
    }

    #[inline]
    fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Run `f` with exclusive access to the value
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.acquire();
        // Safety: we hold the flag
        let r = f(unsafe { &mut *self.value.get() });
        self.release();
        r
    }

    /// Swap in a new value, returning the old one
    #[inline]
    pub fn replace(&self, value: T) -> T {
        self.with(|slot| core::mem::replace(slot, value))
    }

    #[inline]
    pub fn store(&self, value: T) {
        drop(self.replace(value));
    }
}

impl<T: Clone> SpinCell<T> {
    /// Clone the current value out
    #[inline]
    pub fn load(&self) -> T {
        self.with(|slot| slot.clone())
    }
}

impl<T: Default> Default for SpinCell<T> {
    fn default() -> Self {
        SpinCell::new(T::default())
    }
}

impl<T: Clone + core::fmt::Debug> core::fmt::Debug for SpinCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("SpinCell").field(&self.load()).finish()
    }
}
