//! Lifecycle state of a managed thread
//!
//! The state is a set of independent flags packed into one word. All
//! transitions go through `AtomicThreadState`, which only exposes single
//! atomic operations (CAS, fetch-or, fetch-and, swap). Each operation
//! returns the *previous* flags so the caller can re-validate its
//! precondition after the fact. There is no lock around the word.
//!
//! Typical progression:
//!
//! ```text
//! INVALID -> IS_STARTING -> STARTED -> RUNNING -> IS_STOPPING -> INVALID
//! ```

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

bitflags::bitflags! {
    /// Lifecycle flags. The empty set is the `Invalid` state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ThreadState: u32 {
        /// An OS thread exists and its handle is valid
        const STARTED = 1 << 0;
        /// The spawned context is executing Runnable callbacks
        const RUNNING = 1 << 1;
        /// A `start()` call owns the instance
        const IS_STARTING = 1 << 2;
        /// A `stop()` call owns the instance
        const IS_STOPPING = 1 << 3;
    }
}

impl ThreadState {
    /// No flags set
    pub const INVALID: ThreadState = ThreadState::empty();

    #[inline]
    pub const fn is_invalid(&self) -> bool {
        self.is_empty()
    }

    /// A start or stop is in flight
    #[inline]
    pub const fn is_transitioning(&self) -> bool {
        self.intersects(ThreadState::IS_STARTING.union(ThreadState::IS_STOPPING))
    }

    /// Started, but the spawned context has already left its body and no
    /// one is starting or stopping it. Left behind when a thread exits
    /// without `stop()`.
    #[inline]
    pub fn is_exited(&self) -> bool {
        *self == ThreadState::STARTED
    }
}

impl Default for ThreadState {
    fn default() -> Self {
        ThreadState::INVALID
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            return write!(f, "Invalid");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}", name)?;
            first = false;
        }
        Ok(())
    }
}

/// Atomic cell holding a `ThreadState`
#[derive(Debug, Default)]
pub struct AtomicThreadState {
    bits: AtomicU32,
}

impl AtomicThreadState {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn load(&self) -> ThreadState {
        ThreadState::from_bits_retain(self.bits.load(Ordering::Acquire))
    }

    /// Replace `current` with `new` if the word equals `current` exactly.
    /// Returns the observed value on failure.
    #[inline]
    pub fn compare_exchange(
        &self,
        current: ThreadState,
        new: ThreadState,
    ) -> Result<ThreadState, ThreadState> {
        self.bits
            .compare_exchange(current.bits(), new.bits(), Ordering::AcqRel, Ordering::Acquire)
            .map(ThreadState::from_bits_retain)
            .map_err(ThreadState::from_bits_retain)
    }

    /// Set `flags`, returning the previous state
    #[inline]
    pub fn set(&self, flags: ThreadState) -> ThreadState {
        ThreadState::from_bits_retain(self.bits.fetch_or(flags.bits(), Ordering::AcqRel))
    }

    /// Clear `flags`, returning the previous state
    #[inline]
    pub fn clear(&self, flags: ThreadState) -> ThreadState {
        ThreadState::from_bits_retain(self.bits.fetch_and(!flags.bits(), Ordering::AcqRel))
    }

    /// Keep only `flags`, returning the previous state
    #[inline]
    pub fn retain(&self, flags: ThreadState) -> ThreadState {
        ThreadState::from_bits_retain(self.bits.fetch_and(flags.bits(), Ordering::AcqRel))
    }

    /// Reset to `Invalid`, returning the previous state
    #[inline]
    pub fn reset(&self) -> ThreadState {
        ThreadState::from_bits_retain(self.bits.swap(0, Ordering::AcqRel))
    }
}
