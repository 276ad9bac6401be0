//! Two-party start rendezvous
//!
//! Wraps a `pthread_barrier_t` sized for the caller of `start()` and the
//! spawned context. The barrier is initialized lazily, and after each
//! rendezvous it is destroyed by the party the OS designates as the serial
//! thread (the "winner"). `valid` tracks whether the OS object currently
//! exists so destruction happens exactly once on every path.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use mthread_core::{kdebug, kwarn, ThreadError, ThreadResult};
use nix::errno::Errno;

/// Which side of the rendezvous the caller ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arrival {
    /// Responsible for destroying the barrier
    Winner,
    Loser,
}

pub(crate) struct StartBarrier {
    barrier: UnsafeCell<libc::pthread_barrier_t>,
    valid: AtomicBool,
}

// Safety: the OS object is only touched through pthread_barrier_* calls,
// which are thread-safe; init/destroy are serialized by `valid`.
unsafe impl Send for StartBarrier {}
unsafe impl Sync for StartBarrier {}

impl StartBarrier {
    pub(crate) fn new() -> Self {
        StartBarrier {
            // Safety: plain data, only used after pthread_barrier_init
            barrier: UnsafeCell::new(unsafe { core::mem::zeroed() }),
            valid: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Initialize for two parties
    pub(crate) fn init(&self) -> ThreadResult<()> {
        let rc = unsafe { libc::pthread_barrier_init(self.barrier.get(), core::ptr::null(), 2) };
        if rc != 0 {
            kwarn!("pthread_barrier_init failed: {}", Errno::from_raw(rc));
            return Err(ThreadError::CreateBarrierFailed);
        }
        self.valid.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn wait(&self) -> ThreadResult<Arrival> {
        match unsafe { libc::pthread_barrier_wait(self.barrier.get()) } {
            libc::PTHREAD_BARRIER_SERIAL_THREAD => Ok(Arrival::Winner),
            0 => Ok(Arrival::Loser),
            rc => {
                kwarn!("pthread_barrier_wait failed: {}", Errno::from_raw(rc));
                Err(ThreadError::WaitBarrierFailed)
            }
        }
    }

    /// Destroy the OS object if it still exists
    pub(crate) fn destroy(&self) -> ThreadResult<()> {
        if !self.valid.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let rc = unsafe { libc::pthread_barrier_destroy(self.barrier.get()) };
        if rc != 0 {
            kwarn!("pthread_barrier_destroy failed: {}", Errno::from_raw(rc));
            return Err(ThreadError::DestroyBarrierFailed);
        }
        Ok(())
    }

    /// Wait for the other party; the winner destroys the barrier
    pub(crate) fn rendezvous(&self) -> ThreadResult<()> {
        match self.wait()? {
            Arrival::Winner => {
                kdebug!("start rendezvous: winner, destroying barrier");
                self.destroy()
            }
            Arrival::Loser => Ok(()),
        }
    }
}

impl Drop for StartBarrier {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}
