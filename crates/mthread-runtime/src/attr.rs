//! pthread attribute object
//!
//! Initialized for one `pthread_create` call and destroyed right after it.
//! `destroy()` reports failure; dropping without `destroy()` (an early
//! error return) still releases the object.

use mthread_core::{kwarn, ThreadError, ThreadResult};
use nix::errno::Errno;

pub(crate) struct ThreadAttributes {
    // Boxed so the initialized object never moves
    attr: Box<libc::pthread_attr_t>,
    live: bool,
}

impl ThreadAttributes {
    /// Initialize attributes. A `stack_size` of 0 keeps the OS default.
    pub(crate) fn new(stack_size: usize) -> ThreadResult<Self> {
        // Safety: pthread_attr_t is plain data, zero is a valid pre-init state
        let mut attr: Box<libc::pthread_attr_t> = Box::new(unsafe { core::mem::zeroed() });

        let rc = unsafe { libc::pthread_attr_init(&mut *attr) };
        if rc != 0 {
            kwarn!("pthread_attr_init failed: {}", Errno::from_raw(rc));
            return Err(ThreadError::InitAttributeFailed);
        }
        let mut attrs = ThreadAttributes { attr, live: true };

        if stack_size != 0 {
            let rc = unsafe { libc::pthread_attr_setstacksize(&mut *attrs.attr, stack_size) };
            if rc != 0 {
                kwarn!(
                    "pthread_attr_setstacksize({}) failed: {}",
                    stack_size,
                    Errno::from_raw(rc)
                );
                return Err(ThreadError::InitAttributeFailed);
            }
        }

        Ok(attrs)
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *const libc::pthread_attr_t {
        &*self.attr
    }

    pub(crate) fn destroy(mut self) -> ThreadResult<()> {
        self.live = false;
        let rc = unsafe { libc::pthread_attr_destroy(&mut *self.attr) };
        if rc != 0 {
            kwarn!("pthread_attr_destroy failed: {}", Errno::from_raw(rc));
            return Err(ThreadError::DestroyAttributeFailed);
        }
        Ok(())
    }
}

impl Drop for ThreadAttributes {
    fn drop(&mut self) {
        if self.live {
            unsafe {
                libc::pthread_attr_destroy(&mut *self.attr);
            }
        }
    }
}
