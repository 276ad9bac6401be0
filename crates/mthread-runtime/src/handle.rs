//! Opaque OS thread identifier

use core::fmt;

/// A pthread identifier. Only meaningful while the thread it names has not
/// been joined.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ThreadHandle(libc::pthread_t);

impl ThreadHandle {
    /// Handle of the calling thread
    #[inline]
    pub fn current() -> Self {
        ThreadHandle(nix::sys::pthread::pthread_self())
    }

    #[inline]
    pub const fn from_raw(raw: libc::pthread_t) -> Self {
        ThreadHandle(raw)
    }

    #[inline]
    pub const fn as_raw(&self) -> libc::pthread_t {
        self.0
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadHandle({:#x})", self.0 as usize)
    }
}
