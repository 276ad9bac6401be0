//! Signal delivery to a specific thread

use mthread_core::{kwarn, ThreadError, ThreadResult};

pub use nix::sys::signal::Signal;

use crate::handle::ThreadHandle;

pub fn signal_thread(handle: ThreadHandle, signal: Signal) -> ThreadResult<()> {
    nix::sys::pthread::pthread_kill(handle.as_raw(), signal).map_err(|e| {
        kwarn!("pthread_kill({}) failed: {}", signal, e);
        ThreadError::SignalFailed
    })
}

/// Null-signal probe: true if the thread still exists
pub(crate) fn probe_thread(handle: ThreadHandle) -> bool {
    nix::sys::pthread::pthread_kill(handle.as_raw(), None::<Signal>).is_ok()
}
