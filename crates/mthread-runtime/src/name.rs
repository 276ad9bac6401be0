//! OS-visible thread names
//!
//! Linux limits names to 15 bytes plus NUL. Longer names are truncated
//! silently at a char boundary; empty names are rejected.

use std::ffi::{CStr, CString};

use mthread_core::{kwarn, ThreadError, ThreadResult};
use nix::errno::Errno;

use crate::handle::ThreadHandle;
use crate::platform::THREAD_NAME_MAX;

/// Cut `name` to what the OS will accept (stops at an interior NUL)
pub fn truncate_name(name: &str) -> &str {
    let name = name.split('\0').next().unwrap_or("");
    if name.len() <= THREAD_NAME_MAX {
        return name;
    }
    let mut end = THREAD_NAME_MAX;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

pub fn set_thread_name_for(handle: ThreadHandle, name: &str) -> ThreadResult<()> {
    let name = truncate_name(name);
    if name.is_empty() {
        return Err(ThreadError::ThreadSetNameFailed);
    }
    let cname = CString::new(name).map_err(|_| ThreadError::ThreadSetNameFailed)?;

    let rc = unsafe { libc::pthread_setname_np(handle.as_raw(), cname.as_ptr()) };
    if rc != 0 {
        kwarn!("pthread_setname_np({:?}) failed: {}", name, Errno::from_raw(rc));
        return Err(ThreadError::ThreadSetNameFailed);
    }
    Ok(())
}

pub fn thread_name_for(handle: ThreadHandle) -> ThreadResult<String> {
    let mut buf = [0 as libc::c_char; THREAD_NAME_MAX + 1];
    let rc = unsafe { libc::pthread_getname_np(handle.as_raw(), buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        kwarn!("pthread_getname_np failed: {}", Errno::from_raw(rc));
        return Err(ThreadError::ThreadGetNameFailed);
    }
    // Safety: the OS NUL-terminates within buf.len()
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(name.to_string_lossy().into_owned())
}

#[inline]
pub fn set_current_thread_name(name: &str) -> ThreadResult<()> {
    set_thread_name_for(ThreadHandle::current(), name)
}

#[inline]
pub fn current_thread_name() -> ThreadResult<String> {
    thread_name_for(ThreadHandle::current())
}
