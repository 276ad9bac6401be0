//! Linux constants and policy translation

use mthread_core::SchedPolicy;

/// Longest OS-visible thread name, excluding the terminating NUL
pub const THREAD_NAME_MAX: usize = 15;

/// Flag the kernel may or into a reported policy
pub(crate) const SCHED_RESET_ON_FORK: libc::c_int = 0x4000_0000;

/// Abstract policy to kernel scheduling class
pub(crate) fn policy_to_os(policy: SchedPolicy) -> libc::c_int {
    match policy {
        SchedPolicy::Other => libc::SCHED_OTHER,
        SchedPolicy::Fifo => libc::SCHED_FIFO,
        SchedPolicy::RoundRobin => libc::SCHED_RR,
        SchedPolicy::Batch => libc::SCHED_BATCH,
        SchedPolicy::Idle => libc::SCHED_IDLE,
    }
}

/// Kernel scheduling class to abstract policy
pub(crate) fn policy_from_os(policy: libc::c_int) -> Option<SchedPolicy> {
    match policy {
        libc::SCHED_OTHER => Some(SchedPolicy::Other),
        libc::SCHED_FIFO => Some(SchedPolicy::Fifo),
        libc::SCHED_RR => Some(SchedPolicy::RoundRobin),
        libc::SCHED_BATCH => Some(SchedPolicy::Batch),
        libc::SCHED_IDLE => Some(SchedPolicy::Idle),
        _ => None,
    }
}
