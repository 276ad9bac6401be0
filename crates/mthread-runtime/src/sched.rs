//! Scheduling policy/priority translation and commit
//!
//! Priorities are clamped into the range the OS reports for the chosen
//! policy. A clamped request still goes through with the corrected value
//! but reports `SchedulingParameterInvalid`, so callers learn their input
//! was adjusted. Privilege failures (`EPERM`) are reported separately from
//! other scheduler failures.

use mthread_core::{kdebug, kwarn, SchedPolicy, SchedulingSpec, ThreadError, ThreadResult};
use nix::errno::Errno;

use crate::handle::ThreadHandle;
use crate::platform::{policy_from_os, policy_to_os, SCHED_RESET_ON_FORK};

/// OS-reported `[min, max]` priority for `policy`
pub fn priority_range(policy: SchedPolicy) -> ThreadResult<(i32, i32)> {
    let os_policy = policy_to_os(policy);
    let min = unsafe { libc::sched_get_priority_min(os_policy) };
    let max = unsafe { libc::sched_get_priority_max(os_policy) };
    if min == -1 || max == -1 {
        kwarn!("priority range query for {} failed: {}", policy, Errno::last());
        return Err(ThreadError::SchedulePriorityFailed);
    }
    Ok((min, max))
}

/// Clamp `spec` to its policy's range.
/// Returns the usable spec and whether the priority had to change.
pub(crate) fn clamp_to_policy(spec: SchedulingSpec) -> ThreadResult<(SchedulingSpec, bool)> {
    let (min, max) = priority_range(spec.policy)?;
    let (clamped, changed) = spec.clamped(min, max);
    if changed {
        kdebug!(
            "priority {} outside [{}, {}] for {}, using {}",
            spec.priority,
            min,
            max,
            spec.policy,
            clamped.priority
        );
    }
    Ok((clamped, changed))
}

/// Apply an already-clamped spec to a live thread
pub(crate) fn commit(handle: ThreadHandle, spec: SchedulingSpec) -> ThreadResult<()> {
    // Safety: sched_param is plain data; zero the fields we don't set
    let mut param: libc::sched_param = unsafe { core::mem::zeroed() };
    param.sched_priority = spec.priority;

    let rc = unsafe {
        libc::pthread_setschedparam(handle.as_raw(), policy_to_os(spec.policy), &param)
    };
    match rc {
        0 => Ok(()),
        libc::EPERM => {
            kdebug!("pthread_setschedparam({}) not permitted", spec);
            Err(ThreadError::SchedulePriorityNotPermitted)
        }
        rc => {
            kwarn!("pthread_setschedparam({}) failed: {}", spec, Errno::from_raw(rc));
            Err(ThreadError::SchedulePriorityFailed)
        }
    }
}

/// Set policy and priority on an arbitrary live thread
pub fn set_scheduling_parameters_for(
    handle: ThreadHandle,
    policy: SchedPolicy,
    priority: i32,
) -> ThreadResult<()> {
    let (spec, clamped) = clamp_to_policy(SchedulingSpec::new(policy, priority))?;
    commit(handle, spec)?;
    if clamped {
        return Err(ThreadError::SchedulingParameterInvalid);
    }
    Ok(())
}

/// Read policy and priority of an arbitrary live thread
pub fn get_scheduling_parameters_for(handle: ThreadHandle) -> ThreadResult<SchedulingSpec> {
    let mut os_policy: libc::c_int = 0;
    // Safety: plain data, filled in by the call
    let mut param: libc::sched_param = unsafe { core::mem::zeroed() };

    let rc = unsafe { libc::pthread_getschedparam(handle.as_raw(), &mut os_policy, &mut param) };
    if rc != 0 {
        kwarn!("pthread_getschedparam failed: {}", Errno::from_raw(rc));
        return Err(ThreadError::SchedulePriorityFailed);
    }

    // Linux may report SCHED_RESET_ON_FORK or'd into the policy
    let policy = policy_from_os(os_policy & !SCHED_RESET_ON_FORK).ok_or_else(|| {
        kwarn!("unknown scheduling policy {}", os_policy);
        ThreadError::SchedulePriorityFailed
    })?;
    Ok(SchedulingSpec::new(policy, param.sched_priority))
}
