//! Result taxonomy for managed thread operations
//!
//! Every lifecycle operation returns a `ThreadResult`. `Ok(())` is the
//! taxonomy's `Ok`; each failure is one `ThreadError` variant. Errors are
//! always returned, never raised.
//!
//! Each outcome carries a stable numeric code and a stable name so it can
//! cross FFI or log boundaries unchanged.

use core::fmt;

/// Result type for managed thread operations
pub type ThreadResult<T> = Result<T, ThreadError>;

/// Failures a managed thread operation can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadError {
    /// Generic failure (also: a Runnable callback reported failure)
    Failed,

    /// `start()` on an instance that is already started or starting
    AlreadyStarted,

    /// `stop()` or a handle operation on an instance with no live context
    NotRunning,

    /// Start rendezvous barrier could not be initialized
    CreateBarrierFailed,

    /// Start rendezvous barrier could not be destroyed
    DestroyBarrierFailed,

    /// Thread attributes could not be initialized or configured
    InitAttributeFailed,

    /// The OS refused to create the thread
    CreateThreadFailed,

    /// Thread attributes could not be destroyed
    DestroyAttributeFailed,

    /// Waiting on the start rendezvous failed
    WaitBarrierFailed,

    /// Joining the spawned context failed
    JoinThreadFailed,

    /// The OS-visible name could not be set (or was empty)
    ThreadSetNameFailed,

    /// The OS-visible name could not be read back
    ThreadGetNameFailed,

    /// The scheduler call failed for a reason other than permissions
    SchedulePriorityFailed,

    /// The scheduler call was refused for lack of privilege
    SchedulePriorityNotPermitted,

    /// Priority was outside the policy's range and has been clamped
    SchedulingParameterInvalid,

    /// Signal delivery failed
    SignalFailed,

    /// No Runnable is bound to the instance
    ObjectInvalid,
}

impl ThreadError {
    /// All error variants, in code order
    pub const ALL: [ThreadError; 17] = [
        ThreadError::Failed,
        ThreadError::AlreadyStarted,
        ThreadError::NotRunning,
        ThreadError::CreateBarrierFailed,
        ThreadError::DestroyBarrierFailed,
        ThreadError::InitAttributeFailed,
        ThreadError::CreateThreadFailed,
        ThreadError::DestroyAttributeFailed,
        ThreadError::WaitBarrierFailed,
        ThreadError::JoinThreadFailed,
        ThreadError::ThreadSetNameFailed,
        ThreadError::ThreadGetNameFailed,
        ThreadError::SchedulePriorityFailed,
        ThreadError::SchedulePriorityNotPermitted,
        ThreadError::SchedulingParameterInvalid,
        ThreadError::SignalFailed,
        ThreadError::ObjectInvalid,
    ];

    /// Stable numeric code (`Ok` is 0, errors are negative)
    pub const fn code(&self) -> i32 {
        match self {
            ThreadError::Failed => -1,
            ThreadError::AlreadyStarted => -2,
            ThreadError::NotRunning => -3,
            ThreadError::CreateBarrierFailed => -4,
            ThreadError::DestroyBarrierFailed => -5,
            ThreadError::InitAttributeFailed => -6,
            ThreadError::CreateThreadFailed => -7,
            ThreadError::DestroyAttributeFailed => -8,
            ThreadError::WaitBarrierFailed => -9,
            ThreadError::JoinThreadFailed => -10,
            ThreadError::ThreadSetNameFailed => -11,
            ThreadError::ThreadGetNameFailed => -12,
            ThreadError::SchedulePriorityFailed => -13,
            ThreadError::SchedulePriorityNotPermitted => -14,
            ThreadError::SchedulingParameterInvalid => -15,
            ThreadError::SignalFailed => -16,
            ThreadError::ObjectInvalid => -17,
        }
    }

    /// Inverse of `code()`. Returns `None` for 0 and unknown codes.
    pub fn from_code(code: i32) -> Option<ThreadError> {
        if code >= 0 {
            return None;
        }
        Self::ALL.get((-(code as i64) - 1) as usize).copied()
    }

    /// Stable name of the outcome
    pub const fn as_str(&self) -> &'static str {
        match self {
            ThreadError::Failed => "Failed",
            ThreadError::AlreadyStarted => "AlreadyStarted",
            ThreadError::NotRunning => "NotRunning",
            ThreadError::CreateBarrierFailed => "CreateBarrierFailed",
            ThreadError::DestroyBarrierFailed => "DestroyBarrierFailed",
            ThreadError::InitAttributeFailed => "InitAttributeFailed",
            ThreadError::CreateThreadFailed => "CreateThreadFailed",
            ThreadError::DestroyAttributeFailed => "DestroyAttributeFailed",
            ThreadError::WaitBarrierFailed => "WaitBarrierFailed",
            ThreadError::JoinThreadFailed => "JoinThreadFailed",
            ThreadError::ThreadSetNameFailed => "ThreadSetNameFailed",
            ThreadError::ThreadGetNameFailed => "ThreadGetNameFailed",
            ThreadError::SchedulePriorityFailed => "SchedulePriorityFailed",
            ThreadError::SchedulePriorityNotPermitted => "SchedulePriorityNotPermitted",
            ThreadError::SchedulingParameterInvalid => "SchedulingParameterInvalid",
            ThreadError::SignalFailed => "SignalFailed",
            ThreadError::ObjectInvalid => "ObjectInvalid",
        }
    }

    /// Failures raised while bringing a thread up (as opposed to
    /// failures only observable once the spawned context has been joined)
    pub const fn is_start_failure(&self) -> bool {
        matches!(
            self,
            ThreadError::AlreadyStarted
                | ThreadError::CreateBarrierFailed
                | ThreadError::DestroyBarrierFailed
                | ThreadError::InitAttributeFailed
                | ThreadError::CreateThreadFailed
                | ThreadError::DestroyAttributeFailed
                | ThreadError::WaitBarrierFailed
        )
    }
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadError::Failed => write!(f, "operation failed"),
            ThreadError::AlreadyStarted => write!(f, "thread already started"),
            ThreadError::NotRunning => write!(f, "thread not running"),
            ThreadError::CreateBarrierFailed => write!(f, "failed to create start barrier"),
            ThreadError::DestroyBarrierFailed => write!(f, "failed to destroy start barrier"),
            ThreadError::InitAttributeFailed => write!(f, "failed to initialize thread attributes"),
            ThreadError::CreateThreadFailed => write!(f, "failed to create thread"),
            ThreadError::DestroyAttributeFailed => write!(f, "failed to destroy thread attributes"),
            ThreadError::WaitBarrierFailed => write!(f, "failed to wait on start barrier"),
            ThreadError::JoinThreadFailed => write!(f, "failed to join thread"),
            ThreadError::ThreadSetNameFailed => write!(f, "failed to set thread name"),
            ThreadError::ThreadGetNameFailed => write!(f, "failed to get thread name"),
            ThreadError::SchedulePriorityFailed => write!(f, "failed to set scheduling priority"),
            ThreadError::SchedulePriorityNotPermitted => {
                write!(f, "scheduling priority not permitted")
            }
            ThreadError::SchedulingParameterInvalid => {
                write!(f, "scheduling parameter out of range (clamped)")
            }
            ThreadError::SignalFailed => write!(f, "failed to deliver signal"),
            ThreadError::ObjectInvalid => write!(f, "no runnable bound"),
        }
    }
}

impl std::error::Error for ThreadError {}

/// Numeric code of a unit result (`Ok` = 0)
#[inline]
pub fn result_code(result: &ThreadResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

/// Stable name of a unit result (`"Ok"` for success)
#[inline]
pub fn result_str(result: &ThreadResult<()>) -> &'static str {
    match result {
        Ok(()) => "Ok",
        Err(e) => e.as_str(),
    }
}

/// Rebuild a unit result from its numeric code. Unknown codes map to `Failed`.
#[inline]
pub fn result_from_code(code: i32) -> ThreadResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(ThreadError::from_code(code).unwrap_or(ThreadError::Failed))
    }
}
