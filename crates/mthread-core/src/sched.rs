//! Abstract scheduling parameters
//!
//! The policy set is platform-independent; the runtime translates it to
//! OS constants only when talking to the scheduler.

use core::fmt;

/// Scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SchedPolicy {
    /// Default time-sharing policy
    #[default]
    Other = 0,

    /// Real-time first-in first-out
    Fifo = 1,

    /// Real-time round robin
    RoundRobin = 2,

    /// CPU-bound batch work
    Batch = 3,

    /// Very low priority background work
    Idle = 4,
}

impl SchedPolicy {
    /// Real-time policies take a non-zero priority
    #[inline]
    pub const fn is_realtime(&self) -> bool {
        matches!(self, SchedPolicy::Fifo | SchedPolicy::RoundRobin)
    }

    pub fn iter() -> impl Iterator<Item = SchedPolicy> {
        [
            SchedPolicy::Other,
            SchedPolicy::Fifo,
            SchedPolicy::RoundRobin,
            SchedPolicy::Batch,
            SchedPolicy::Idle,
        ]
        .into_iter()
    }
}

impl From<u8> for SchedPolicy {
    fn from(v: u8) -> Self {
        match v {
            1 => SchedPolicy::Fifo,
            2 => SchedPolicy::RoundRobin,
            3 => SchedPolicy::Batch,
            4 => SchedPolicy::Idle,
            _ => SchedPolicy::Other,
        }
    }
}

impl From<SchedPolicy> for u8 {
    fn from(p: SchedPolicy) -> u8 {
        p as u8
    }
}

impl fmt::Display for SchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedPolicy::Other => write!(f, "OTHER"),
            SchedPolicy::Fifo => write!(f, "FIFO"),
            SchedPolicy::RoundRobin => write!(f, "RR"),
            SchedPolicy::Batch => write!(f, "BATCH"),
            SchedPolicy::Idle => write!(f, "IDLE"),
        }
    }
}

/// Policy plus priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SchedulingSpec {
    pub policy: SchedPolicy,
    pub priority: i32,
}

impl SchedulingSpec {
    pub const fn new(policy: SchedPolicy, priority: i32) -> Self {
        Self { policy, priority }
    }

    /// Clamp the priority into `[min, max]`.
    ///
    /// Returns the clamped spec and whether clamping changed anything.
    pub fn clamped(&self, min: i32, max: i32) -> (SchedulingSpec, bool) {
        let priority = self.priority.clamp(min, max.max(min));
        (
            SchedulingSpec::new(self.policy, priority),
            priority != self.priority,
        )
    }
}

impl fmt::Display for SchedulingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.policy, self.priority)
    }
}
