//! Managed thread configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! ```rust,ignore
//! use mthread_runtime::config::ThreadConfig;
//!
//! let config = ThreadConfig::from_env()
//!     .name("audio-io")
//!     .stack_size(256 * 1024)
//!     .scheduling(SchedPolicy::Fifo, 10);
//! ```

use std::time::Duration;

use mthread_core::env::{parse_ms, parse_opt};
use mthread_core::{SchedPolicy, SchedulingSpec};

pub mod defaults {
    /// Thread name when none is given
    pub const NAME: &str = "mthread";
    /// 0 = OS default stack
    pub const STACK_SIZE: usize = 0;
    /// Sleep between retries when drop finds a stop in flight
    pub const DROP_SPIN_MS: u64 = 1;
}

#[derive(Debug, Clone)]
pub struct ThreadConfig {
    /// OS-visible name (truncated to the platform limit)
    pub name: String,
    /// Requested stack size, 0 = OS default
    pub stack_size: usize,
    /// Policy/priority committed at the next start
    pub scheduling: Option<SchedulingSpec>,
    /// Bounded sleep used while drop waits out a concurrent stop
    pub drop_spin_interval: Duration,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ThreadConfig {
    /// Defaults with environment overrides:
    /// - `MTHREAD_STACK_SIZE` - stack size in bytes
    /// - `MTHREAD_DROP_SPIN_MS` - drop retry interval in milliseconds
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides read through `lookup` (same keys as `from_env`)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            name: defaults::NAME.to_string(),
            stack_size: parse_opt(lookup("MTHREAD_STACK_SIZE").as_deref())
                .unwrap_or(defaults::STACK_SIZE),
            scheduling: None,
            drop_spin_interval: parse_ms(
                lookup("MTHREAD_DROP_SPIN_MS").as_deref(),
                Duration::from_millis(defaults::DROP_SPIN_MS),
            ),
        }
    }

    /// Library defaults only, no environment
    pub fn new() -> Self {
        Self {
            name: defaults::NAME.to_string(),
            stack_size: defaults::STACK_SIZE,
            scheduling: None,
            drop_spin_interval: Duration::from_millis(defaults::DROP_SPIN_MS),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    /// Like `stack_size`, but 0 keeps the configured value
    pub fn override_stack_size(self, size: usize) -> Self {
        if size == 0 {
            self
        } else {
            self.stack_size(size)
        }
    }

    pub fn scheduling(mut self, policy: SchedPolicy, priority: i32) -> Self {
        self.scheduling = Some(SchedulingSpec::new(policy, priority));
        self
    }

    pub fn drop_spin_interval(mut self, d: Duration) -> Self {
        self.drop_spin_interval = d;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue("name must not be empty"));
        }
        if self.stack_size != 0 && self.stack_size < libc::PTHREAD_STACK_MIN {
            return Err(ConfigError::InvalidValue(
                "stack_size must be 0 or >= PTHREAD_STACK_MIN",
            ));
        }
        if self.drop_spin_interval.is_zero() {
            return Err(ConfigError::InvalidValue("drop_spin_interval must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid thread config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
