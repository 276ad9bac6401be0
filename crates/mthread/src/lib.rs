//! # mthread - Managed OS Threads
//!
//! One pthread per instance with a lifecycle that is safe under concurrent
//! callers, without a mutex around the state.
//!
//! ## Features
//!
//! - **Safe lifecycle**: `start()`/`stop()` race-free via an atomic flag word;
//!   losers get `AlreadyStarted`/`NotRunning` instead of blocking
//! - **Confirmed start**: `start(true, ..)` returns only once the spawned
//!   context is running (two-party barrier rendezvous)
//! - **Cooperative shutdown**: `stop()` calls `Runnable::shut_down()` and joins
//! - **Scheduling**: Other/Fifo/RoundRobin/Batch/Idle with priority clamping
//! - **Naming & signals**: OS-visible names, per-thread signal delivery
//!
//! ## Quick Start
//!
//! ```ignore
//! use mthread::{ManagedThread, Runnable, ThreadResult};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Ticker {
//!     quit: AtomicBool,
//! }
//!
//! impl Runnable for Ticker {
//!     fn run(&self) -> ThreadResult<()> {
//!         while !self.quit.load(Ordering::Acquire) {
//!             std::thread::sleep(std::time::Duration::from_millis(10));
//!         }
//!         Ok(())
//!     }
//!
//!     fn shut_down(&self) -> ThreadResult<()> {
//!         self.quit.store(true, Ordering::Release);
//!         Ok(())
//!     }
//! }
//!
//! let ticker: Arc<dyn Runnable> = Arc::new(Ticker::default());
//! let thread = ManagedThread::new(Some(ticker), "ticker", 0);
//! thread.start(true, None)?;
//! // ...
//! thread.stop()?;
//! ```

// Re-export core types
pub use mthread_core::{
    result_code,
    result_from_code,
    result_str,
    Runnable,
    SchedPolicy,
    SchedulingSpec,
    ThreadError,
    ThreadResult,
    ThreadState,
};

// Re-export kprint macros for logging
pub use mthread_core::{kerror, kwarn, kinfo, kdebug, ktrace};
pub use mthread_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use mthread_core::{env_get, env_get_bool, env_get_ms, env_get_opt};

// Re-export runtime types
pub use mthread_runtime::{
    current_thread_name,
    get_scheduling_parameters_for,
    priority_range,
    set_current_thread_name,
    set_scheduling_parameters_for,
    set_thread_name_for,
    signal_thread,
    thread_name_for,
    ManagedThread,
    Signal,
    ThreadConfig,
    ThreadHandle,
    THREAD_NAME_MAX,
};
