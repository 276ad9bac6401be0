//! # mthread-runtime
//!
//! POSIX implementation of managed threads.
//!
//! This crate provides:
//! - `ManagedThread`: start/stop/join lifecycle over one pthread
//! - Start rendezvous (pthread barrier) for synchronous start confirmation
//! - Scheduling policy/priority translation, clamping and commit
//! - Thread naming and signal delivery
//! - `ThreadConfig` with environment overrides

pub mod config;
pub mod handle;
pub mod sched;
pub mod name;
pub mod signal;
pub mod thread;

mod attr;
mod barrier;

// Re-exports
pub use config::ThreadConfig;
pub use handle::ThreadHandle;
pub use sched::{
    get_scheduling_parameters_for, priority_range, set_scheduling_parameters_for,
};
pub use name::{current_thread_name, set_current_thread_name, set_thread_name_for, thread_name_for};
pub use signal::{signal_thread, Signal};
pub use thread::ManagedThread;

// Platform detection
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod platform_linux;
        pub(crate) use platform_linux as platform;
    } else {
        compile_error!("Unsupported platform: mthread requires Linux pthreads");
    }
}

pub use platform::THREAD_NAME_MAX;
