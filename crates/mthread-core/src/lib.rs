//! # mthread-core
//!
//! Core types and traits for managed OS threads.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! The pthread implementation lives in `mthread-runtime`.
//!
//! ## Modules
//!
//! - `state` - lifecycle flag word and its atomic cell
//! - `error` - result taxonomy, numeric codes and names
//! - `sched` - abstract scheduling policy and priority
//! - `traits` - the `Runnable` capability
//! - `spincell` - spin-guarded slot for side data
//! - `kprint` - leveled stderr logging macros
//! - `env` - environment variable helpers

pub mod state;
pub mod error;
pub mod sched;
pub mod traits;
pub mod spincell;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use state::{AtomicThreadState, ThreadState};
pub use error::{result_code, result_from_code, result_str, ThreadError, ThreadResult};
pub use sched::{SchedPolicy, SchedulingSpec};
pub use traits::Runnable;
pub use spincell::SpinCell;
pub use env::{env_get, env_get_bool, env_get_ms, env_get_opt, parse_bool, parse_ms, parse_opt};
