//! The Runnable capability
//!
//! A `ManagedThread` drives a `Runnable` but never implements one. All four
//! callbacks take `&self`: `run()` executes in the spawned context while
//! `shut_down()` is called from whichever context calls `stop()`, so both
//! may be live at the same time. Implementations use interior mutability
//! (atomics, channels) to communicate between them.

use crate::error::ThreadResult;

/// Lifecycle callbacks executed by a managed thread
pub trait Runnable: Send + Sync {
    /// Called in the spawned context before `run()`.
    /// On error neither `run()` nor `after_run()` is called.
    fn before_run(&self) -> ThreadResult<()> {
        Ok(())
    }

    /// Main body. Must return promptly once `shut_down()` has been called;
    /// `stop()` joins without a timeout.
    fn run(&self) -> ThreadResult<()>;

    /// Called in the spawned context after `run()` whenever `before_run()`
    /// succeeded.
    fn after_run(&self) -> ThreadResult<()> {
        Ok(())
    }

    /// Cooperative cancellation request, called from the stopping context
    fn shut_down(&self) -> ThreadResult<()> {
        Ok(())
    }
}
