//! Basic managed thread example
//!
//! Starts a cooperative worker with confirmed start, inspects its name,
//! moves it between scheduling policies, then stops it and reports the
//! run result.
//!
//! # Environment Variables
//!
//! - `MTHREAD_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `MTHREAD_FLUSH_EPRINT=1` - Flush log output immediately
//! - `MTHREAD_STACK_SIZE=<bytes>` - Stack size for the worker

use mthread::{kinfo, kwarn, result_str, ManagedThread, Runnable, SchedPolicy, ThreadConfig, ThreadResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts ticks until asked to shut down
#[derive(Default)]
struct Ticker {
    quit: AtomicBool,
    ticks: AtomicU64,
}

impl Runnable for Ticker {
    fn before_run(&self) -> ThreadResult<()> {
        kinfo!("ticker warming up");
        Ok(())
    }

    fn run(&self) -> ThreadResult<()> {
        while !self.quit.load(Ordering::Acquire) {
            self.ticks.fetch_add(1, Ordering::Relaxed);
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }

    fn after_run(&self) -> ThreadResult<()> {
        kinfo!("ticker done after {} ticks", self.ticks.load(Ordering::Relaxed));
        Ok(())
    }

    fn shut_down(&self) -> ThreadResult<()> {
        self.quit.store(true, Ordering::Release);
        Ok(())
    }
}

// MTHREAD_LOG_LEVEL=debug cargo run -p mthread-basic
fn main() {
    println!("=== Managed Thread Basic Example ===\n");

    let ticker = Arc::new(Ticker::default());
    let config = ThreadConfig::from_env().name("ticker-worker");
    let thread = ManagedThread::with_config(Some(ticker.clone() as Arc<dyn Runnable>), config);

    let r = thread.start(true, None);
    println!("start(assure_running=true) -> {}", result_str(&r));
    println!("state after start: {}", thread.state());

    match thread.os_name() {
        Ok(name) => println!("OS thread name: {}", name),
        Err(e) => kwarn!("could not read thread name: {}", e),
    }

    let r = thread.set_scheduling_parameters(SchedPolicy::Batch, 3);
    println!("set Batch/3 -> {} (clamped into range)", result_str(&r));
    if let Ok(spec) = thread.get_scheduling_parameters() {
        println!("scheduling now: {}", spec);
    }

    let r = thread.set_scheduling_parameters(SchedPolicy::Fifo, 10);
    println!("set Fifo/10 -> {}", result_str(&r));

    std::thread::sleep(Duration::from_millis(100));

    let r = thread.stop();
    println!("stop() -> {}", result_str(&r));
    println!("second stop() -> {}", result_str(&thread.stop()));
    println!("run result: {}", result_str(&thread.run_result()));
    println!("state after stop: {}", thread.state());
    println!("ticks: {}", ticker.ticks.load(Ordering::Relaxed));

    println!("\n=== Example Complete ===");
}
