//! Managed OS thread
//!
//! A `ManagedThread` owns at most one pthread at a time and drives a bound
//! `Runnable` through it:
//!
//! ```text
//! caller                              spawned context (trampoline)
//! ------                              ----------------------------
//! start()
//!   CAS Invalid -> IS_STARTING
//!   init barrier (assure_running)
//!   set STARTED
//!   pthread_create  ----------------> name thread
//!   commit cached scheduling          set RUNNING
//!   rendezvous  <-------------------> rendezvous (winner destroys barrier)
//!   clear IS_STARTING                 before_run / run / after_run
//! ...                                 clear RUNNING
//! stop()
//!   set IS_STOPPING
//!   shut_down() if RUNNING
//!   pthread_join  <------------------ return run result
//!   reset to Invalid
//! ```
//!
//! Lifecycle state is one atomic flag word. There is no lock around it:
//! each transition is a single atomic op whose result is re-checked, and a
//! caller that loses a race gets a status back (`AlreadyStarted`,
//! `NotRunning`) instead of waiting. Cancellation is cooperative only, and
//! `stop()` joins without a timeout.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mthread_core::kprint::set_thread_tag;
use mthread_core::{
    kdebug, kerror, ktrace, kwarn, result_code, result_from_code, AtomicThreadState, Runnable,
    SchedPolicy, SchedulingSpec, SpinCell, ThreadError, ThreadResult, ThreadState,
};
use nix::errno::Errno;

use crate::attr::ThreadAttributes;
use crate::barrier::StartBarrier;
use crate::config::ThreadConfig;
use crate::handle::ThreadHandle;
use crate::name::{self as naming, truncate_name};
use crate::sched;
use crate::signal::{self, Signal};

/// Bound Runnable slot
type RunnableSlot = Option<Arc<dyn Runnable>>;

/// State shared between the owning `ManagedThread` and its spawned context
struct Inner {
    state: AtomicThreadState,

    /// Raw pthread_t, 0 when no thread exists
    handle: AtomicUsize,

    runnable: SpinCell<RunnableSlot>,
    name: SpinCell<String>,
    stack_size: usize,

    /// Clamped spec, committed now if a thread exists and at every start
    scheduling: SpinCell<Option<SchedulingSpec>>,

    /// Whether the current spawn takes part in the start rendezvous
    assure_running: AtomicBool,
    barrier: StartBarrier,

    /// Result code of the last joined run
    run_result: AtomicI32,

    /// Set by the trampoline on its way out, cleared before each spawn
    exited: AtomicBool,

    drop_spin_interval: Duration,
}

/// One OS thread with a safe start/stop/join lifecycle
///
/// `ManagedThread` is `Sync`: `start()`, `stop()` and the query methods may
/// be called concurrently from several threads (e.g. through an `Arc`).
pub struct ManagedThread {
    inner: Arc<Inner>,
}

impl ManagedThread {
    /// Create an instance bound to `runnable`.
    ///
    /// `name` is truncated silently to the OS limit. `stack_size` of 0
    /// defers to `MTHREAD_STACK_SIZE`, and to the OS default when that is
    /// unset.
    pub fn new(runnable: Option<Arc<dyn Runnable>>, name: &str, stack_size: usize) -> Self {
        let config = ThreadConfig::from_env()
            .name(name)
            .override_stack_size(stack_size);
        Self::with_config(runnable, config)
    }

    pub fn with_config(runnable: Option<Arc<dyn Runnable>>, config: ThreadConfig) -> Self {
        if let Err(e) = config.validate() {
            kwarn!("{}; start() will report the failure", e);
        }

        let scheduling = config.scheduling.and_then(|spec| match sched::clamp_to_policy(spec) {
            Ok((spec, _)) => Some(spec),
            Err(e) => {
                kwarn!("dropping scheduling {} from config: {}", spec, e);
                None
            }
        });

        ManagedThread {
            inner: Arc::new(Inner {
                state: AtomicThreadState::new(),
                handle: AtomicUsize::new(0),
                runnable: SpinCell::new(runnable),
                name: SpinCell::new(truncate_name(&config.name).to_string()),
                stack_size: config.stack_size,
                scheduling: SpinCell::new(scheduling),
                assure_running: AtomicBool::new(false),
                barrier: StartBarrier::new(),
                run_result: AtomicI32::new(0),
                exited: AtomicBool::new(false),
                drop_spin_interval: config.drop_spin_interval,
            }),
        }
    }

    /// Spawn the OS thread and run the bound Runnable on it.
    ///
    /// With `assure_running`, does not return until the spawned context has
    /// set `RUNNING` and reached the start rendezvous. `runnable`, if given,
    /// replaces the bound Runnable before spawning.
    ///
    /// A thread that exited without `stop()` is stopped (joined) first.
    pub fn start(
        &self,
        assure_running: bool,
        runnable: Option<Arc<dyn Runnable>>,
    ) -> ThreadResult<()> {
        let inner = &self.inner;

        if inner.has_exited() {
            kdebug!("start: previous run exited without stop, recovering");
            if let Err(e) = inner.stop(false) {
                kdebug!("start: recovery stop failed: {}", e);
                return Err(ThreadError::AlreadyStarted);
            }
        }

        if let Err(observed) = inner
            .state
            .compare_exchange(ThreadState::INVALID, ThreadState::IS_STARTING)
        {
            ktrace!("start refused: state={}", observed);
            return Err(ThreadError::AlreadyStarted);
        }

        let result = Inner::start_exclusive(inner, assure_running, runnable);
        inner.state.clear(ThreadState::IS_STARTING);

        match &result {
            Ok(()) => kdebug!("started (assure_running={})", assure_running),
            Err(e) if e.is_start_failure() => kdebug!("start failed: {}", e),
            Err(e) => kdebug!("start finished with {}", e),
        }
        result
    }

    /// Request cooperative shutdown and join.
    ///
    /// Idempotent under concurrent calls: exactly one caller performs the
    /// join, the others get `NotRunning`. Refuses (with `NotRunning`) while
    /// a `start()` is in flight. Blocks until `run()` returns.
    pub fn stop(&self) -> ThreadResult<()> {
        self.inner.stop(false)
    }

    /// Set policy and priority.
    ///
    /// The priority is clamped to the policy's range; a clamped request is
    /// still applied but reports `SchedulingParameterInvalid`. The values are
    /// committed now if a thread exists and cached for every later start.
    pub fn set_scheduling_parameters(&self, policy: SchedPolicy, priority: i32) -> ThreadResult<()> {
        let (spec, clamped) = sched::clamp_to_policy(SchedulingSpec::new(policy, priority))?;
        self.inner.scheduling.store(Some(spec));

        if let Some(handle) = self.handle() {
            sched::commit(handle, spec)?;
        }
        if clamped {
            return Err(ThreadError::SchedulingParameterInvalid);
        }
        Ok(())
    }

    /// Live values from the OS if a thread exists, else the cached values
    /// (`Other`/0 when nothing was set)
    pub fn get_scheduling_parameters(&self) -> ThreadResult<SchedulingSpec> {
        match self.handle() {
            Some(handle) => sched::get_scheduling_parameters_for(handle),
            None => Ok(self.inner.scheduling.load().unwrap_or_default()),
        }
    }

    /// Name as configured (already truncated)
    pub fn name(&self) -> String {
        self.inner.name.load()
    }

    /// Rename. Applied to the OS thread immediately if one exists and used
    /// for every later start.
    pub fn set_thread_name(&self, name: &str) -> ThreadResult<()> {
        let name = truncate_name(name);
        if name.is_empty() {
            return Err(ThreadError::ThreadSetNameFailed);
        }
        self.inner.name.store(name.to_string());

        match self.handle() {
            Some(handle) => naming::set_thread_name_for(handle, name),
            None => Ok(()),
        }
    }

    /// Name as the OS reports it for the spawned context
    pub fn os_name(&self) -> ThreadResult<String> {
        let handle = self.handle().ok_or(ThreadError::NotRunning)?;
        naming::thread_name_for(handle)
    }

    /// Deliver `signal` to the spawned context
    pub fn signal(&self, signal: Signal) -> ThreadResult<()> {
        let handle = self.handle().ok_or(ThreadError::NotRunning)?;
        signal::signal_thread(handle, signal)
    }

    /// Snapshot of the lifecycle flags
    #[inline]
    pub fn state(&self) -> ThreadState {
        self.inner.state.load()
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.state().contains(ThreadState::STARTED)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state().contains(ThreadState::RUNNING)
    }

    /// OS handle, present only while `STARTED`
    pub fn handle(&self) -> Option<ThreadHandle> {
        if !self.is_started() {
            return None;
        }
        match self.inner.handle.load(Ordering::SeqCst) {
            0 => None,
            raw => Some(ThreadHandle::from_raw(raw as libc::pthread_t)),
        }
    }

    /// True while the spawned context exists (it may have left its body
    /// but not yet been joined)
    pub fn is_alive(&self) -> bool {
        self.handle().map(signal::probe_thread).unwrap_or(false)
    }

    /// Outcome of the last run, known once it has been joined.
    /// The first failing callback wins.
    pub fn run_result(&self) -> ThreadResult<()> {
        result_from_code(self.inner.run_result.load(Ordering::Acquire))
    }
}

impl Inner {
    /// Started, and the spawned context has left the trampoline without
    /// anyone stopping it. STARTED alone is not enough: right after
    /// `start(false)` the context is alive but has not set RUNNING yet.
    fn has_exited(&self) -> bool {
        self.state.load().is_exited() && self.exited.load(Ordering::Acquire)
    }

    /// Body of `start()` while this caller owns `IS_STARTING`
    fn start_exclusive(
        inner: &Arc<Inner>,
        assure_running: bool,
        runnable: Option<Arc<dyn Runnable>>,
    ) -> ThreadResult<()> {
        if let Some(runnable) = runnable {
            inner.runnable.store(Some(runnable));
        }
        if inner.runnable.with(|r| r.is_none()) {
            return Err(ThreadError::ObjectInvalid);
        }

        if assure_running && !inner.barrier.is_valid() {
            inner.barrier.init()?;
        }

        let attrs = ThreadAttributes::new(inner.stack_size)?;

        inner.assure_running.store(assure_running, Ordering::Release);
        inner.run_result.store(0, Ordering::Release);
        inner.exited.store(false, Ordering::Release);

        // The trampoline's first action checks STARTED, so it must be set
        // before the thread exists
        inner.state.set(ThreadState::STARTED);

        let arg = Arc::into_raw(Arc::clone(inner)) as *mut libc::c_void;
        // Safety: plain data, written by pthread_create
        let mut raw: libc::pthread_t = unsafe { core::mem::zeroed() };
        let rc = unsafe { libc::pthread_create(&mut raw, attrs.as_ptr(), trampoline, arg) };
        if rc != 0 {
            // Safety: the thread never ran, so the reference is still ours
            drop(unsafe { Arc::from_raw(arg as *const Inner) });
            inner.state.clear(ThreadState::STARTED);
            kwarn!("pthread_create failed: {}", Errno::from_raw(rc));
            return Err(ThreadError::CreateThreadFailed);
        }
        inner.handle.store(raw as usize, Ordering::SeqCst);
        let handle = ThreadHandle::from_raw(raw);

        // Never blocks creation; only reported if nothing earlier failed
        let sched_result = match inner.scheduling.load() {
            Some(spec) => sched::commit(handle, spec),
            None => Ok(()),
        };

        let attr_result = attrs.destroy();

        let barrier_result = if assure_running {
            inner.barrier.rendezvous()
        } else {
            Ok(())
        };
        if let Err(e) = barrier_result {
            kwarn!("start rendezvous failed ({}), rolling back", e);
            if let Err(stop_err) = inner.stop(true) {
                kwarn!("rollback stop failed: {}", stop_err);
            }
        }

        attr_result.and(sched_result).and(barrier_result)
    }

    /// Stop protocol. `during_start` is set only by `start()` rolling back
    /// its own spawn: the caller then holds `IS_STARTING`, which is neither
    /// a reason to refuse nor cleared here.
    fn stop(&self, during_start: bool) -> ThreadResult<()> {
        let Some(runnable) = self.runnable.load() else {
            return Err(ThreadError::ObjectInvalid);
        };

        let refuse = |s: ThreadState| {
            s.is_invalid()
                || s.contains(ThreadState::IS_STOPPING)
                || (!during_start && s.contains(ThreadState::IS_STARTING))
        };

        let observed = self.state.load();
        if refuse(observed) {
            ktrace!("stop refused: state={}", observed);
            return Err(ThreadError::NotRunning);
        }

        let prev = self.state.set(ThreadState::IS_STOPPING);
        if prev.contains(ThreadState::IS_STOPPING) {
            ktrace!("stop refused: concurrent stop in progress");
            return Err(ThreadError::NotRunning);
        }
        if refuse(prev) {
            // A start slipped in (or the thread was stopped) since the check
            self.state.clear(ThreadState::IS_STOPPING);
            ktrace!("stop refused after set: state={}", prev);
            return Err(ThreadError::NotRunning);
        }

        let mut result = Ok(());

        if prev.contains(ThreadState::RUNNING) {
            if let Err(e) = invoke("shut_down", || runnable.shut_down()) {
                kwarn!("shut_down failed: {}, joining anyway", e);
                result = Err(ThreadError::Failed);
            }
        }

        if prev.contains(ThreadState::STARTED) {
            let raw = self.handle.load(Ordering::SeqCst) as libc::pthread_t;
            let mut retval: *mut libc::c_void = core::ptr::null_mut();
            let rc = unsafe { libc::pthread_join(raw, &mut retval) };
            if rc != 0 {
                kwarn!("pthread_join failed: {}", Errno::from_raw(rc));
                result = result.and(Err(ThreadError::JoinThreadFailed));
            } else {
                self.handle.store(0, Ordering::SeqCst);
                self.run_result
                    .store(retval as isize as i32, Ordering::Release);
                let before = self.state.clear(ThreadState::STARTED);
                assert!(
                    !before.contains(ThreadState::RUNNING),
                    "joined thread still flagged RUNNING: {}",
                    before
                );
            }
        }

        if result.is_ok() {
            let (keep, before) = if during_start {
                (ThreadState::IS_STARTING, self.state.retain(ThreadState::IS_STARTING))
            } else {
                (ThreadState::INVALID, self.state.reset())
            };
            assert_eq!(
                before.difference(keep),
                ThreadState::IS_STOPPING,
                "state did not collapse to Invalid after stop"
            );
            kdebug!("stopped");
        } else {
            self.state.clear(ThreadState::IS_STOPPING);
        }
        result
    }

    /// Everything the spawned context does. Returns the run result.
    fn run_spawned(&self) -> ThreadResult<()> {
        if !self.state.load().contains(ThreadState::STARTED) {
            kerror!("spawned context found STARTED clear");
        }

        let name = self.name.load();
        set_thread_tag(&name);
        if let Err(e) = naming::set_current_thread_name(&name) {
            kdebug!("could not name thread {:?}: {}", name, e);
        }

        let runnable = self.runnable.load();

        self.state.set(ThreadState::RUNNING);

        if self.assure_running.load(Ordering::Acquire) {
            if let Err(e) = self.barrier.rendezvous() {
                kwarn!("spawned side of start rendezvous failed: {}", e);
            }
        }

        let Some(runnable) = runnable else {
            self.state.clear(ThreadState::RUNNING);
            return Err(ThreadError::ObjectInvalid);
        };

        let mut result = invoke("before_run", || runnable.before_run());
        if result.is_ok() {
            let state = self.state.load();
            if state.contains(ThreadState::RUNNING) && !state.contains(ThreadState::IS_STOPPING) {
                result = invoke("run", || runnable.run());
            } else {
                kdebug!("stop requested before run, skipping body (state={})", state);
            }
            self.state.clear(ThreadState::RUNNING);

            let after = invoke("after_run", || runnable.after_run());
            result = result.and(after);
        }

        self.state.clear(ThreadState::RUNNING);
        result
    }
}

/// Call a Runnable callback, turning a panic into `Failed`
fn invoke(what: &str, f: impl FnOnce() -> ThreadResult<()>) -> ThreadResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            kdebug!("{} reported {}", what, e);
            Err(e)
        }
        Err(_) => {
            kerror!("{} panicked", what);
            Err(ThreadError::Failed)
        }
    }
}

/// pthread entry point. `arg` is a leaked `Arc<Inner>` owned by this thread.
extern "C" fn trampoline(arg: *mut libc::c_void) -> *mut libc::c_void {
    // Safety: start_exclusive leaked exactly one reference for us
    let inner = unsafe { Arc::from_raw(arg as *const Inner) };
    let result = panic::catch_unwind(AssertUnwindSafe(|| inner.run_spawned()))
        .unwrap_or(Err(ThreadError::Failed));
    inner.exited.store(true, Ordering::Release);
    result_code(&result) as isize as *mut libc::c_void
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        loop {
            match self.inner.stop(false) {
                Err(ThreadError::NotRunning) if self.inner.state.load().is_transitioning() => {
                    // Another party is mid start/stop; let it finish
                    std::thread::sleep(self.inner.drop_spin_interval);
                }
                Ok(()) | Err(ThreadError::NotRunning) | Err(ThreadError::ObjectInvalid) => break,
                Err(e) => {
                    kwarn!("stop during drop failed: {}", e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Instant;

    /// Runs until shut_down()
    #[derive(Default)]
    struct Looper {
        quit: AtomicBool,
        runs: AtomicUsize,
        live: AtomicUsize,
        max_live: AtomicUsize,
        exited: AtomicBool,
    }

    impl Runnable for Looper {
        fn run(&self) -> ThreadResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(now, Ordering::SeqCst);
            while !self.quit.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.exited.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn shut_down(&self) -> ThreadResult<()> {
            self.quit.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Sets `a` in before_run, one pass through the body, `b` in after_run
    #[derive(Default)]
    struct Flags {
        a: AtomicBool,
        b: AtomicBool,
        body: AtomicUsize,
    }

    impl Runnable for Flags {
        fn before_run(&self) -> ThreadResult<()> {
            self.a.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn run(&self) -> ThreadResult<()> {
            self.body.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn after_run(&self) -> ThreadResult<()> {
            self.b.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails in the configured callback
    struct Failing {
        fail_before: bool,
        panic_in_run: bool,
        ran: AtomicBool,
        after: AtomicBool,
    }

    impl Failing {
        fn new(fail_before: bool, panic_in_run: bool) -> Self {
            Self {
                fail_before,
                panic_in_run,
                ran: AtomicBool::new(false),
                after: AtomicBool::new(false),
            }
        }
    }

    impl Runnable for Failing {
        fn before_run(&self) -> ThreadResult<()> {
            if self.fail_before {
                return Err(ThreadError::Failed);
            }
            Ok(())
        }

        fn run(&self) -> ThreadResult<()> {
            self.ran.store(true, Ordering::SeqCst);
            if self.panic_in_run {
                panic!("run blew up");
            }
            Err(ThreadError::Failed)
        }

        fn after_run(&self) -> ThreadResult<()> {
            self.after.store(true, Ordering::SeqCst);
            Err(ThreadError::SignalFailed)
        }
    }

    fn bind<R: Runnable + 'static>(r: &Arc<R>) -> Option<Arc<dyn Runnable>> {
        Some(Arc::clone(r) as Arc<dyn Runnable>)
    }

    fn wait_until(what: &str, f: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !f() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_flags_scenario() {
        let flags = Arc::new(Flags::default());
        let t = ManagedThread::new(bind(&flags), "flags", 0);

        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.stop(), Ok(()));

        assert!(flags.a.load(Ordering::SeqCst));
        assert!(flags.b.load(Ordering::SeqCst));
        assert_eq!(flags.body.load(Ordering::SeqCst), 1);
        assert!(t.state().is_invalid());
        assert_eq!(t.run_result(), Ok(()));
    }

    #[test]
    fn test_stop_never_started() {
        let t = ManagedThread::new(bind(&Arc::new(Looper::default())), "idle", 0);
        assert_eq!(t.stop(), Err(ThreadError::NotRunning));
        assert!(t.state().is_invalid());
        assert!(t.handle().is_none());
    }

    #[test]
    fn test_unbound_runnable() {
        let t = ManagedThread::new(None, "unbound", 0);
        assert_eq!(t.stop(), Err(ThreadError::ObjectInvalid));
        assert_eq!(t.start(true, None), Err(ThreadError::ObjectInvalid));
        assert!(t.state().is_invalid());

        // Binding through start works
        let looper = Arc::new(Looper::default());
        assert_eq!(t.start(true, bind(&looper)), Ok(()));
        assert_eq!(t.stop(), Ok(()));
        assert_eq!(looper.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_assure_running_waits_for_spawned_context() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "assure", 0);

        assert_eq!(t.start(true, None), Ok(()));
        let state = t.state();
        assert!(state.contains(ThreadState::STARTED));
        assert!(state.contains(ThreadState::RUNNING));
        assert!(!state.contains(ThreadState::IS_STARTING));
        assert!(t.is_alive());

        assert_eq!(t.stop(), Ok(()));
        assert!(looper.exited.load(Ordering::SeqCst));
        assert!(!t.is_alive());
    }

    #[test]
    fn test_start_without_assure_then_stop() {
        for _ in 0..20 {
            let looper = Arc::new(Looper::default());
            let t = ManagedThread::new(bind(&looper), "no-assure", 0);
            assert_eq!(t.start(false, None), Ok(()));
            // May land before the spawned context sets RUNNING; either way
            // stop must join cleanly
            assert_eq!(t.stop(), Ok(()));
            assert!(t.state().is_invalid());
            assert!(looper.runs.load(Ordering::SeqCst) <= 1);
        }
    }

    #[test]
    fn test_double_start_rejected() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "double", 0);
        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.start(true, None), Err(ThreadError::AlreadyStarted));
        assert_eq!(t.stop(), Ok(()));
        assert_eq!(looper.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restart_after_stop() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "restart", 0);
        for _ in 0..3 {
            looper.quit.store(false, Ordering::SeqCst);
            assert_eq!(t.start(true, None), Ok(()));
            assert_eq!(t.stop(), Ok(()));
        }
        assert_eq!(looper.runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_auto_recover_exited_thread() {
        let flags = Arc::new(Flags::default());
        let t = ManagedThread::new(bind(&flags), "recover", 0);

        assert_eq!(t.start(true, None), Ok(()));
        wait_until("run to exit", || t.inner.has_exited());

        // Previous run left STARTED behind; start joins it first
        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.stop(), Ok(()));
        assert_eq!(flags.body.load(Ordering::SeqCst), 2);
        assert!(t.state().is_invalid());
    }

    #[test]
    fn test_concurrent_stop_single_joiner() {
        for _ in 0..20 {
            let looper = Arc::new(Looper::default());
            let t = Arc::new(ManagedThread::new(bind(&looper), "dual-stop", 0));
            assert_eq!(t.start(true, None), Ok(()));

            let gate = Arc::new(Barrier::new(2));
            let stoppers: Vec<_> = (0..2)
                .map(|_| {
                    let t = Arc::clone(&t);
                    let gate = Arc::clone(&gate);
                    thread::spawn(move || {
                        gate.wait();
                        t.stop()
                    })
                })
                .collect();
            let results: Vec<_> = stoppers.into_iter().map(|h| h.join().unwrap()).collect();

            let ok = results.iter().filter(|r| r.is_ok()).count();
            let not_running = results
                .iter()
                .filter(|r| **r == Err(ThreadError::NotRunning))
                .count();
            assert_eq!((ok, not_running), (1, 1), "{:?}", results);
            assert!(t.state().is_invalid());
        }
    }

    #[test]
    fn test_concurrent_start_single_context() {
        let looper = Arc::new(Looper::default());
        let t = Arc::new(ManagedThread::new(bind(&looper), "race-start", 0));

        let gate = Arc::new(Barrier::new(4));
        let starters: Vec<_> = (0..4)
            .map(|_| {
                let t = Arc::clone(&t);
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    gate.wait();
                    t.start(true, None)
                })
            })
            .collect();
        let results: Vec<_> = starters.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{:?}", results);
        assert!(results
            .iter()
            .all(|r| matches!(r, Ok(()) | Err(ThreadError::AlreadyStarted))));

        assert_eq!(t.stop(), Ok(()));
        assert_eq!(looper.max_live.load(Ordering::SeqCst), 1);
        assert_eq!(looper.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_waits_for_cooperative_shutdown() {
        let looper = Arc::new(Looper::default());
        {
            let t = ManagedThread::new(bind(&looper), "dropper", 0);
            assert_eq!(t.start(true, None), Ok(()));
        }
        assert!(looper.quit.load(Ordering::SeqCst));
        assert!(looper.exited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_run_failure_recorded() {
        let r = Arc::new(Failing::new(false, false));
        let t = ManagedThread::new(bind(&r), "fails", 0);
        assert_eq!(t.start(true, None), Ok(()));
        wait_until("run to exit", || !t.is_running());
        assert_eq!(t.stop(), Ok(()));

        assert!(r.ran.load(Ordering::SeqCst));
        assert!(r.after.load(Ordering::SeqCst));
        // run's failure wins over after_run's
        assert_eq!(t.run_result(), Err(ThreadError::Failed));
    }

    #[test]
    fn test_before_run_failure_skips_body() {
        let r = Arc::new(Failing::new(true, false));
        let t = ManagedThread::new(bind(&r), "no-body", 0);
        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.stop(), Ok(()));

        assert!(!r.ran.load(Ordering::SeqCst));
        assert!(!r.after.load(Ordering::SeqCst));
        assert_eq!(t.run_result(), Err(ThreadError::Failed));
    }

    #[test]
    fn test_panic_in_run_is_contained() {
        let r = Arc::new(Failing::new(false, true));
        let t = ManagedThread::new(bind(&r), "panics", 0);
        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.stop(), Ok(()));
        assert_eq!(t.run_result(), Err(ThreadError::Failed));
        assert!(r.after.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stack_size() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "big-stack", 1 << 20);
        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.stop(), Ok(()));

        let t = ManagedThread::new(bind(&looper), "tiny-stack", 1);
        assert_eq!(t.start(true, None), Err(ThreadError::InitAttributeFailed));
        assert!(t.state().is_invalid());
        assert_eq!(t.stop(), Err(ThreadError::NotRunning));
    }

    #[test]
    fn test_names() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "a-really-long-thread-name", 0);
        assert_eq!(t.name(), "a-really-long-t");
        assert_eq!(t.os_name(), Err(ThreadError::NotRunning));
        assert_eq!(t.set_thread_name(""), Err(ThreadError::ThreadSetNameFailed));

        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.os_name().unwrap(), "a-really-long-t");

        assert_eq!(t.set_thread_name("renamed"), Ok(()));
        assert_eq!(t.name(), "renamed");
        assert_eq!(t.os_name().unwrap(), "renamed");
        assert_eq!(t.stop(), Ok(()));
    }

    #[test]
    fn test_scheduling_cached_before_start() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "sched", 0);

        assert_eq!(
            t.set_scheduling_parameters(SchedPolicy::Batch, 5),
            Err(ThreadError::SchedulingParameterInvalid)
        );
        assert_eq!(
            t.get_scheduling_parameters(),
            Ok(SchedulingSpec::new(SchedPolicy::Batch, 0))
        );

        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(
            t.get_scheduling_parameters(),
            Ok(SchedulingSpec::new(SchedPolicy::Batch, 0))
        );

        assert_eq!(t.set_scheduling_parameters(SchedPolicy::Other, 0), Ok(()));
        assert_eq!(
            t.get_scheduling_parameters(),
            Ok(SchedulingSpec::new(SchedPolicy::Other, 0))
        );
        assert_eq!(t.stop(), Ok(()));
    }

    #[test]
    fn test_realtime_clamp_on_live_thread() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "rt", 0);
        assert_eq!(t.start(true, None), Ok(()));

        let r = t.set_scheduling_parameters(SchedPolicy::Fifo, 10_000);
        assert!(
            matches!(
                r,
                Err(ThreadError::SchedulingParameterInvalid)
                    | Err(ThreadError::SchedulePriorityNotPermitted)
            ),
            "{:?}",
            r
        );
        assert_eq!(t.stop(), Ok(()));
    }

    #[test]
    fn test_not_permitted_commit_does_not_block_start() {
        let looper = Arc::new(Looper::default());
        let (_, max) = sched::priority_range(SchedPolicy::Fifo).unwrap();
        let config = ThreadConfig::new().name("rt-start").scheduling(SchedPolicy::Fifo, max);
        let t = ManagedThread::with_config(bind(&looper), config);

        let r = t.start(true, None);
        assert!(
            matches!(r, Ok(()) | Err(ThreadError::SchedulePriorityNotPermitted)),
            "{:?}",
            r
        );
        // The thread exists either way
        assert!(t.is_running());
        assert_eq!(t.stop(), Ok(()));
    }

    #[test]
    fn test_signal() {
        use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet};

        static SEEN: AtomicUsize = AtomicUsize::new(0);
        extern "C" fn on_usr2(_: libc::c_int) {
            SEEN.fetch_add(1, Ordering::SeqCst);
        }

        let action = SigAction::new(SigHandler::Handler(on_usr2), SaFlags::SA_RESTART, SigSet::empty());
        unsafe { sigaction(Signal::SIGUSR2, &action) }.unwrap();

        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "signalled", 0);
        assert_eq!(t.signal(Signal::SIGUSR2), Err(ThreadError::NotRunning));

        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.signal(Signal::SIGUSR2), Ok(()));
        wait_until("signal delivery", || SEEN.load(Ordering::SeqCst) > 0);
        assert_eq!(t.stop(), Ok(()));
    }

    #[test]
    fn test_second_start_on_live_thread_rejected() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "live-restart", 0);

        for _ in 0..200 {
            looper.quit.store(false, Ordering::SeqCst);
            assert_eq!(t.start(false, None), Ok(()));
            // The spawned context may not have set RUNNING yet, but it is
            // alive and must not be replaced
            assert_eq!(t.start(false, None), Err(ThreadError::AlreadyStarted));
            assert_eq!(t.stop(), Ok(()));
            assert!(t.state().is_invalid());
        }
        assert_eq!(looper.max_live.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_create_failure_leaves_instance_reusable() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "huge", 1usize << 46);

        assert_eq!(t.start(true, None), Err(ThreadError::CreateThreadFailed));
        assert!(t.state().is_invalid());
        assert!(t.handle().is_none());
        assert_eq!(t.stop(), Err(ThreadError::NotRunning));

        // Nothing left claimed: the next attempt runs the full path again
        assert_eq!(t.start(false, None), Err(ThreadError::CreateThreadFailed));
        assert!(t.state().is_invalid());
        assert_eq!(looper.runs.load(Ordering::SeqCst), 0);

        let t = ManagedThread::new(bind(&looper), "normal", 0);
        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.stop(), Ok(()));
        assert_eq!(looper.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rollback_stop_keeps_starting_flag() {
        let looper = Arc::new(Looper::default());
        let t = ManagedThread::new(bind(&looper), "rollback", 0);
        assert_eq!(t.start(true, None), Ok(()));

        // As seen by start() when its rendezvous fails
        t.inner.state.set(ThreadState::IS_STARTING);
        assert_eq!(t.stop(), Err(ThreadError::NotRunning));
        assert!(t.is_running());

        assert_eq!(t.inner.stop(true), Ok(()));
        assert_eq!(t.state(), ThreadState::IS_STARTING);
        assert!(looper.exited.load(Ordering::SeqCst));
        assert!(t.handle().is_none());

        t.inner.state.clear(ThreadState::IS_STARTING);
        assert!(t.state().is_invalid());

        looper.quit.store(false, Ordering::SeqCst);
        assert_eq!(t.start(true, None), Ok(()));
        assert_eq!(t.stop(), Ok(()));
        assert_eq!(looper.runs.load(Ordering::SeqCst), 2);
    }
}
