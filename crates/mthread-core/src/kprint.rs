//! Kernel-style leveled logging to stderr
//!
//! Each line is written under the stderr lock and tagged with the calling
//! thread's tag (see `set_thread_tag`) or its std name, so output from a
//! spawned context and from the context that stops it can be told apart.
//!
//! # Environment Variables
//!
//! - `MTHREAD_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0-5). Default: warn
//! - `MTHREAD_FLUSH_EPRINT=1` - flush stderr after every line
//!
//! ```ignore
//! use mthread_core::{kdebug, kwarn};
//!
//! kdebug!("start: state={}", state);
//! kwarn!("join failed: {}", errno);
//! ```

use std::cell::RefCell;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::env::env_get_bool;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a level name or digit
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "E",
            LogLevel::Warn => "W",
            LogLevel::Info => "I",
            LogLevel::Debug => "D",
            LogLevel::Trace => "T",
        }
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static FLUSH: AtomicBool = AtomicBool::new(false);

thread_local! {
    static THREAD_TAG: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Tag log lines from the current thread. Threads spawned outside
/// `std::thread` have no std name, so the runtime tags them explicitly.
pub fn set_thread_tag(tag: &str) {
    THREAD_TAG.with(|t| *t.borrow_mut() = Some(tag.to_string()));
}

/// Read the environment once. Called lazily on first log.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Some(level) = std::env::var("MTHREAD_LOG_LEVEL")
        .ok()
        .and_then(|v| LogLevel::parse(&v))
    {
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
    FLUSH.store(env_get_bool("MTHREAD_FLUSH_EPRINT", false), Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Override the level (takes precedence over the environment)
pub fn set_log_level(level: LogLevel) {
    INITIALIZED.store(true, Ordering::SeqCst);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn set_flush_enabled(enabled: bool) {
    FLUSH.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let who = THREAD_TAG
        .with(|t| t.borrow().clone())
        .or_else(|| std::thread::current().name().map(str::to_string))
        .unwrap_or_else(|| "-".to_string());

    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    let _ = write!(out, "[{}] [{}] ", level.tag(), who);
    let _ = out.write_fmt(args);
    let _ = out.write_all(b"\n");
    if FLUSH.load(Ordering::Relaxed) {
        let _ = out.flush();
    }
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Error, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Warn, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Info, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Debug, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Trace, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("2"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::from_u8(42), LogLevel::Trace);
    }

    #[test]
    fn test_thread_tag() {
        std::thread::spawn(|| {
            set_thread_tag("worker-7");
            THREAD_TAG.with(|t| assert_eq!(t.borrow().as_deref(), Some("worker-7")));
        })
        .join()
        .unwrap();
        THREAD_TAG.with(|t| assert!(t.borrow().is_none()));
    }

    #[test]
    fn test_off_disables_everything() {
        set_log_level(LogLevel::Off);
        assert!(!level_enabled(LogLevel::Error));
        assert!(!level_enabled(LogLevel::Off));

        kerror!("suppressed {}", 1);
        kwarn!("suppressed");
        kinfo!("suppressed");
        kdebug!("suppressed");
        ktrace!("suppressed");
    }
}
