//! Environment variable helpers
//!
//! ```ignore
//! use mthread_core::env::{env_get, env_get_bool};
//!
//! let stack: usize = env_get("MTHREAD_STACK_SIZE", 0);
//! let flush = env_get_bool("MTHREAD_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Parse `key` as `T`, falling back to `default` when unset or unparsable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Parse `key` as `T` if it is set and valid
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    parse_opt(std::env::var(key).ok().as_deref())
}

/// Boolean flag: "1", "true", "yes", "on" (any case) are true, any other
/// value is false, unset returns `default`
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    parse_bool(std::env::var(key).ok().as_deref(), default)
}

/// Millisecond duration
#[inline]
pub fn env_get_ms(key: &str, default: Duration) -> Duration {
    parse_ms(std::env::var(key).ok().as_deref(), default)
}

// Parsers behind the `env_get*` helpers. They take the raw value so callers
// with their own source of settings (and tests) never touch the process
// environment.

/// Trimmed parse; `None` when unset or unparsable
#[inline]
pub fn parse_opt<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|v| v.trim().parse().ok())
}

#[inline]
pub fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

#[inline]
pub fn parse_ms(raw: Option<&str>, default: Duration) -> Duration {
    parse_opt::<u64>(raw).map(Duration::from_millis).unwrap_or(default)
}
