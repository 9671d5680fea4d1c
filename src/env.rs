use std::sync::OnceLock;

/// Interpret a string value such as "1" or "no" as a boolean.
pub fn str_as_bool(s: &str) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => true,
        "0" | "false" | "f" | "no" | "n" | "off" | "" => false,
        _ => {
            eprintln!("Unrecognized boolean value \"{}\"", s);
            false
        }
    }
}

/// Return whether a feature flag controlled by an environment variable is
/// enabled.
pub fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .as_ref()
        .map(|s| str_as_bool(s))
        .unwrap_or(default)
}

/// Name of the environment variable that enables diagnostic output for bulk
/// transfers and view construction.
pub const TRACE_ENV_VAR: &str = "HYPERCUBE_TRACE";

/// Return true if `HYPERCUBE_TRACE` was set when first queried.
pub fn trace_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| env_flag(TRACE_ENV_VAR, false))
}

/// Print a diagnostic message to stderr if tracing is enabled.
macro_rules! trace {
    ($($arg:tt)*) => {
        if $crate::env::trace_enabled() {
            eprintln!("[hypercube] {}", format_args!($($arg)*));
        }
    };
}

pub(crate) use trace;
