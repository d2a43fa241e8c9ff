//! Error reporting for unexpected failures.
//!
//! Internal errors are rendered to clients as a generic message; the detail
//! goes to the configured reporter instead.

use std::sync::Arc;

use tracing::{error, warn};

pub trait ErrorReporter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Records an unexpected error for the given request.
    fn report(&self, method: &str, path: &str, message: &str);
}

/// Discards reports.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn report(&self, _method: &str, _path: &str, _message: &str) {}
}

/// Writes reports to the application log at error level.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn name(&self) -> &'static str {
        "log"
    }

    fn report(&self, method: &str, path: &str, message: &str) {
        error!(method, path, "Unexpected error: {}", message);
    }
}

pub fn is_registered(name: &str) -> bool {
    matches!(name, "" | "noop" | "log")
}

/// Looks up a reporter by configuration name. Unknown names fall back to the
/// noop reporter.
pub fn get_reporter(name: &str) -> Arc<dyn ErrorReporter> {
    match name {
        "log" => Arc::new(LogReporter),
        "" | "noop" => Arc::new(NoopReporter),
        other => {
            warn!("Unknown error reporter {}, using the noop reporter", other);
            Arc::new(NoopReporter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        assert!(is_registered("log"));
        assert!(is_registered(""));
        assert!(!is_registered("sentry"));
        assert_eq!(get_reporter("log").name(), "log");
        assert_eq!(get_reporter("").name(), "noop");
        assert_eq!(get_reporter("sentry").name(), "noop");
    }
}
