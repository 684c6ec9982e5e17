//! Diagnostic logging sink for workers and connection setup.
//!
//! Errors from the orchestration service often carry a service-side stack
//! trace that is long and rarely useful. The sink drops it unless the
//! configuration asks for it. Level filtering is left to the installed
//! subscriber.

use flowgate_core::RemoteError;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Logging sink built once at start and shared by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticLogger {
    include_stack: bool,
}

impl DiagnosticLogger {
    /// Creates a sink that keeps remote stack traces only if
    /// `include_stack` is set.
    #[must_use]
    pub fn new(include_stack: bool) -> Self {
        Self { include_stack }
    }

    #[must_use]
    pub fn includes_stack(&self) -> bool {
        self.include_stack
    }

    /// Renders a remote error for a log line, with or without its stack.
    #[must_use]
    pub fn render(&self, err: &RemoteError) -> String {
        match (&err.stack, self.include_stack) {
            (Some(stack), true) => format!("{err}\n{stack}"),
            _ => err.to_string(),
        }
    }

    pub fn remote_error(&self, what: &str, err: &RemoteError) {
        error!(kind = %err.kind, "{what}: {}", self.render(err));
    }

    pub fn remote_warning(&self, what: &str, err: &RemoteError) {
        warn!(kind = %err.kind, "{what}: {}", self.render(err));
    }
}

impl Default for DiagnosticLogger {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Installs the global `tracing` subscriber for binaries.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Does nothing if a
/// subscriber is already installed.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
