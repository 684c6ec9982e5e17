//! Error types shared by the configuration model and the remote collaborators.

use std::fmt;

/// Configuration rejected by [`RootConfig::validate`](crate::RootConfig::validate).
///
/// Every variant names the offending group or task list so the failure can be
/// traced back to a single entry of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("worker groups are empty")]
    NoWorkerGroups,
    #[error("task list is duplicated: {task_list}")]
    DuplicateTaskList { task_list: String },
    #[error("domain is empty for worker group {group}")]
    EmptyDomain { group: String },
    #[error("host_port is empty for worker group {group}")]
    EmptyHostPort { group: String },
    #[error("workers are empty for worker group {group}")]
    NoWorkers { group: String },
    #[error("task list is empty in worker group {group}")]
    EmptyTaskList { group: String },
    #[error("worker_count {count} is negative for task list {task_list}")]
    NegativeWorkerCount { task_list: String, count: i32 },
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// Classification of a failure reported by the orchestration service or its
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The transport could not be created, started, or reached the endpoint.
    Transport,
    /// The referenced domain, workflow, or run does not exist.
    NotFound,
    /// A workflow with the same ID is already running.
    AlreadyStarted,
    /// The request was rejected as malformed.
    InvalidArgument,
    /// Any other service-side failure.
    Internal,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport error",
            Self::NotFound => "not found",
            Self::AlreadyStarted => "already started",
            Self::InvalidArgument => "invalid argument",
            Self::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Error returned by the orchestration service, passed through to callers
/// unmodified.
///
/// `Clone` so that a remembered connection failure can be handed to every
/// caller that observes it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
    /// Service-side stack trace, if the service attached one.
    pub stack: Option<String>,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: None,
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_omits_stack() {
        let err = RemoteError::not_found("domain d1").with_stack("at frontend.go:42");
        assert_eq!(err.to_string(), "not found: domain d1");
        assert_eq!(err.stack.as_deref(), Some("at frontend.go:42"));
    }

    #[test]
    fn config_error_names_offender() {
        let err = ConfigError::DuplicateTaskList {
            task_list: "orders".to_string(),
        };
        assert_eq!(err.to_string(), "task list is duplicated: orders");
    }
}
