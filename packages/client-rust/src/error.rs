//! Error taxonomy of the client: connection setup, worker start, routing,
//! per-call failures and lifecycle misuse.

use flowgate_core::{ConfigError, Interrupted, RemoteError};

/// Failure while building a group's connection. Fatal to that group only.
///
/// `Clone` because the outcome of the one-time build is remembered and
/// returned to every caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("failed to create transport for client {client_name} (group {group})")]
    Transport {
        group: String,
        client_name: String,
        #[source]
        source: RemoteError,
    },
    #[error("failed to route to {host_port} (group {group})")]
    Outbound {
        group: String,
        host_port: String,
        #[source]
        source: RemoteError,
    },
    #[error("failed to start dispatcher for client {client_name} (group {group})")]
    DispatcherStart {
        group: String,
        client_name: String,
        #[source]
        source: RemoteError,
    },
    #[error("failed to derive workflow service client (group {group})")]
    ServiceClient {
        group: String,
        #[source]
        source: RemoteError,
    },
    #[error("failed to describe domain {domain} (group {group})")]
    DescribeDomain {
        group: String,
        domain: String,
        #[source]
        source: RemoteError,
    },
    #[error("connection setup interrupted by shutdown (group {group})")]
    Interrupted { group: String },
}

impl ConnectionError {
    #[must_use]
    pub fn group(&self) -> &str {
        match self {
            Self::Transport { group, .. }
            | Self::Outbound { group, .. }
            | Self::DispatcherStart { group, .. }
            | Self::ServiceClient { group, .. }
            | Self::DescribeDomain { group, .. }
            | Self::Interrupted { group } => group,
        }
    }
}

/// Failure while starting one worker group.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("failed to create worker for task list {task_list} (group {group})")]
    CreateWorker {
        group: String,
        task_list: String,
        #[source]
        source: RemoteError,
    },
    #[error("failed to start worker for task list {task_list} (group {group})")]
    StartWorker {
        group: String,
        task_list: String,
        #[source]
        source: RemoteError,
    },
    #[error("worker group start interrupted by shutdown (group {group})")]
    Interrupted { group: String },
}

impl StartError {
    /// Whether start stopped because shutdown was requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Interrupted { .. } | Self::Connection(ConnectionError::Interrupted { .. })
        )
    }
}

/// No connection owns the requested task list, or the task list could not be
/// determined for the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("task list not registered in application config: {task_list}")]
    UnknownTaskList { task_list: String },
    #[error("no task list given and context key `{key}` is not set")]
    MissingRoutingKey { key: &'static str },
    #[error("context key `{key}` must hold a string, found {found}")]
    MalformedRoutingKey { key: &'static str, found: String },
}

/// Error returned by a single workflow operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("operation cancelled by caller")]
    Cancelled,
    #[error("workflow client is not running")]
    NotRunning,
    #[error("cannot {operation} - no-op workflow api")]
    Unsupported { operation: &'static str },
}

impl From<Interrupted> for ClientError {
    fn from(err: Interrupted) -> Self {
        match err {
            Interrupted::Timeout(d) => Self::Timeout {
                timeout_ms: u64::try_from(d.as_millis()).unwrap_or(u64::MAX),
            },
            Interrupted::Cancelled => Self::Cancelled,
        }
    }
}

/// Misuse of the start/shutdown lifecycle, or a failed start.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("workflow client already started")]
    AlreadyStarted,
    #[error("workflow client was shut down")]
    ShutDown,
    #[error("failed to start worker group {group}")]
    GroupStart {
        group: String,
        #[source]
        source: StartError,
    },
}
