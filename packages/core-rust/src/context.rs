use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Reserved context key carrying the target task list for operations whose
/// natural parameters omit it (cancel, query, terminate).
pub const TASK_LIST_FOR_ACTION: &str = "__task_list_for_action__";

/// Per-call context: request timeout, caller cancellation and opaque values.
///
/// Independent of the subsystem lifecycle: cancelling an operation context
/// aborts only the call it was passed to.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    timeout: Option<Duration>,
    cancellation: CancellationToken,
    values: HashMap<String, Value>,
}

/// Why a call did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("call cancelled by caller")]
    Cancelled,
}

impl OperationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ties this context to an external cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Sets the reserved routing key to `task_list`.
    #[must_use]
    pub fn with_task_list(self, task_list: impl Into<String>) -> Self {
        self.with_value(TASK_LIST_FOR_ACTION, Value::String(task_list.into()))
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Raw value under [`TASK_LIST_FOR_ACTION`], not type-checked.
    #[must_use]
    pub fn task_list_for_action(&self) -> Option<&Value> {
        self.value(TASK_LIST_FOR_ACTION)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Drives `fut` to completion unless the context is cancelled or the
    /// timeout elapses. `default_timeout` applies when no timeout was set.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the call was cut short.
    pub async fn run<F, T>(&self, default_timeout: Duration, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        let timeout = self.timeout.unwrap_or(default_timeout);
        tokio::select! {
            () = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
            res = tokio::time::timeout(timeout, fut) => res.map_err(|_| Interrupted::Timeout(timeout)),
        }
    }
}
