//! Background task-list workers.
//!
//! The poller itself belongs to the orchestration SDK and is reached through
//! `WorkerFactory`/`Worker`. This module owns the handle kept for shutdown,
//! which bounds how long a single worker may take to stop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flowgate_core::{Registration, RemoteError, WorkflowService};
use tracing::{info, warn};

use crate::observability::{DiagnosticLogger, MetricsScope};

// ---------------------------------------------------------------------------
// Worker / WorkerFactory traits
// ---------------------------------------------------------------------------

/// A background poller bound to one (domain, task list) pair.
#[async_trait]
pub trait Worker: Send {
    /// Starts polling. Returns once the pollers are running.
    async fn start(&mut self) -> Result<(), RemoteError>;

    /// Stops polling and waits for in-progress tasks.
    async fn stop(&mut self);
}

/// Creates workers. Implemented by the orchestration SDK adapter.
pub trait WorkerFactory: Send + Sync {
    /// Creates an unstarted worker.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the worker cannot be constructed.
    fn new_worker(
        &self,
        service: Arc<dyn WorkflowService>,
        domain: &str,
        task_list: &str,
        options: WorkerOptions,
    ) -> Result<Box<dyn Worker>, RemoteError>;
}

/// Handles passed through to each worker. None of them is interpreted here.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Number of parallel task pollers.
    pub pollers: u32,
    /// Parent span for everything the worker records.
    pub span: tracing::Span,
    pub metrics: MetricsScope,
    pub logger: DiagnosticLogger,
    /// Workflows and activities registered before start.
    pub registrations: Arc<[Registration]>,
}

// ---------------------------------------------------------------------------
// WorkerHandle
// ---------------------------------------------------------------------------

/// A started worker, kept by its group for shutdown.
pub struct WorkerHandle {
    task_list: String,
    worker: Box<dyn Worker>,
}

impl WorkerHandle {
    pub fn new(task_list: impl Into<String>, worker: Box<dyn Worker>) -> Self {
        Self {
            task_list: task_list.into(),
            worker,
        }
    }

    #[must_use]
    pub fn task_list(&self) -> &str {
        &self.task_list
    }

    /// Stops the worker, giving up after `timeout`.
    ///
    /// Returns `true` if the worker stopped in time.
    pub async fn stop(mut self, timeout: Duration) -> bool {
        if tokio::time::timeout(timeout, self.worker.stop()).await.is_ok() {
            info!(task_list = %self.task_list, "worker stopped");
            true
        } else {
            warn!(
                task_list = %self.task_list,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "worker did not stop in time"
            );
            false
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("task_list", &self.task_list)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct SlowWorker {
        stop_delay: Duration,
        stopped: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Worker for SlowWorker {
        async fn start(&mut self) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn stop(&mut self) {
            tokio::time::sleep(self.stop_delay).await;
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn stop_within_timeout() {
        let stopped = Arc::new(AtomicU32::new(0));
        let handle = WorkerHandle::new(
            "orders",
            Box::new(SlowWorker {
                stop_delay: Duration::from_millis(5),
                stopped: stopped.clone(),
            }),
        );
        assert_eq!(handle.task_list(), "orders");

        assert!(handle.stop(Duration::from_secs(1)).await);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_gives_up_after_timeout() {
        let stopped = Arc::new(AtomicU32::new(0));
        let handle = WorkerHandle::new(
            "orders",
            Box::new(SlowWorker {
                stop_delay: Duration::from_secs(60),
                stopped: stopped.clone(),
            }),
        );

        assert!(!handle.stop(Duration::from_millis(20)).await);
        assert_eq!(stopped.load(Ordering::SeqCst), 0);
    }
}
