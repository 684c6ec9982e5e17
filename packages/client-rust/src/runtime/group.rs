//! Worker-group runtime: one connection plus one worker per enabled task list.

use std::sync::Arc;
use std::time::Duration;

use flowgate_core::{GroupConfig, Registration, Transport};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::connection::{ConnectionBuilder, ConnectionHandle};
use super::worker::{WorkerFactory, WorkerHandle, WorkerOptions};
use crate::config::ClientOptions;
use crate::error::StartError;
use crate::observability::DiagnosticLogger;

/// Owns one group's connection and the workers started on it.
///
/// Start is not transactional: if a worker fails to start, the workers
/// started before it keep running until [`WorkerGroupRuntime::shutdown`].
pub struct WorkerGroupRuntime {
    group: GroupConfig,
    connection: ConnectionBuilder,
    factory: Arc<dyn WorkerFactory>,
    logger: DiagnosticLogger,
    registrations: Arc<[Registration]>,
    stop_timeout: Duration,
    span: tracing::Span,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl WorkerGroupRuntime {
    pub fn new(
        group: GroupConfig,
        transport: Arc<dyn Transport>,
        factory: Arc<dyn WorkerFactory>,
        logger: DiagnosticLogger,
        registrations: Arc<[Registration]>,
        options: &ClientOptions,
    ) -> Self {
        let span = info_span!("worker_group", group = %group.name, domain = %group.domain);
        Self {
            connection: ConnectionBuilder::new(group.clone(), transport, options.clone(), logger),
            group,
            factory,
            logger,
            registrations,
            stop_timeout: options.worker_stop_timeout,
            span,
            workers: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.group.name
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.group.domain
    }

    #[must_use]
    pub fn host_port(&self) -> &str {
        &self.group.host_port
    }

    /// The group's connection, once start has built it.
    #[must_use]
    pub fn connection(&self) -> Option<&Arc<ConnectionHandle>> {
        self.connection.get()
    }

    /// Task lists of the workers currently running, in start order.
    #[must_use]
    pub fn task_lists(&self) -> Vec<String> {
        self.workers
            .lock()
            .iter()
            .map(|w| w.task_list().to_string())
            .collect()
    }

    /// Builds the connection, then starts one worker per enabled task list.
    ///
    /// Stops early once `stop` fires. Whatever start had acquired by then is
    /// either released here (a half-built connection, a worker whose start
    /// was in flight) or recorded for [`WorkerGroupRuntime::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns [`StartError::Connection`] if the connection cannot be built,
    /// the first worker creation/start failure naming the task list, or
    /// [`StartError::Interrupted`].
    pub async fn start(&self, stop: &CancellationToken) -> Result<(), StartError> {
        self.start_inner(stop).instrument(self.span.clone()).await
    }

    async fn start_inner(&self, stop: &CancellationToken) -> Result<(), StartError> {
        let connection = self.connection.build(stop).await?;

        for worker in &self.group.workers {
            if worker.disabled {
                warn!(task_list = %worker.task_list, "worker is disabled - skipping");
                continue;
            }
            if stop.is_cancelled() {
                return Err(self.interrupted());
            }

            let options = WorkerOptions {
                pollers: worker.pollers(),
                span: self.span.clone(),
                metrics: connection.metrics().clone(),
                logger: self.logger,
                registrations: Arc::clone(&self.registrations),
            };
            let mut handle = self
                .factory
                .new_worker(
                    connection.service(),
                    &self.group.domain,
                    &worker.task_list,
                    options,
                )
                .map_err(|source| StartError::CreateWorker {
                    group: self.group.name.clone(),
                    task_list: worker.task_list.clone(),
                    source,
                })?;

            let started = tokio::select! {
                res = handle.start() => Some(res),
                () = stop.cancelled() => None,
            };
            let Some(started) = started else {
                // The poller may be partly up; stop it before giving up.
                WorkerHandle::new(worker.task_list.clone(), handle)
                    .stop(self.stop_timeout)
                    .await;
                return Err(self.interrupted());
            };
            started.map_err(|source| {
                self.logger.remote_error("failed to start worker", &source);
                StartError::StartWorker {
                    group: self.group.name.clone(),
                    task_list: worker.task_list.clone(),
                    source,
                }
            })?;

            connection.metrics().worker_started(&worker.task_list);
            info!(task_list = %worker.task_list, pollers = worker.pollers(), "worker started");
            self.workers
                .lock()
                .push(WorkerHandle::new(worker.task_list.clone(), handle));
        }
        Ok(())
    }

    fn interrupted(&self) -> StartError {
        StartError::Interrupted {
            group: self.group.name.clone(),
        }
    }

    /// Stops every running worker one by one, each bounded by the stop
    /// timeout, then stops the dispatcher. Signals `done` exactly once, also
    /// when nothing was running.
    pub async fn shutdown(&self, done: oneshot::Sender<()>) {
        let workers = std::mem::take(&mut *self.workers.lock());
        let count = workers.len();
        for worker in workers {
            worker.stop(self.stop_timeout).await;
        }

        if let Some(connection) = self.connection.get() {
            if let Err(err) = connection.dispatcher().stop().await {
                self.logger
                    .remote_warning("failed to stop dispatcher", &err);
            }
        }

        info!(group = %self.group.name, workers = count, "worker group stopped");
        let _ = done.send(());
    }
}

impl std::fmt::Debug for WorkerGroupRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerGroupRuntime")
            .field("group", &self.group.name)
            .field("domain", &self.group.domain)
            .field("task_lists", &self.task_lists())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
