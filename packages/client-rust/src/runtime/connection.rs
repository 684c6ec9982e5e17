//! Per-group connection building.
//!
//! A group's dispatcher is dialed at most once per process. Concurrent first
//! callers wait for the one build in flight and all of them observe the same
//! handle, or the same error: a failed build is remembered, not retried.

use std::sync::Arc;

use flowgate_core::{Dispatcher, GroupConfig, Transport, WorkflowService};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::client::{DomainClient, WorkflowClient};
use crate::config::ClientOptions;
use crate::error::ConnectionError;
use crate::observability::{DiagnosticLogger, MetricsScope};

/// Prefix of the transport client name; the group name is appended so that
/// several groups can share one process.
pub const CLIENT_NAME_PREFIX: &str = "cadence-client";

/// Logical service name of the orchestration frontend.
pub const FRONTEND_SERVICE: &str = "cadence-frontend";

/// Transport client name for `group`.
#[must_use]
pub fn client_name(group: &str) -> String {
    format!("{CLIENT_NAME_PREFIX}_{group}")
}

// ---------------------------------------------------------------------------
// ConnectionHandle
// ---------------------------------------------------------------------------

/// Everything built for one group: the started dispatcher, the service client
/// and the two clients derived from it, plus the group's metrics scope.
///
/// Shared read-only by the group's workers and every call routed to it.
pub struct ConnectionHandle {
    dispatcher: Box<dyn Dispatcher>,
    service: Arc<dyn WorkflowService>,
    client: WorkflowClient,
    domains: DomainClient,
    metrics: MetricsScope,
}

impl ConnectionHandle {
    #[must_use]
    pub fn service(&self) -> Arc<dyn WorkflowService> {
        Arc::clone(&self.service)
    }

    #[must_use]
    pub fn client(&self) -> &WorkflowClient {
        &self.client
    }

    #[must_use]
    pub fn domains(&self) -> &DomainClient {
        &self.domains
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsScope {
        &self.metrics
    }

    pub(crate) fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("client", &self.client)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ConnectionBuilder
// ---------------------------------------------------------------------------

/// Builds a group's [`ConnectionHandle`] exactly once.
pub struct ConnectionBuilder {
    group: GroupConfig,
    transport: Arc<dyn Transport>,
    options: ClientOptions,
    logger: DiagnosticLogger,
    built: OnceCell<Result<Arc<ConnectionHandle>, ConnectionError>>,
}

impl ConnectionBuilder {
    pub fn new(
        group: GroupConfig,
        transport: Arc<dyn Transport>,
        options: ClientOptions,
        logger: DiagnosticLogger,
    ) -> Self {
        Self {
            group,
            transport,
            options,
            logger,
            built: OnceCell::new(),
        }
    }

    /// Returns the group's connection, building it on first use.
    ///
    /// The first caller's `stop` token governs the build: if it fires while
    /// the dispatcher is starting or the domain is being described, the
    /// dispatcher is stopped before the build returns.
    ///
    /// # Errors
    ///
    /// Returns the [`ConnectionError`] of the one build attempt, to this and
    /// every later caller.
    pub async fn build(
        &self,
        stop: &CancellationToken,
    ) -> Result<Arc<ConnectionHandle>, ConnectionError> {
        self.built.get_or_init(|| self.connect(stop)).await.clone()
    }

    /// The connection if a build has completed successfully.
    #[must_use]
    pub fn get(&self) -> Option<&Arc<ConnectionHandle>> {
        self.built.get().and_then(|res| res.as_ref().ok())
    }

    async fn connect(
        &self,
        stop: &CancellationToken,
    ) -> Result<Arc<ConnectionHandle>, ConnectionError> {
        let group = &self.group.name;
        let client_name = client_name(group);
        let interrupted = || ConnectionError::Interrupted {
            group: group.clone(),
        };
        if stop.is_cancelled() {
            return Err(interrupted());
        }

        let mut dispatcher =
            self.transport
                .bind(&client_name)
                .map_err(|source| ConnectionError::Transport {
                    group: group.clone(),
                    client_name: client_name.clone(),
                    source,
                })?;

        dispatcher
            .add_outbound(FRONTEND_SERVICE, &self.group.host_port)
            .map_err(|source| ConnectionError::Outbound {
                group: group.clone(),
                host_port: self.group.host_port.clone(),
                source,
            })?;

        let started = tokio::select! {
            res = dispatcher.start() => Some(res),
            () = stop.cancelled() => None,
        };
        match started {
            Some(res) => res.map_err(|source| ConnectionError::DispatcherStart {
                group: group.clone(),
                client_name: client_name.clone(),
                source,
            })?,
            None => {
                self.release(dispatcher.as_ref(), "dispatcher start interrupted")
                    .await;
                return Err(interrupted());
            }
        }
        debug!(group = %group, client = %client_name, "dispatcher started");

        let derived = tokio::select! {
            res = self.derive(group, dispatcher.as_ref()) => Some(res),
            () = stop.cancelled() => None,
        };
        match derived {
            Some(Ok((service, domains))) => {
                info!(
                    group = %group,
                    domain = %self.group.domain,
                    host_port = %self.group.host_port,
                    "connection ready"
                );
                Ok(Arc::new(ConnectionHandle {
                    client: WorkflowClient::new(
                        Arc::clone(&service),
                        self.group.domain.clone(),
                        self.options.default_call_timeout,
                    ),
                    dispatcher,
                    service,
                    domains,
                    metrics: MetricsScope::new(group.clone(), self.group.domain.clone()),
                }))
            }
            Some(Err(err)) => {
                self.release(dispatcher.as_ref(), "connection setup failed")
                    .await;
                Err(err)
            }
            None => {
                self.release(dispatcher.as_ref(), "connection setup interrupted")
                    .await;
                Err(interrupted())
            }
        }
    }

    /// Stops a dispatcher that will never be handed out.
    async fn release(&self, dispatcher: &dyn Dispatcher, why: &str) {
        debug!(group = %self.group.name, why, "releasing dispatcher");
        if let Err(err) = dispatcher.stop().await {
            self.logger
                .remote_warning("failed to stop dispatcher after setup error", &err);
        }
    }

    async fn derive(
        &self,
        group: &str,
        dispatcher: &dyn Dispatcher,
    ) -> Result<(Arc<dyn WorkflowService>, DomainClient), ConnectionError> {
        let service = dispatcher
            .service_client(FRONTEND_SERVICE)
            .map_err(|source| ConnectionError::ServiceClient {
                group: group.to_string(),
                source,
            })?;
        let domains = DomainClient::new(Arc::clone(&service));

        if self.options.verify_domain {
            let description = domains.describe(&self.group.domain).await.map_err(|source| {
                self.logger.remote_error("failed to describe domain", &source);
                ConnectionError::DescribeDomain {
                    group: group.to_string(),
                    domain: self.group.domain.clone(),
                    source,
                }
            })?;
            debug!(group = %group, domain = %description.name, status = ?description.status, "domain verified");
        }
        Ok((service, domains))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
