use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{DomainDescription, Payload, StartWorkflowRequest, WorkflowExecution};

/// Entry point of the transport library used to reach the orchestration
/// frontend. One binding is created per worker group.
pub trait Transport: Send + Sync {
    /// Creates an unstarted dispatcher bound to `client_name`.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the binding cannot be created.
    fn bind(&self, client_name: &str) -> Result<Box<dyn Dispatcher>, RemoteError>;
}

/// A network dispatcher: outbound routes plus a start/stop lifecycle.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Routes calls for `service` to a single `host_port` endpoint.
    fn add_outbound(&mut self, service: &str, host_port: &str) -> Result<(), RemoteError>;

    /// Opens the outbound connections.
    async fn start(&mut self) -> Result<(), RemoteError>;

    /// Closes all connections. Safe to call more than once.
    async fn stop(&self) -> Result<(), RemoteError>;

    /// Derives a workflow-service client from the outbound route of `service`.
    fn service_client(&self, service: &str) -> Result<Arc<dyn WorkflowService>, RemoteError>;
}

/// RPC surface of the orchestration frontend.
#[async_trait]
pub trait WorkflowService: Send + Sync {
    async fn start_workflow(
        &self,
        request: StartWorkflowRequest,
    ) -> Result<WorkflowExecution, RemoteError>;

    /// Long-polls until the run closes and returns its result.
    async fn await_workflow_result(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
    ) -> Result<Payload, RemoteError>;

    async fn request_cancel_workflow(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
    ) -> Result<(), RemoteError>;

    async fn query_workflow(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
        query_type: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, RemoteError>;

    async fn terminate_workflow(
        &self,
        domain: &str,
        execution: &WorkflowExecution,
        reason: &str,
        details: Vec<u8>,
    ) -> Result<(), RemoteError>;

    async fn describe_domain(&self, domain: &str) -> Result<DomainDescription, RemoteError>;
}
