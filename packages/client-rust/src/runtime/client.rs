//! Clients derived from a group's workflow-service connection.
//!
//! `WorkflowClient` binds the service to the group's domain and is what routed
//! calls are forwarded to. `DomainClient` covers domain management.

use std::sync::Arc;
use std::time::Duration;

use flowgate_core::{
    DomainDescription, OperationContext, Payload, RemoteError, StartWorkflowOptions,
    StartWorkflowRequest, WorkflowExecution, WorkflowService, WorkflowType,
};
use uuid::Uuid;

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// WorkflowClient
// ---------------------------------------------------------------------------

/// Workflow operations against one domain.
///
/// Each call honors the operation context's timeout and cancellation;
/// service errors are returned unchanged as [`ClientError::Remote`].
#[derive(Clone)]
pub struct WorkflowClient {
    service: Arc<dyn WorkflowService>,
    domain: String,
    default_timeout: Duration,
}

impl WorkflowClient {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        domain: impl Into<String>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            service,
            domain: domain.into(),
            default_timeout,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Starts a workflow and returns its execution identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Remote`] on service failure, or `Timeout` /
    /// `Cancelled` if the context cuts the call short.
    pub async fn start_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<WorkflowExecution, ClientError> {
        let workflow_id = if options.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            options.id.clone()
        };
        let request = StartWorkflowRequest {
            domain: self.domain.clone(),
            request_id: Uuid::new_v4().to_string(),
            workflow_id,
            workflow_type: workflow.clone(),
            task_list: options.task_list.clone(),
            input: args,
            execution_start_to_close_timeout: options.execution_start_to_close_timeout,
            decision_task_start_to_close_timeout: options.decision_task_start_to_close_timeout,
        };
        Ok(ctx
            .run(self.default_timeout, self.service.start_workflow(request))
            .await??)
    }

    /// Starts a workflow and returns a handle to await its result.
    ///
    /// # Errors
    ///
    /// Same as [`WorkflowClient::start_workflow`].
    pub async fn execute_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<RunHandle, ClientError> {
        let execution = self.start_workflow(ctx, options, workflow, args).await?;
        Ok(RunHandle {
            execution,
            client: self.clone(),
        })
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Remote`] on service failure, or `Timeout` /
    /// `Cancelled`.
    pub async fn cancel_workflow(
        &self,
        ctx: &OperationContext,
        execution: &WorkflowExecution,
    ) -> Result<(), ClientError> {
        Ok(ctx
            .run(
                self.default_timeout,
                self.service.request_cancel_workflow(&self.domain, execution),
            )
            .await??)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Remote`] on service failure, or `Timeout` /
    /// `Cancelled`.
    pub async fn query_workflow(
        &self,
        ctx: &OperationContext,
        execution: &WorkflowExecution,
        query_type: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, ClientError> {
        Ok(ctx
            .run(
                self.default_timeout,
                self.service
                    .query_workflow(&self.domain, execution, query_type, args),
            )
            .await??)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Remote`] on service failure, or `Timeout` /
    /// `Cancelled`.
    pub async fn terminate_workflow(
        &self,
        ctx: &OperationContext,
        execution: &WorkflowExecution,
        reason: &str,
        details: Vec<u8>,
    ) -> Result<(), ClientError> {
        Ok(ctx
            .run(
                self.default_timeout,
                self.service
                    .terminate_workflow(&self.domain, execution, reason, details),
            )
            .await??)
    }

    async fn await_result(
        &self,
        ctx: &OperationContext,
        execution: &WorkflowExecution,
    ) -> Result<Payload, ClientError> {
        Ok(ctx
            .run(
                self.default_timeout,
                self.service.await_workflow_result(&self.domain, execution),
            )
            .await??)
    }
}

impl std::fmt::Debug for WorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowClient")
            .field("domain", &self.domain)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RunHandle
// ---------------------------------------------------------------------------

/// An in-flight workflow run started through `execute_workflow`.
#[derive(Debug, Clone)]
pub struct RunHandle {
    execution: WorkflowExecution,
    client: WorkflowClient,
}

impl RunHandle {
    #[must_use]
    pub fn execution(&self) -> &WorkflowExecution {
        &self.execution
    }

    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.execution.workflow_id
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.execution.run_id
    }

    /// Waits for the run to close and returns its result.
    ///
    /// # Errors
    ///
    /// Returns the workflow's failure as [`ClientError::Remote`], or `Timeout` /
    /// `Cancelled` if the context cuts the wait short.
    pub async fn get(&self, ctx: &OperationContext) -> Result<Payload, ClientError> {
        self.client.await_result(ctx, &self.execution).await
    }
}

// ---------------------------------------------------------------------------
// DomainClient
// ---------------------------------------------------------------------------

/// Domain-management client derived from the workflow-service client.
#[derive(Clone)]
pub struct DomainClient {
    service: Arc<dyn WorkflowService>,
}

impl DomainClient {
    pub fn new(service: Arc<dyn WorkflowService>) -> Self {
        Self { service }
    }

    /// # Errors
    ///
    /// Returns the service error, e.g. `NotFound` for an unknown domain.
    pub async fn describe(&self, domain: &str) -> Result<DomainDescription, RemoteError> {
        self.service.describe_domain(domain).await
    }
}

impl std::fmt::Debug for DomainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainClient").finish_non_exhaustive()
    }
}
