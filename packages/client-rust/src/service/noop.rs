//! The no-op workflow API, used when the subsystem is disabled.

use flowgate_core::{OperationContext, Payload, StartWorkflowOptions, WorkflowExecution, WorkflowType};
use tracing::debug;

use crate::error::{ClientError, LifecycleError};
use crate::lifecycle::CompletionSignal;
use crate::runtime::RunHandle;

/// Accepts the whole API surface without touching the network.
///
/// Lifecycle calls succeed. Calls that would have to produce a result from
/// the service fail with [`ClientError::Unsupported`]; fire-and-forget calls
/// (cancel, terminate) succeed silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpApi;

impl NoOpApi {
    /// # Errors
    ///
    /// Never fails.
    pub fn start(&self) -> Result<(), LifecycleError> {
        debug!("no-op workflow api started");
        Ok(())
    }

    #[must_use]
    pub fn shutdown(&self) -> CompletionSignal {
        CompletionSignal::completed()
    }

    /// # Errors
    ///
    /// Always [`ClientError::Unsupported`].
    pub fn start_workflow(
        &self,
        _ctx: &OperationContext,
        _options: &StartWorkflowOptions,
        _workflow: &WorkflowType,
        _args: Vec<Payload>,
    ) -> Result<WorkflowExecution, ClientError> {
        Err(ClientError::Unsupported {
            operation: "start workflow",
        })
    }

    /// # Errors
    ///
    /// Always [`ClientError::Unsupported`].
    pub fn execute_workflow(
        &self,
        _ctx: &OperationContext,
        _options: &StartWorkflowOptions,
        _workflow: &WorkflowType,
        _args: Vec<Payload>,
    ) -> Result<RunHandle, ClientError> {
        Err(ClientError::Unsupported {
            operation: "execute workflow",
        })
    }

    /// # Errors
    ///
    /// Never fails.
    pub fn cancel_workflow(
        &self,
        _ctx: &OperationContext,
        _task_list: Option<&str>,
        _workflow_id: &str,
        _run_id: &str,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    /// # Errors
    ///
    /// Always [`ClientError::Unsupported`].
    pub fn query_workflow(
        &self,
        _ctx: &OperationContext,
        _task_list: Option<&str>,
        _workflow_id: &str,
        _run_id: &str,
        _query_type: &str,
        _args: Vec<Payload>,
    ) -> Result<Payload, ClientError> {
        Err(ClientError::Unsupported {
            operation: "query workflow",
        })
    }

    /// # Errors
    ///
    /// Never fails.
    pub fn terminate_workflow(
        &self,
        _ctx: &OperationContext,
        _task_list: Option<&str>,
        _workflow_id: &str,
        _run_id: &str,
        _reason: &str,
        _details: Vec<u8>,
    ) -> Result<(), ClientError> {
        Ok(())
    }
}
