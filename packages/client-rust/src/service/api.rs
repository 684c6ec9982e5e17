//! The unified workflow API handed to application code.
//!
//! [`WorkflowApi`] is chosen once, at construction: the live variant routes
//! calls to the worker groups, the no-op variant stands in when the
//! subsystem is disabled. Both expose the same operations.

use std::sync::Arc;

use async_trait::async_trait;
use flowgate_core::{
    ConfigError, OperationContext, Payload, Registration, RegistrationKind, RootConfig,
    StartWorkflowOptions, WorkflowExecution, WorkflowType,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::noop::NoOpApi;
use super::router::Router;
use crate::config::ClientOptions;
use crate::error::{ClientError, LifecycleError};
use crate::lifecycle::{
    ClientDeps, CompletionSignal, LifecycleController, LifecycleState, ManagedService,
    ServiceContext,
};
use crate::runtime::RunHandle;

// ---------------------------------------------------------------------------
// LiveApi
// ---------------------------------------------------------------------------

/// Routes workflow operations to the worker groups of one configuration.
///
/// Clones share the same lifecycle.
#[derive(Debug, Clone)]
pub struct LiveApi {
    controller: Arc<LifecycleController>,
}

impl LiveApi {
    /// Validates `config` and builds an unstarted client.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`]; nothing is connected in that case.
    pub fn new(
        config: RootConfig,
        deps: ClientDeps,
        options: ClientOptions,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            controller: Arc::new(LifecycleController::new(config, deps, options)),
        })
    }

    /// Registers a workflow with every worker. Must precede `start`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyStarted`] after `start`.
    pub fn register_workflow(&self, name: impl Into<String>) -> Result<(), LifecycleError> {
        self.controller.register(Registration {
            kind: RegistrationKind::Workflow,
            name: name.into(),
        })
    }

    /// Registers an activity with every worker. Must precede `start`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyStarted`] after `start`.
    pub fn register_activity(&self, name: impl Into<String>) -> Result<(), LifecycleError> {
        self.controller.register(Registration {
            kind: RegistrationKind::Activity,
            name: name.into(),
        })
    }

    /// Starts every enabled group. Cancelling `shutdown_on` later shuts the
    /// client down.
    ///
    /// # Errors
    ///
    /// See [`LifecycleController::start`].
    pub async fn start(&self, shutdown_on: &CancellationToken) -> Result<(), LifecycleError> {
        self.controller.start(shutdown_on.clone()).await
    }

    /// Requests shutdown. Safe to call any number of times.
    #[must_use]
    pub fn shutdown(&self) -> CompletionSignal {
        self.controller.shutdown()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    /// Waits for the start-context watcher to exit.
    pub async fn join_watcher(&self) {
        self.controller.join_watcher().await;
    }

    /// The current router.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotRunning`] before start completes, after
    /// shutdown begins, and when the client is disabled.
    pub fn router(&self) -> Result<Arc<Router>, ClientError> {
        self.controller.router().ok_or(ClientError::NotRunning)
    }

    /// # Errors
    ///
    /// See [`Router::start_workflow`].
    pub async fn start_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<WorkflowExecution, ClientError> {
        self.router()?
            .start_workflow(ctx, options, workflow, args)
            .await
    }

    /// # Errors
    ///
    /// See [`Router::execute_workflow`].
    pub async fn execute_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<RunHandle, ClientError> {
        self.router()?
            .execute_workflow(ctx, options, workflow, args)
            .await
    }

    /// # Errors
    ///
    /// See [`Router::cancel_workflow`].
    pub async fn cancel_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<(), ClientError> {
        self.router()?
            .cancel_workflow(ctx, task_list, workflow_id, run_id)
            .await
    }

    /// # Errors
    ///
    /// See [`Router::query_workflow`].
    pub async fn query_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
        query_type: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, ClientError> {
        self.router()?
            .query_workflow(ctx, task_list, workflow_id, run_id, query_type, args)
            .await
    }

    /// # Errors
    ///
    /// See [`Router::terminate_workflow`].
    pub async fn terminate_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
        reason: &str,
        details: Vec<u8>,
    ) -> Result<(), ClientError> {
        self.router()?
            .terminate_workflow(ctx, task_list, workflow_id, run_id, reason, details)
            .await
    }
}

// ---------------------------------------------------------------------------
// WorkflowApi
// ---------------------------------------------------------------------------

/// Unified workflow client: live or no-op, chosen at construction.
#[derive(Debug, Clone)]
pub enum WorkflowApi {
    Live(LiveApi),
    NoOp(NoOpApi),
}

impl WorkflowApi {
    /// Builds the client for `config`. A disabled configuration yields the
    /// no-op variant without validating its groups.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] of an enabled configuration.
    pub fn new(
        config: RootConfig,
        deps: ClientDeps,
        options: ClientOptions,
    ) -> Result<Self, ConfigError> {
        if config.disabled {
            warn!("workflow client is disabled - using no-op workflow api");
            return Ok(Self::noop());
        }
        LiveApi::new(config, deps, options).map(Self::Live)
    }

    #[must_use]
    pub fn noop() -> Self {
        Self::NoOp(NoOpApi)
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp(_))
    }

    /// The live client, if this is one.
    #[must_use]
    pub fn live(&self) -> Option<&LiveApi> {
        match self {
            Self::Live(api) => Some(api),
            Self::NoOp(_) => None,
        }
    }

    /// Lifecycle state. The no-op variant always reports `Running`.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match self {
            Self::Live(api) => api.state(),
            Self::NoOp(_) => LifecycleState::Running,
        }
    }

    /// # Errors
    ///
    /// See [`LiveApi::start`]. The no-op variant never fails.
    pub async fn start(&self, shutdown_on: &CancellationToken) -> Result<(), LifecycleError> {
        match self {
            Self::Live(api) => api.start(shutdown_on).await,
            Self::NoOp(api) => api.start(),
        }
    }

    #[must_use]
    pub fn shutdown(&self) -> CompletionSignal {
        match self {
            Self::Live(api) => api.shutdown(),
            Self::NoOp(api) => api.shutdown(),
        }
    }

    /// # Errors
    ///
    /// See [`Router::start_workflow`]; `Unsupported` for the no-op variant.
    pub async fn start_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<WorkflowExecution, ClientError> {
        match self {
            Self::Live(api) => api.start_workflow(ctx, options, workflow, args).await,
            Self::NoOp(api) => api.start_workflow(ctx, options, workflow, args),
        }
    }

    /// # Errors
    ///
    /// See [`Router::execute_workflow`]; `Unsupported` for the no-op variant.
    pub async fn execute_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<RunHandle, ClientError> {
        match self {
            Self::Live(api) => api.execute_workflow(ctx, options, workflow, args).await,
            Self::NoOp(api) => api.execute_workflow(ctx, options, workflow, args),
        }
    }

    /// # Errors
    ///
    /// See [`Router::cancel_workflow`]. The no-op variant never fails.
    pub async fn cancel_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<(), ClientError> {
        match self {
            Self::Live(api) => {
                api.cancel_workflow(ctx, task_list, workflow_id, run_id)
                    .await
            }
            Self::NoOp(api) => api.cancel_workflow(ctx, task_list, workflow_id, run_id),
        }
    }

    /// # Errors
    ///
    /// See [`Router::query_workflow`]; `Unsupported` for the no-op variant.
    pub async fn query_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
        query_type: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, ClientError> {
        match self {
            Self::Live(api) => {
                api.query_workflow(ctx, task_list, workflow_id, run_id, query_type, args)
                    .await
            }
            Self::NoOp(api) => {
                api.query_workflow(ctx, task_list, workflow_id, run_id, query_type, args)
            }
        }
    }

    /// # Errors
    ///
    /// See [`Router::terminate_workflow`]. The no-op variant never fails.
    pub async fn terminate_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
        reason: &str,
        details: Vec<u8>,
    ) -> Result<(), ClientError> {
        match self {
            Self::Live(api) => {
                api.terminate_workflow(ctx, task_list, workflow_id, run_id, reason, details)
                    .await
            }
            Self::NoOp(api) => {
                api.terminate_workflow(ctx, task_list, workflow_id, run_id, reason, details)
            }
        }
    }
}

#[async_trait]
impl ManagedService for WorkflowApi {
    fn name(&self) -> &'static str {
        "workflow"
    }

    async fn init(&self, ctx: &ServiceContext) -> anyhow::Result<()> {
        self.start(&ctx.shutdown).await?;
        Ok(())
    }

    async fn shutdown(&self, terminate: bool) -> anyhow::Result<()> {
        let done = WorkflowApi::shutdown(self);
        if !terminate {
            done.wait().await;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
