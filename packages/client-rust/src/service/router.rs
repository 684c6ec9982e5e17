//! Task-list routing: forwards each workflow operation to the worker group
//! that owns the target task list.

use std::collections::HashMap;
use std::sync::Arc;

use flowgate_core::{
    OperationContext, Payload, StartWorkflowOptions, WorkflowExecution, WorkflowType,
    TASK_LIST_FOR_ACTION,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, RoutingError};
use crate::observability::route_miss;
use crate::runtime::{ConnectionHandle, RunHandle, WorkerGroupRuntime};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes operations by task list to the owning group's connection.
///
/// The routing table is built once from started groups and never changes;
/// a fresh start builds a new router. Calls are read-only and may run
/// concurrently.
pub struct Router {
    routes: HashMap<String, Arc<WorkerGroupRuntime>>,
}

impl Router {
    /// Builds the routing table from the running workers of `groups`.
    #[must_use]
    pub fn new(groups: &[Arc<WorkerGroupRuntime>]) -> Self {
        let mut routes = HashMap::new();
        for group in groups {
            for task_list in group.task_lists() {
                routes.insert(task_list, Arc::clone(group));
            }
        }
        Self { routes }
    }

    /// The group owning `task_list`, if any.
    #[must_use]
    pub fn group_for(&self, task_list: &str) -> Option<&Arc<WorkerGroupRuntime>> {
        self.routes.get(task_list)
    }

    /// All routable task lists, sorted.
    #[must_use]
    pub fn task_lists(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Determines the task list of an operation that does not carry one in
    /// its options: the explicit argument wins, otherwise the reserved
    /// [`TASK_LIST_FOR_ACTION`] context key is consulted.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::MissingRoutingKey`] if neither is present and
    /// [`RoutingError::MalformedRoutingKey`] if the context value is not a string.
    pub fn resolve_task_list<'a>(
        ctx: &'a OperationContext,
        task_list: Option<&'a str>,
    ) -> Result<&'a str, RoutingError> {
        if let Some(task_list) = task_list {
            return Ok(task_list);
        }
        match ctx.task_list_for_action() {
            Some(Value::String(task_list)) => Ok(task_list.as_str()),
            Some(other) => Err(RoutingError::MalformedRoutingKey {
                key: TASK_LIST_FOR_ACTION,
                found: other.to_string(),
            }),
            None => Err(RoutingError::MissingRoutingKey {
                key: TASK_LIST_FOR_ACTION,
            }),
        }
    }

    fn route(
        &self,
        operation: &'static str,
        task_list: &str,
    ) -> Result<&Arc<ConnectionHandle>, RoutingError> {
        match self.routes.get(task_list).and_then(|g| g.connection()) {
            Some(connection) => {
                connection.metrics().routed_call(operation, task_list);
                debug!(operation, task_list, group = %connection.metrics().group(), "routing call");
                Ok(connection)
            }
            None => {
                route_miss(operation);
                Err(RoutingError::UnknownTaskList {
                    task_list: task_list.to_string(),
                })
            }
        }
    }

    /// Starts a workflow on the group owning `options.task_list`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Routing`] if no group owns the task list,
    /// otherwise the owning client's result unchanged.
    pub async fn start_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<WorkflowExecution, ClientError> {
        let connection = self.route("start_workflow", &options.task_list)?;
        connection
            .client()
            .start_workflow(ctx, options, workflow, args)
            .await
    }

    /// Like [`Router::start_workflow`] but returns a handle to await the run.
    ///
    /// # Errors
    ///
    /// Same as [`Router::start_workflow`].
    pub async fn execute_workflow(
        &self,
        ctx: &OperationContext,
        options: &StartWorkflowOptions,
        workflow: &WorkflowType,
        args: Vec<Payload>,
    ) -> Result<RunHandle, ClientError> {
        let connection = self.route("execute_workflow", &options.task_list)?;
        connection
            .client()
            .execute_workflow(ctx, options, workflow, args)
            .await
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Routing`] if the task list cannot be determined
    /// or is not owned by any group; no remote call is made in that case.
    pub async fn cancel_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<(), ClientError> {
        let task_list = Self::resolve_task_list(ctx, task_list)?;
        let connection = self.route("cancel_workflow", task_list)?;
        let execution = WorkflowExecution::new(workflow_id, run_id);
        connection.client().cancel_workflow(ctx, &execution).await
    }

    /// # Errors
    ///
    /// Same routing errors as [`Router::cancel_workflow`].
    pub async fn query_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
        query_type: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, ClientError> {
        let task_list = Self::resolve_task_list(ctx, task_list)?;
        let connection = self.route("query_workflow", task_list)?;
        let execution = WorkflowExecution::new(workflow_id, run_id);
        connection
            .client()
            .query_workflow(ctx, &execution, query_type, args)
            .await
    }

    /// # Errors
    ///
    /// Same routing errors as [`Router::cancel_workflow`].
    pub async fn terminate_workflow(
        &self,
        ctx: &OperationContext,
        task_list: Option<&str>,
        workflow_id: &str,
        run_id: &str,
        reason: &str,
        details: Vec<u8>,
    ) -> Result<(), ClientError> {
        let task_list = Self::resolve_task_list(ctx, task_list)?;
        let connection = self.route("terminate_workflow", task_list)?;
        let execution = WorkflowExecution::new(workflow_id, run_id);
        connection
            .client()
            .terminate_workflow(ctx, &execution, reason, details)
            .await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("task_lists", &self.task_lists())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
