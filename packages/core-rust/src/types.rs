use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque workflow argument, result, or query payload. Never interpreted by
/// the client.
pub type Payload = serde_json::Value;

/// Identifies one run of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

impl WorkflowExecution {
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }
}

/// Registered name of a workflow function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowType(pub String);

impl WorkflowType {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkflowType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for WorkflowType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Caller-supplied options for starting a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartWorkflowOptions {
    /// Workflow ID. Generated by the client when empty.
    pub id: String,
    /// Task list the workflow is started on; also the routing key.
    pub task_list: String,
    pub execution_start_to_close_timeout: Duration,
    pub decision_task_start_to_close_timeout: Duration,
}

/// Fully resolved start request handed to the orchestration service.
#[derive(Debug, Clone, PartialEq)]
pub struct StartWorkflowRequest {
    pub domain: String,
    pub request_id: String,
    pub workflow_id: String,
    pub workflow_type: WorkflowType,
    pub task_list: String,
    pub input: Vec<Payload>,
    pub execution_start_to_close_timeout: Duration,
    pub decision_task_start_to_close_timeout: Duration,
}

/// Registration state of a domain on the orchestration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainStatus {
    Registered,
    Deprecated,
    Deleted,
}

/// Result of describing a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDescription {
    pub name: String,
    pub status: DomainStatus,
    pub description: String,
}

/// What a [`Registration`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    Workflow,
    Activity,
}

/// A workflow or activity callable registered before start. Handed to every
/// worker as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Registration {
    pub kind: RegistrationKind,
    pub name: String,
}
