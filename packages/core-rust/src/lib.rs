//! `flowgate` core: worker-group configuration, the per-call operation context and the
//! collaborator traits of the orchestration service.

pub mod config;
pub mod context;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{GroupConfig, RootConfig, WorkerConfig};
pub use context::{Interrupted, OperationContext, TASK_LIST_FOR_ACTION};
pub use error::{ConfigError, RemoteError, RemoteErrorKind};
pub use traits::{Dispatcher, Transport, WorkflowService};
pub use types::{
    DomainDescription, DomainStatus, Payload, Registration, RegistrationKind,
    StartWorkflowOptions, StartWorkflowRequest, WorkflowExecution, WorkflowType,
};
