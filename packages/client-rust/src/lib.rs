//! `flowgate` client: task-list routing and lifecycle for a fleet of
//! orchestration worker groups.
//!
//! A [`WorkflowApi`] owns one worker group per configured domain, starts a
//! background worker per task list, and routes workflow operations to the
//! group that owns the target task list.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod runtime;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientOptions;
pub use error::{ClientError, ConnectionError, LifecycleError, RoutingError, StartError};
pub use lifecycle::{
    ClientDeps, CompletionSignal, LifecycleController, LifecycleState, ManagedService,
    ServiceContext, ServiceRegistry,
};
pub use runtime::{RunHandle, Worker, WorkerFactory, WorkerOptions};
pub use service::{LiveApi, NoOpApi, Router, WorkflowApi};
