//! Per-group runtime: the connection, the clients derived from it and the
//! workers polling its task lists.

pub mod client;
pub mod connection;
pub mod group;
pub mod worker;

pub use client::{DomainClient, RunHandle, WorkflowClient};
pub use connection::{client_name, ConnectionBuilder, ConnectionHandle, FRONTEND_SERVICE};
pub use group::WorkerGroupRuntime;
pub use worker::{Worker, WorkerFactory, WorkerHandle, WorkerOptions};
