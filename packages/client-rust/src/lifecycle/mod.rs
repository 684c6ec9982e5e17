//! Client lifecycle: start, exactly-once shutdown, and registration with a
//! host application's service registry.

pub mod controller;
pub mod registry;

pub use controller::{ClientDeps, CompletionSignal, LifecycleController, LifecycleState};
pub use registry::{ManagedService, ServiceContext, ServiceRegistry};
