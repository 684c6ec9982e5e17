//! Application-facing surface: the task-list router and the unified
//! workflow API with its live and no-op variants.

pub mod api;
pub mod noop;
pub mod router;

pub use api::{LiveApi, WorkflowApi};
pub use noop::NoOpApi;
pub use router::Router;
