//! Logging sink and metrics scope handed to workers and routed calls.

pub mod logging;
pub mod scope;

pub use logging::{init_tracing, DiagnosticLogger};
pub use scope::{route_miss, MetricsScope};
