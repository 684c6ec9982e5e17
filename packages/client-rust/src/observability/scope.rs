//! Per-group metrics scope.
//!
//! Records through the `metrics` facade; installing an exporter is left to
//! the application.

use metrics::counter;

/// Metrics handle of one worker group, labelled with group and domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsScope {
    group: String,
    domain: String,
}

impl MetricsScope {
    pub fn new(group: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            domain: domain.into(),
        }
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn routed_call(&self, operation: &'static str, task_list: &str) {
        counter!(
            "flowgate_routed_calls_total",
            "group" => self.group.clone(),
            "domain" => self.domain.clone(),
            "operation" => operation,
            "task_list" => task_list.to_string(),
        )
        .increment(1);
    }

    pub fn worker_started(&self, task_list: &str) {
        counter!(
            "flowgate_workers_started_total",
            "group" => self.group.clone(),
            "task_list" => task_list.to_string(),
        )
        .increment(1);
    }
}

/// Counts a call whose task list no group owns.
pub fn route_miss(operation: &'static str) {
    counter!("flowgate_route_misses_total", "operation" => operation).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_keeps_labels() {
        let scope = MetricsScope::new("g1", "d1");
        assert_eq!(scope.group(), "g1");
        assert_eq!(scope.domain(), "d1");
        // No recorder installed: recording is a no-op and must not panic.
        scope.routed_call("start_workflow", "a");
        scope.worker_started("a");
        route_miss("start_workflow");
    }
}
