//! Declarative worker-group configuration and its validation rules.
//!
//! A [`RootConfig`] maps group names to [`GroupConfig`]s. Each group binds one
//! orchestration domain and endpoint and lists the task lists it polls. Task
//! list names are the routing key of the whole subsystem, so they must be
//! unique across every group of one configuration.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration of the workflow client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Keep service-side stack traces in diagnostic logs. Off by default
    /// because they rarely help and drown the actual message.
    pub enable_error_stack_in_cadence_log: bool,
    /// Disable the whole subsystem: no connections, no workers.
    pub disabled: bool,
    /// Worker groups keyed by group name. The key is the group's identity.
    pub worker_groups: BTreeMap<String, GroupConfig>,
}

/// One orchestration domain reached through one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub disabled: bool,
    /// Overwritten with the map key by [`RootConfig::groups`].
    pub name: String,
    pub domain: String,
    /// `host:port` of the orchestration frontend.
    pub host_port: String,
    #[serde(rename = "worker")]
    pub workers: Vec<WorkerConfig>,
}

/// A background worker polling one task list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub disabled: bool,
    pub task_list: String,
    /// Number of parallel task pollers, not a cap on business concurrency.
    pub worker_count: i32,
}

impl RootConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid JSON or does
    /// not match the configuration shape. The result is not validated.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parses a JSON configuration document from raw bytes.
    ///
    /// # Errors
    ///
    /// Same as [`RootConfig::from_json_str`].
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Iterates over all groups in key order with `name` set to the map key.
    pub fn groups(&self) -> impl Iterator<Item = GroupConfig> + '_ {
        self.worker_groups.iter().map(|(name, group)| GroupConfig {
            name: name.clone(),
            ..group.clone()
        })
    }

    /// Validates the whole configuration and reports the first violation.
    ///
    /// Checks, in order: the group map is non-empty (unless the subsystem is
    /// disabled), no task list appears twice across all groups, then every
    /// enabled group and its workers.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_groups.is_empty() && !self.disabled {
            return Err(ConfigError::NoWorkerGroups);
        }

        let mut seen = HashSet::new();
        for group in self.worker_groups.values() {
            for worker in &group.workers {
                if !seen.insert(worker.task_list.as_str()) {
                    return Err(ConfigError::DuplicateTaskList {
                        task_list: worker.task_list.clone(),
                    });
                }
            }
        }

        for group in self.groups().filter(|g| !g.disabled) {
            group.validate()?;
        }
        Ok(())
    }
}

impl GroupConfig {
    /// Validates an enabled group: domain, endpoint and worker list must be set.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] naming this group or one of its task lists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.is_empty() {
            return Err(ConfigError::EmptyDomain {
                group: self.name.clone(),
            });
        }
        if self.host_port.is_empty() {
            return Err(ConfigError::EmptyHostPort {
                group: self.name.clone(),
            });
        }
        if self.workers.is_empty() {
            return Err(ConfigError::NoWorkers {
                group: self.name.clone(),
            });
        }
        self.workers.iter().try_for_each(|w| w.validate(&self.name))
    }

    /// Workers that will actually be started.
    pub fn enabled_workers(&self) -> impl Iterator<Item = &WorkerConfig> {
        self.workers.iter().filter(|w| !w.disabled)
    }
}

impl WorkerConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTaskList`] or [`ConfigError::NegativeWorkerCount`].
    pub fn validate(&self, group: &str) -> Result<(), ConfigError> {
        if self.task_list.is_empty() {
            return Err(ConfigError::EmptyTaskList {
                group: group.to_string(),
            });
        }
        if self.worker_count < 0 {
            return Err(ConfigError::NegativeWorkerCount {
                task_list: self.task_list.clone(),
                count: self.worker_count,
            });
        }
        Ok(())
    }

    /// Poller count as an unsigned value. Negative counts are rejected by
    /// validation; zero lets the worker pick its own default.
    #[must_use]
    pub fn pollers(&self) -> u32 {
        u32::try_from(self.worker_count).unwrap_or(0)
    }
}
