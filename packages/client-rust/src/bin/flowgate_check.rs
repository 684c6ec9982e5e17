//! Validates a worker-group configuration and prints its routing table.
//!
//! Exit status is non-zero if the file cannot be read, parsed or validated.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flowgate_client::observability::init_tracing;
use flowgate_client::runtime::client_name;
use flowgate_core::RootConfig;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "flowgate-check")]
#[command(about = "Validate a flowgate worker-group configuration")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, env = "FLOWGATE_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON.
    #[arg(long)]
    json: bool,
}

/// One routable task list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    task_list: String,
    group: String,
    domain: String,
    host_port: String,
    pollers: u32,
}

fn load_config(path: &Path) -> Result<RootConfig> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = RootConfig::from_json_slice(&bytes)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Task lists that would be routed after start, sorted by task list.
fn routes(config: &RootConfig) -> Vec<Route> {
    if config.disabled {
        return Vec::new();
    }
    let mut routes: Vec<Route> = config
        .groups()
        .filter(|g| !g.disabled)
        .flat_map(|g| {
            g.enabled_workers()
                .map(|w| Route {
                    task_list: w.task_list.clone(),
                    group: g.name.clone(),
                    domain: g.domain.clone(),
                    host_port: g.host_port.clone(),
                    pollers: w.pollers(),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    routes.sort_by(|a, b| a.task_list.cmp(&b.task_list));
    routes
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(&cli.config)?;
    if config.disabled {
        warn!("workflow client is disabled - no worker would be started");
        return Ok(());
    }

    for group in config.groups() {
        info!(
            group = %group.name,
            client = %client_name(&group.name),
            disabled = group.disabled,
            "worker group"
        );
    }

    let routes = routes(&config);
    println!("{:<24} {:<16} {:<16} {:<24} POLLERS", "TASK LIST", "GROUP", "DOMAIN", "ENDPOINT");
    for r in &routes {
        println!(
            "{:<24} {:<16} {:<16} {:<24} {}",
            r.task_list, r.group, r.domain, r.host_port, r.pollers
        );
    }
    info!(task_lists = routes.len(), "configuration is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_config_yields_sorted_routes() {
        let file = write_config(
            r#"{
                "worker_groups": {
                    "payments": {
                        "domain": "billing",
                        "host_port": "cadence:7933",
                        "worker": [
                            {"task_list": "refunds", "worker_count": 2},
                            {"task_list": "charges", "worker_count": 4},
                            {"task_list": "legacy", "worker_count": 1, "disabled": true}
                        ]
                    },
                    "off": {"disabled": true}
                }
            }"#,
        );

        let config = load_config(file.path()).unwrap();
        let routes = routes(&config);
        let names: Vec<_> = routes.iter().map(|r| r.task_list.as_str()).collect();
        assert_eq!(names, vec!["charges", "refunds"]);
        assert_eq!(routes[0].group, "payments");
        assert_eq!(routes[0].pollers, 4);
    }

    #[test]
    fn duplicate_task_list_fails() {
        let file = write_config(
            r#"{
                "worker_groups": {
                    "a": {"domain": "d", "host_port": "h:1", "worker": [{"task_list": "t", "worker_count": 1}]},
                    "b": {"domain": "d", "host_port": "h:2", "worker": [{"task_list": "t", "worker_count": 1}]}
                }
            }"#,
        );

        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid configuration"));
    }

    #[test]
    fn malformed_json_fails() {
        let file = write_config("{ not json");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn disabled_config_has_no_routes() {
        let file = write_config(r#"{"disabled": true}"#);
        let config = load_config(file.path()).unwrap();
        assert!(routes(&config).is_empty());
    }
}
