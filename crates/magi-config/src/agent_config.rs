// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `AgentConfig` — the populated record handed to the core by the external
//! CLI/config collaborator (spec §3).

use crate::cli::{CliArgs, CliOverrides};
use crate::node::NodeConfig;

/// `loglevel` values recognized on the command line (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// The `tracing`/`EnvFilter` directive this level maps to.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

const DEFAULT_COMM_HOST: &str = "localhost";
const DEFAULT_COMM_PORT: u16 = 18809;
const DEFAULT_LOG_DIR: &str = "/var/log/magi/logs";
const DEFAULT_DB_PORT: u16 = 27017;

/// The fully-resolved configuration the core is initialized with (spec §3).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub agent_name: String,
    pub dock_name: String,
    pub host_name: String,
    pub comm_host: String,
    pub comm_port: u16,
    pub comm_group: Option<String>,
    pub log_file: String,
    pub log_level: LogLevel,
    pub db_location: String,
    pub db_port: u16,
}

impl AgentConfig {
    /// Merge CLI positionals, `key=value` overrides, and the node config
    /// into a populated `AgentConfig`, applying the same defaults as the
    /// original's `setConfiguration` (spec §6, `original_source`'s
    /// `Agent.c`): `commHost=localhost`, `commPort=18809`,
    /// `loglevel=INFO`, `logfile=logDir/agent_name.log` when unset, and the
    /// `db_location == host_name` loopback rewrite.
    pub fn build(cli: &CliArgs, overrides: &CliOverrides, node: &NodeConfig) -> Self {
        let host_name = overrides.hostname.clone().unwrap_or_else(|| DEFAULT_COMM_HOST.to_string());
        let log_dir = node
            .local_info
            .log_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());
        let log_file = overrides
            .logfile
            .clone()
            .unwrap_or_else(|| format!("{log_dir}/{}.log", cli.agent_name));

        let mut db_location = node
            .database
            .collector_for(&host_name)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_COMM_HOST.to_string());
        if db_location == host_name {
            tracing::info!(host_name, "db_location matches host_name, rewriting to loopback");
            db_location = "127.0.0.1".to_string();
        }

        AgentConfig {
            agent_name: cli.agent_name.clone(),
            dock_name: cli.dock_name.clone(),
            host_name,
            comm_host: overrides.comm_host.clone().unwrap_or_else(|| DEFAULT_COMM_HOST.to_string()),
            comm_port: overrides.comm_port.unwrap_or(DEFAULT_COMM_PORT),
            comm_group: overrides.comm_group.clone(),
            log_file,
            log_level: overrides.loglevel.unwrap_or_default(),
            db_location,
            db_port: node.database.collector_port.unwrap_or(DEFAULT_DB_PORT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cli() -> CliArgs {
        CliArgs {
            agent_name: "A".to_string(),
            dock_name: "D".to_string(),
            node_config_file: PathBuf::from("node.yaml"),
            experiment_config_file: PathBuf::from("exp.yaml"),
            overrides: vec![],
        }
    }

    #[test]
    fn applies_defaults_when_nothing_overridden() {
        let config = AgentConfig::build(&cli(), &CliOverrides::default(), &NodeConfig::default());
        assert_eq!(config.comm_host, "localhost");
        assert_eq!(config.comm_port, 18809);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_file, "/var/log/magi/logs/A.log");
    }

    #[test]
    fn db_location_rewritten_to_loopback_when_equal_to_host() {
        let mut node = NodeConfig::default();
        node.database
            .sensor_to_collector_map
            .insert("myhost".to_string(), "myhost".to_string());
        let overrides = CliOverrides {
            hostname: Some("myhost".to_string()),
            ..Default::default()
        };
        let config = AgentConfig::build(&cli(), &overrides, &node);
        assert_eq!(config.db_location, "127.0.0.1");
    }

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let overrides = CliOverrides {
            comm_host: Some("collector.example".to_string()),
            comm_port: Some(9999),
            comm_group: Some("control".to_string()),
            loglevel: Some(LogLevel::Debug),
            ..Default::default()
        };
        let config = AgentConfig::build(&cli(), &overrides, &NodeConfig::default());
        assert_eq!(config.comm_host, "collector.example");
        assert_eq!(config.comm_port, 9999);
        assert_eq!(config.comm_group.as_deref(), Some("control"));
        assert_eq!(config.log_level, LogLevel::Debug);
    }
}
