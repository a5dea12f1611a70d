// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The node configuration YAML file (spec §6). Only the keys the core
//! reads are modeled; the file may carry other sections, which are
//! ignored via `#[serde(default)]` and `deny_unknown_fields` deliberately
//! *not* being set.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NodeConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default, rename = "localInfo")]
    pub local_info: LocalInfoSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseSection {
    #[serde(default, rename = "collectorPort")]
    pub collector_port: Option<u16>,
    /// Keyed by hostname, or `__DEFAULT__` for the fallback collector.
    #[serde(default, rename = "sensorToCollectorMap")]
    pub sensor_to_collector_map: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LocalInfoSection {
    #[serde(default, rename = "logDir")]
    pub log_dir: Option<String>,
    #[serde(default, rename = "processAgentsCommPort")]
    pub process_agents_comm_port: Option<u16>,
}

impl DatabaseSection {
    /// Select a collector host for `host_name`, falling back to
    /// `__DEFAULT__` (spec §6).
    pub fn collector_for(&self, host_name: &str) -> Option<&str> {
        self.sensor_to_collector_map
            .get(host_name)
            .or_else(|| self.sensor_to_collector_map.get("__DEFAULT__"))
            .map(String::as_str)
    }
}

pub fn load_node_config(path: &Path) -> anyhow::Result<NodeConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading node config {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing node config {}", path.display()))
}
