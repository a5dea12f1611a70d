// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! CLI argument parsing (external collaborator, spec §6).
//!
//! Positional arguments: `agent_name dock_name node_config_file
//! experiment_config_file`. Subsequent `key=value` pairs are recognized for
//! `commGroup`, `commHost`, `commPort`, `hostname`, `logfile`, `loglevel`,
//! `execute` (ignored). Missing positional arguments cause exit code 2 —
//! `clap`'s default usage-error exit code matches this contract exactly, so
//! `CliArgs::parse()` needs no special-casing.

use std::path::PathBuf;

use clap::Parser;

use crate::agent_config::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "magi-agentd", about = "MAGI agent-side runtime")]
pub struct CliArgs {
    pub agent_name: String,
    pub dock_name: String,
    pub node_config_file: PathBuf,
    pub experiment_config_file: PathBuf,

    /// Trailing `key=value` overrides (spec §6).
    pub overrides: Vec<String>,
}

/// Parsed `key=value` startup overrides (spec §6). `execute` is accepted
/// and ignored by the core, matching the original's `parse_args`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliOverrides {
    pub comm_group: Option<String>,
    pub comm_host: Option<String>,
    pub comm_port: Option<u16>,
    pub hostname: Option<String>,
    pub logfile: Option<String>,
    pub loglevel: Option<LogLevel>,
}

impl CliOverrides {
    pub fn parse(pairs: &[String]) -> Self {
        let mut out = Self::default();
        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                tracing::warn!(pair, "ignoring malformed startup argument, expected key=value");
                continue;
            };
            match key {
                "commGroup" => out.comm_group = Some(value.to_string()),
                "commHost" => out.comm_host = Some(value.to_string()),
                "commPort" => match value.parse() {
                    Ok(p) => out.comm_port = Some(p),
                    Err(_) => tracing::warn!(value, "invalid commPort, ignoring"),
                },
                "hostname" => out.hostname = Some(value.to_string()),
                "logfile" => out.logfile = Some(value.to_string()),
                "loglevel" => match LogLevel::parse(value) {
                    Some(l) => out.loglevel = Some(l),
                    None => tracing::warn!(value, "invalid loglevel, ignoring"),
                },
                "execute" => {}
                other => tracing::warn!(key = other, "unknown startup argument, ignoring"),
            }
        }
        out
    }
}
