// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `magi-agentd`: the agent-side runtime binary (spec §1, §6).
//!
//! Wires together the external collaborators (CLI parsing, YAML config
//! loading) with the core (`Agent::initialize` / `Agent::run`). Exit codes
//! follow spec §6: `0` normal shutdown, `2` missing/invalid positional
//! arguments (via `clap`'s default usage-error behavior), `1` any other
//! startup failure (bad config file, initial connect failure).

use clap::Parser;
use magi_agent::agent::Agent;
use magi_agent::logging;
use magi_config::{load_node_config, AgentConfig, CliArgs, CliOverrides};
use magi_registry::FunctionRegistry;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let node_config = match load_node_config(&cli.node_config_file) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("magi-agentd: failed to load node config: {e:#}");
            std::process::exit(1);
        }
    };
    // The experiment config is loaded for the benefit of user-registered
    // callables (it carries no fields this core interprets); a load
    // failure is still fatal since it means the file path given is bad.
    if let Err(e) = magi_config::load_experiment_config(&cli.experiment_config_file) {
        eprintln!("magi-agentd: failed to load experiment config: {e:#}");
        std::process::exit(1);
    }

    let overrides = CliOverrides::parse(&cli.overrides);
    let config = AgentConfig::build(&cli, &overrides, &node_config);

    if let Err(e) = logging::init(&config) {
        eprintln!("magi-agentd: failed to initialize logging: {e:#}");
        std::process::exit(1);
    }

    let registry = FunctionRegistry::new();

    let agent = match Agent::initialize(config, registry).await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!(error = %e, "magi-agentd: initial connection failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = agent.run().await {
        tracing::error!(error = %e, "magi-agentd: agent loop exited with an error");
        std::process::exit(1);
    }
}
