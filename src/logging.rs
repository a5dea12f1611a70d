// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The logging facility (spec §1: "a leveled, mutex-protected line
//! logger... treated as a sink"). Implemented as a `tracing`/
//! `tracing-subscriber` global subscriber writing to `log_file` (or stderr
//! when unset) at `log_level` — the global subscriber serializes all
//! writes, matching the original's internally-mutexed `Logger`.

use anyhow::Context;
use magi_config::AgentConfig;
use tracing_subscriber::EnvFilter;

pub fn init(config: &AgentConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter_str()));

    if config.log_file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(());
    }

    let path = std::path::Path::new(&config.log_file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || file.try_clone().expect("clone log file handle"))
        .init();
    Ok(())
}
