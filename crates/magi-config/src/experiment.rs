// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The experiment configuration YAML file (spec §6). Its schema is left to
//! the experiment designer by the original system; the core only needs to
//! load and hand it to user code, so it is carried as an opaque YAML value.

use std::path::Path;

use anyhow::Context;

#[derive(Debug, Clone, Default)]
pub struct ExperimentConfig(pub serde_yaml::Value);

pub fn load_experiment_config(path: &Path) -> anyhow::Result<ExperimentConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading experiment config {}", path.display()))?;
    let value: serde_yaml::Value = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing experiment config {}", path.display()))?;
    Ok(ExperimentConfig(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_arbitrary_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.yaml");
        std::fs::write(&path, "duration: 60\nnodes: [a, b]\n").unwrap();
        let cfg = load_experiment_config(&path).unwrap();
        assert_eq!(cfg.0["duration"].as_i64(), Some(60));
    }
}
