//! Application configuration
//!
//! Precedence, lowest first: built-in defaults, the TOML file given with
//! `--config`, `RU_*` environment variables, command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use synthesis::exec::RunnerConfig;

/// Top-level configuration file
///
/// ```toml
/// seed = 42
///
/// [runner]
/// features = "std"
/// output_dir = "out"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub runner: RunnerConfig,
    /// Seed for the registry's stable shuffle
    pub seed: u64,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Load the file if given, then overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.runner = config.runner.with_env(|key| std::env::var(key).ok());
        Ok(config)
    }
}
