use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the test-case runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Build tool program
    pub cargo: String,
    /// Comma-separated feature list passed as `--features`; empty for none
    pub features: String,
    /// Name of the generated test module
    pub test_module: String,
    /// Coverage artifact directory, relative to the crate root
    pub coverage_dir: String,
    /// Where `tests.log` and `tests.error` are written
    pub output_dir: PathBuf,
    /// Report script invoked with the merged profile path
    pub report_script: PathBuf,
    /// Cargo subcommand that builds the crate with trace points
    pub instrumentation_subcommand: String,
    /// Run number handed to instrumented subprocesses
    pub run: u32,
    /// `RUST_LOG` for instrumented subprocesses
    pub log_level: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cargo: "cargo".to_string(),
            features: String::new(),
            test_module: "rusty_tests".to_string(),
            coverage_dir: "coverage".to_string(),
            output_dir: PathBuf::from("."),
            report_script: PathBuf::from("scripts/coverage-report.sh"),
            instrumentation_subcommand: "instrumentation".to_string(),
            run: 0,
            log_level: "info".to_string(),
        }
    }
}

impl RunnerConfig {
    /// Defaults overlaid with `RU_CARGO`, `RU_FEATURES`, `RU_OUTPUT_DIR`,
    /// `RU_REPORT_SCRIPT` and `RU_RUN`.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`. Unparseable run numbers are ignored.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(cargo) = lookup("RU_CARGO") {
            self.cargo = cargo;
        }
        if let Some(features) = lookup("RU_FEATURES") {
            self.features = features;
        }
        if let Some(dir) = lookup("RU_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(script) = lookup("RU_REPORT_SCRIPT") {
            self.report_script = PathBuf::from(script);
        }
        if let Some(run) = lookup("RU_RUN") {
            match run.trim().parse() {
                Ok(run) => self.run = run,
                Err(_) => tracing::warn!(value = %run, "ignoring invalid RU_RUN"),
            }
        }
        self
    }

    pub fn with_features(mut self, features: impl Into<String>) -> Self {
        self.features = features.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_run(mut self, run: u32) -> Self {
        self.run = run;
        self
    }

    /// `--features <list>` when a feature list is configured.
    pub fn feature_args(&self) -> Vec<String> {
        if self.features.trim().is_empty() {
            Vec::new()
        } else {
            vec!["--features".to_string(), self.features.clone()]
        }
    }
}
