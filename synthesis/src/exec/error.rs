//! Pipeline error types
//!
//! Every variant is fatal for the current evaluation cycle only. A failed
//! compile of the generated tests is not an error; it is reported as
//! [`RunStatus::CompilationError`](super::RunStatus::CompilationError).

use crate::trace::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Stage of an evaluation cycle, used for error and log context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `cargo test` with coverage instrumentation
    Collect,
    /// `cargo profdata -- merge`
    Merge,
    /// External report script
    Report,
    /// Instrumentation build of the crate under test
    Instrument,
    /// Traced `cargo test`
    TracedTest,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collect => write!(f, "collect"),
            Self::Merge => write!(f, "merge"),
            Self::Report => write!(f, "report"),
            Self::Instrument => write!(f, "instrument"),
            Self::TracedTest => write!(f, "traced-test"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    /// External tool exited nonzero
    #[error("{stage} stage failed with exit code {exit_code:?}")]
    ToolInvocation {
        stage: Stage,
        exit_code: Option<i32>,
    },

    /// External tool could not be started
    #[error("failed to start {program} for {stage} stage: {source}")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Coverage percentage present but not in a supported encoding
    #[error("unsupported encoding for {field}: {value}")]
    ReportFormat { field: &'static str, value: String },

    /// Coverage percentage missing from the report
    #[error("coverage report has no {field}")]
    ReportMissing { field: &'static str },

    /// Crate directory missing or not a directory
    #[error("crate root not found: {path}")]
    CrateRoot { path: PathBuf },

    /// Pipeline driven out of order
    #[error("invalid pipeline transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: super::RunnerState,
        to: super::RunnerState,
    },

    #[error(transparent)]
    Trace(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExecError {
    /// Stage the error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::ToolInvocation { stage, .. } | Self::Spawn { stage, .. } => Some(*stage),
            Self::ReportFormat { .. } | Self::ReportMissing { .. } => Some(Stage::Report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_invocation_message_names_stage() {
        let err = ExecError::ToolInvocation {
            stage: Stage::Merge,
            exit_code: Some(2),
        };
        assert_eq!(err.to_string(), "merge stage failed with exit code Some(2)");
        assert_eq!(err.stage(), Some(Stage::Merge));
    }

    #[test]
    fn test_report_errors_belong_to_report_stage() {
        let err = ExecError::ReportFormat {
            field: "lines",
            value: "true".into(),
        };
        assert_eq!(err.stage(), Some(Stage::Report));
        assert!(ExecError::Io(std::io::Error::other("x")).stage().is_none());
    }
}
