//! Instrumentation Pipeline
//!
//! Runs the generated test module of a crate under the build tool and turns
//! what comes back into fitness:
//!
//! ```text
//! plain:  clear coverage → cargo test (instrument-coverage) → profdata merge → report script
//! traced: clear trace store → cargo <instrumentation> → cargo test → drain traces
//! ```
//!
//! A nonzero exit of any plain-run stage is an [`ExecError`]. In a traced
//! run, failing tests flag and remove their chromosomes while the rest still
//! receive coverage; a test module that does not compile is reported as
//! [`RunStatus::CompilationError`].

mod config;
mod container;
mod error;
mod report;
mod runner;

pub use config::RunnerConfig;
pub use container::{Chromosome, ChromosomeContainer, SourceFileContainer};
pub use error::{ExecError, ExecResult, Stage};
pub use report::{parse_coverage_report, parse_failed_tests, RunStatus, FAILED_MARKER};
pub use runner::{RunnerState, TestCaseRunner};
