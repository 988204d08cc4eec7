//! Search-based unit test generation core
//!
//! This library provides the pieces an evolutionary test generator needs
//! between static analysis of a Rust crate and fitness evaluation:
//! - A type model over the crate's types with structural compatibility and
//!   generic binding
//! - A callable registry answering generator and consumer queries
//! - Test cases as statement sequences with move/borrow liveness
//! - Rendering of test cases into a test module of the crate
//! - An instrumentation pipeline driving `cargo` for coverage and per-test
//!   traces
//! - A decoder for the trace line protocol
//!
//! # Usage
//!
//! ```rust,ignore
//! use synthesis::exec::{RunnerConfig, SourceFileContainer, TestCaseRunner};
//! use synthesis::trace::FileTraceStore;
//!
//! let mut container = SourceFileContainer::new(root, "mycrate", "src/lib.rs", "rusty_tests")
//!     .with_chromosomes(population);
//! let mut store = FileTraceStore::new(root.join("traces.log"));
//! let mut runner = TestCaseRunner::new(RunnerConfig::from_env());
//! let status = runner.run_with_instrumentation(&mut container, &mut store)?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod builtins;
pub mod callable;
pub mod coverage;
pub mod exec;
pub mod registry;
pub mod render;
pub mod test_case;
pub mod trace;
pub mod types;

pub use callable::{Callable, CallableKind, Param, PassingMode, Visibility};
pub use coverage::{BasicBlock, Coverage, LlvmCoverage};
pub use registry::TypeContext;
pub use test_case::{TestCase, VarRef};
pub use types::{Trait, Ty, TypeTable};
