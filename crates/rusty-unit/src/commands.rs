//! Commands behind the `rusty-unit` subcommands. Each returns a
//! serializable report; printing is left to the binary.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use synthesis::exec::TestCaseRunner;
use synthesis::registry::{load_callables, TypeContext};
use synthesis::trace;
use synthesis::{Coverage, LlvmCoverage};

use crate::config::AppConfig;

/// Plain coverage run of the crate at `crate_dir`.
pub fn coverage(config: &AppConfig, crate_dir: &Path) -> Result<LlvmCoverage> {
    let mut runner = TestCaseRunner::new(config.runner.clone());
    runner
        .run_at(crate_dir)
        .with_context(|| format!("Coverage run failed for {}", crate_dir.display()))
}

/// Facts decoded for one test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestTrace {
    pub test_id: u64,
    pub covered: usize,
    pub blocks: Vec<BlockDistance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDistance {
    pub global_id: String,
    pub block_id: u64,
    pub distance: f64,
}

impl TestTrace {
    fn new(test_id: u64, coverage: &Coverage) -> Self {
        Self {
            test_id,
            covered: coverage.covered_blocks(),
            blocks: coverage
                .iter()
                .map(|(block, distance)| BlockDistance {
                    global_id: block.global_id.clone(),
                    block_id: block.block_id,
                    distance,
                })
                .collect(),
        }
    }
}

/// Decode a trace file, grouping facts per test.
pub fn decode(trace_file: &Path) -> Result<Vec<TestTrace>> {
    let content = std::fs::read_to_string(trace_file)
        .with_context(|| format!("Failed to read {}", trace_file.display()))?;
    let traces = trace::decode(content.lines())
        .with_context(|| format!("Malformed trace file {}", trace_file.display()))?;
    Ok(traces
        .iter()
        .map(|(id, coverage)| TestTrace::new(*id, coverage))
        .collect())
}

/// Discovered type with its generator counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeEntry {
    pub ty: String,
    pub generators: usize,
    pub wrapping_generators: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypesReport {
    pub callables: usize,
    pub types: Vec<TypeEntry>,
}

/// Build the registry from an analyzer output file and summarize it.
pub fn types(callables_file: &Path, seed: u64) -> Result<TypesReport> {
    let discovered = load_callables(callables_file)?;
    let ctx = TypeContext::new(discovered, seed);
    let types = ctx
        .types()
        .iter()
        .map(|ty| TypeEntry {
            ty: ty.to_string(),
            generators: ctx.generators_of(ty, None).len(),
            wrapping_generators: ctx.wrapping_generators_of(ty, None).len(),
        })
        .collect();
    Ok(TypesReport {
        callables: ctx.callables().len(),
        types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthesis::types::Ty;
    use synthesis::Callable;

    #[test]
    fn test_decode_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.log");
        std::fs::write(
            &path,
            "running 1 test\n3 $mycrate::foo$ root\n3 $mycrate::foo$ branch[2 0.75]\n",
        )
        .unwrap();
        let traces = decode(&path).unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].test_id, 3);
        assert_eq!(traces[0].covered, 1);
        assert_eq!(traces[0].blocks.len(), 2);
        assert_eq!(traces[0].blocks[1].distance, 0.75);
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.log");
        std::fs::write(&path, "3 $mycrate::foo$ jump[1 1.0]\n").unwrap();
        let err = decode(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unknown trace kind"));
    }

    #[test]
    fn test_types_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callables.json");
        let point = Ty::structure("crate::Point", vec![]);
        let callables = vec![Callable::static_method("origin", point.clone())
            .returning(point)
            .declared_in("src/lib.rs")];
        std::fs::write(&path, serde_json::to_string(&callables).unwrap()).unwrap();

        let report = types(&path, 0).unwrap();
        assert_eq!(report.callables, 5);
        let entry = report.types.iter().find(|t| t.ty == "crate::Point").unwrap();
        assert_eq!(entry.generators, 1);
        assert_eq!(entry.wrapping_generators, 0);
        assert!(report.types.iter().any(|t| t.ty == "std::string::String"));
    }
}
