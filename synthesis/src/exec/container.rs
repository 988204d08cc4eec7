//! Chromosomes and the crate sources that hold them.

use super::error::ExecResult;
use crate::coverage::Coverage;
use crate::render::render_test_module;
use crate::test_case::TestCase;
use std::fs;
use std::path::{Path, PathBuf};

const BEGIN_MARKER: &str = "// rusty-unit: generated tests begin";
const END_MARKER: &str = "// rusty-unit: generated tests end";

/// A candidate test as seen by the pipeline.
pub trait Chromosome {
    fn id(&self) -> u64;

    fn set_coverage(&mut self, coverage: Coverage);

    fn set_fails(&mut self, fails: bool);
}

/// A crate under test together with the chromosomes materialized into it.
pub trait ChromosomeContainer<C: Chromosome> {
    /// Crate root directory
    fn path(&self) -> &Path;

    /// Crate name handed to the instrumenter
    fn name(&self) -> &str;

    fn chromosomes(&self) -> &[C];

    fn chromosomes_mut(&mut self) -> &mut Vec<C>;

    /// Write the current chromosomes back into the crate sources.
    fn refresh(&mut self) -> ExecResult<()>;
}

/// Keeps the generated test module at the end of one source file of the
/// crate, delimited by marker comments.
#[derive(Debug)]
pub struct SourceFileContainer {
    crate_root: PathBuf,
    crate_name: String,
    file: PathBuf,
    test_module: String,
    chromosomes: Vec<TestCase>,
}

impl SourceFileContainer {
    /// `file` is relative to `crate_root`, e.g. `src/lib.rs`.
    pub fn new(
        crate_root: impl Into<PathBuf>,
        crate_name: impl Into<String>,
        file: impl Into<PathBuf>,
        test_module: impl Into<String>,
    ) -> Self {
        Self {
            crate_root: crate_root.into(),
            crate_name: crate_name.into(),
            file: file.into(),
            test_module: test_module.into(),
            chromosomes: Vec::new(),
        }
    }

    pub fn with_chromosomes(mut self, chromosomes: Vec<TestCase>) -> Self {
        self.chromosomes = chromosomes;
        self
    }

    pub fn source_path(&self) -> PathBuf {
        self.crate_root.join(&self.file)
    }

    /// Strip the generated module, leaving the file as it was before.
    pub fn clear(&self) -> ExecResult<()> {
        let path = self.source_path();
        let source = fs::read_to_string(&path)?;
        let stripped = strip_generated(&source);
        if stripped.len() != source.len() {
            fs::write(&path, stripped)?;
        }
        Ok(())
    }
}

impl ChromosomeContainer<TestCase> for SourceFileContainer {
    fn path(&self) -> &Path {
        &self.crate_root
    }

    fn name(&self) -> &str {
        &self.crate_name
    }

    fn chromosomes(&self) -> &[TestCase] {
        &self.chromosomes
    }

    fn chromosomes_mut(&mut self) -> &mut Vec<TestCase> {
        &mut self.chromosomes
    }

    fn refresh(&mut self) -> ExecResult<()> {
        let path = self.source_path();
        let source = fs::read_to_string(&path)?;
        let mut out = strip_generated(&source).trim_end().to_string();
        out.push_str("\n\n");
        out.push_str(BEGIN_MARKER);
        out.push('\n');
        out.push_str(&render_test_module(&self.test_module, &self.chromosomes));
        out.push_str(END_MARKER);
        out.push('\n');
        fs::write(&path, out)?;
        tracing::debug!(
            file = %path.display(),
            tests = self.chromosomes.len(),
            "refreshed generated test module"
        );
        Ok(())
    }
}

/// Source text without the marker-delimited block.
fn strip_generated(source: &str) -> String {
    match (source.find(BEGIN_MARKER), source.find(END_MARKER)) {
        (Some(begin), Some(end)) if begin < end => {
            let after = &source[end + END_MARKER.len()..];
            let mut out = source[..begin].trim_end().to_string();
            out.push('\n');
            out.push_str(after.trim_start_matches('\n'));
            out
        }
        _ => source.to_string(),
    }
}
