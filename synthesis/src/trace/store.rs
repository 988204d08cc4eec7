//! Trace stores: the channel between the instrumented subprocess and the
//! pipeline. Cleared before a traced run, written by the subprocess,
//! drained once after it exits.

use super::{decode, TraceError, TraceFact};
use crate::coverage::Coverage;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the trace file for instrumented binaries.
pub const TRACE_FILE_ENV: &str = "RU_TRACE_FILE";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("trace store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Message boundary for per-test execution facts.
pub trait TraceStore {
    /// Wipe every prior fact. Idempotent.
    fn clear(&mut self) -> StoreResult<()>;

    fn publish(&mut self, fact: &TraceFact) -> StoreResult<()>;

    /// Take every fact published since the last clear, grouped by test id.
    fn drain(&mut self) -> StoreResult<BTreeMap<u64, Coverage>>;

    /// Extra environment handed to the instrumented subprocess so it can
    /// reach this store.
    fn env(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// In-process store holding raw protocol lines.
#[derive(Debug, Default)]
pub struct MemoryTraceStore {
    lines: Vec<String>,
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw line as an instrumented binary would write it.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl TraceStore for MemoryTraceStore {
    fn clear(&mut self) -> StoreResult<()> {
        self.lines.clear();
        Ok(())
    }

    fn publish(&mut self, fact: &TraceFact) -> StoreResult<()> {
        self.lines.push(fact.to_line());
        Ok(())
    }

    fn drain(&mut self) -> StoreResult<BTreeMap<u64, Coverage>> {
        let lines = std::mem::take(&mut self.lines);
        Ok(decode(lines.iter().map(String::as_str))?)
    }
}

/// Store backed by an append-only file whose path the subprocess receives
/// through [`TRACE_FILE_ENV`].
#[derive(Debug, Clone)]
pub struct FileTraceStore {
    path: PathBuf,
}

impl FileTraceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceStore for FileTraceStore {
    fn clear(&mut self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn publish(&mut self, fact: &TraceFact) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", fact.to_line())?;
        Ok(())
    }

    fn drain(&mut self) -> StoreResult<BTreeMap<u64, Coverage>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let file = File::open(&self.path)?;
        let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
        let traces = decode(lines.iter().map(String::as_str))?;
        self.clear()?;
        Ok(traces)
    }

    fn env(&self) -> Vec<(String, String)> {
        vec![(TRACE_FILE_ENV.to_string(), self.path.display().to_string())]
    }
}
