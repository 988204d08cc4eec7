//! Test-case runner
//!
//! Drives the build tool through one evaluation cycle, either as a plain
//! coverage run (collect → merge → report) or as a traced run that attaches
//! per-test fitness to the chromosomes of a container.
//!
//! All subprocesses are blocking. Log handles are scoped to the stage that
//! opens them and closed on every exit path.

use super::config::RunnerConfig;
use super::container::{Chromosome, ChromosomeContainer};
use super::error::{ExecError, ExecResult, Stage};
use super::report::{parse_coverage_report, parse_failed_tests, RunStatus, FAILED_MARKER};
use crate::coverage::LlvmCoverage;
use crate::trace::TraceStore;
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::time::Instant;

const PROFRAW_PATTERN: &str = "rusty-test-%m.profraw";
const PROFDATA_FILE: &str = "rusty-tests.profdata";
const TESTS_LOG: &str = "tests.log";
const TESTS_ERROR: &str = "tests.error";

/// Pipeline state. A plain run walks `Idle → Collecting → Merging →
/// Reporting → Done`; a traced run walks `Idle → InstrumentedRun → Done`.
/// Any failure returns the runner to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Collecting,
    Merging,
    Reporting,
    InstrumentedRun,
    Done,
}

impl RunnerState {
    fn can_transition_to(self, next: RunnerState) -> bool {
        use RunnerState::*;
        matches!(
            (self, next),
            (Idle, Collecting)
                | (Collecting, Merging)
                | (Merging, Reporting)
                | (Reporting, Done)
                | (Idle, InstrumentedRun)
                | (InstrumentedRun, Done)
        )
    }
}

/// Runs generated tests against a crate and collects coverage.
pub struct TestCaseRunner {
    config: RunnerConfig,
    state: RunnerState,
}

impl TestCaseRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            state: RunnerState::Idle,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    fn transition(&mut self, next: RunnerState) -> ExecResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ExecError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = ?self.state, to = ?next, "runner transition");
        self.state = next;
        Ok(())
    }

    /// A new cycle may start from `Idle` or after a finished one.
    fn begin_cycle(&mut self) {
        if self.state == RunnerState::Done {
            self.state = RunnerState::Idle;
        }
    }

    /// Plain coverage run of the container's crate.
    pub fn run<C, K>(&mut self, container: &K) -> ExecResult<LlvmCoverage>
    where
        C: Chromosome,
        K: ChromosomeContainer<C>,
    {
        self.run_at(container.path())
    }

    /// Plain coverage run of the crate at `crate_root`.
    pub fn run_at(&mut self, crate_root: &Path) -> ExecResult<LlvmCoverage> {
        self.begin_cycle();
        let result = self.collect_merge_report(crate_root);
        match &result {
            Ok(coverage) => tracing::info!(
                lines = coverage.line_coverage,
                regions = coverage.region_coverage,
                "coverage run finished"
            ),
            Err(e) => {
                tracing::error!(stage = ?e.stage(), error = %e, "coverage run failed");
                self.state = RunnerState::Idle;
            }
        }
        result
    }

    fn collect_merge_report(&mut self, crate_root: &Path) -> ExecResult<LlvmCoverage> {
        check_crate_root(crate_root)?;
        let logs = self.reset_logs()?;
        let coverage_dir = crate_root.join(&self.config.coverage_dir);
        clear_coverage_dir(&coverage_dir)?;

        self.transition(RunnerState::Collecting)?;
        let mut collect = Command::new(&self.config.cargo);
        collect
            .arg("test")
            .arg(&self.config.test_module)
            .args(self.config.feature_args())
            .current_dir(crate_root)
            .env("RUSTFLAGS", "-C instrument-coverage")
            .env("LLVM_PROFILE_FILE", coverage_dir.join(PROFRAW_PATTERN))
            .stdout(logs.stdout()?)
            .stderr(logs.stderr()?);
        check_status(Stage::Collect, run_status(Stage::Collect, &mut collect)?)?;

        self.transition(RunnerState::Merging)?;
        let profdata = coverage_dir.join(PROFDATA_FILE);
        let mut merge = Command::new(&self.config.cargo);
        merge
            .args(["profdata", "--", "merge", "-sparse"])
            .args(profraw_files(&coverage_dir)?)
            .arg("-o")
            .arg(&profdata)
            .current_dir(crate_root)
            .stdout(logs.stdout()?)
            .stderr(logs.stderr()?);
        check_status(Stage::Merge, run_status(Stage::Merge, &mut merge)?)?;

        self.transition(RunnerState::Reporting)?;
        let mut report = Command::new(self.report_script()?);
        report
            .arg(&profdata)
            .current_dir(crate_root)
            .stderr(logs.stderr()?);
        let output = run_output(Stage::Report, &mut report)?;
        check_status(Stage::Report, output.status)?;
        let coverage = parse_coverage_report(&String::from_utf8_lossy(&output.stdout))?;

        self.transition(RunnerState::Done)?;
        Ok(coverage)
    }

    /// Traced run: build the crate with trace points, run the generated
    /// tests, flag and remove failing chromosomes, and attach the drained
    /// traces to the survivors.
    ///
    /// A compile failure of the generated tests yields
    /// [`RunStatus::CompilationError`] and attaches nothing.
    pub fn run_with_instrumentation<C, K, S>(
        &mut self,
        container: &mut K,
        store: &mut S,
    ) -> ExecResult<RunStatus<C>>
    where
        C: Chromosome,
        K: ChromosomeContainer<C>,
        S: TraceStore,
    {
        self.begin_cycle();
        let start = Instant::now();
        let result = self.traced_cycle(container, store);
        match &result {
            Ok(RunStatus::Ok { failed }) => tracing::info!(
                failed = failed.len(),
                survivors = container.chromosomes().len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "traced run finished"
            ),
            Ok(RunStatus::CompilationError) => {
                tracing::error!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "generated tests did not compile"
                );
                self.state = RunnerState::Idle;
            }
            Err(e) => {
                tracing::error!(stage = ?e.stage(), error = %e, "traced run failed");
                self.state = RunnerState::Idle;
            }
        }
        result
    }

    fn traced_cycle<C, K, S>(&mut self, container: &mut K, store: &mut S) -> ExecResult<RunStatus<C>>
    where
        C: Chromosome,
        K: ChromosomeContainer<C>,
        S: TraceStore,
    {
        let crate_root = container.path().to_path_buf();
        check_crate_root(&crate_root)?;
        store.clear()?;
        let logs = self.reset_logs()?;
        self.transition(RunnerState::InstrumentedRun)?;

        let env = self.instrumentation_env(container.name(), &crate_root, store);
        let build_dir = crate_root.join("build");
        fs::create_dir_all(&build_dir)?;

        let mut instrument = Command::new(&self.config.cargo);
        instrument
            .arg(&self.config.instrumentation_subcommand)
            .args(self.config.feature_args())
            .current_dir(&crate_root)
            .envs(env.iter().cloned())
            .stdout(Stdio::null());
        let build = run_output(Stage::Instrument, &mut instrument)?;
        let cargo_log = build_dir.join(format!("cargo_{}.log", timestamp_millis()));
        fs::write(&cargo_log, &build.stderr)?;
        if !build.status.success() {
            tracing::warn!(
                exit_code = ?build.status.code(),
                log = %cargo_log.display(),
                "instrumentation build exited nonzero"
            );
        }

        let mut test = Command::new(&self.config.cargo);
        test.arg("test")
            .arg(&self.config.test_module)
            .args(self.config.feature_args())
            .current_dir(&crate_root)
            .envs(env.iter().cloned())
            .stderr(logs.stderr()?);
        let output = run_output(Stage::TracedTest, &mut test)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        fs::write(build_dir.join(format!("{}.log", timestamp_millis())), &stdout)?;

        let failed_ids = if output.status.success() {
            Vec::new()
        } else if stdout.contains(FAILED_MARKER) {
            parse_failed_tests(&stdout)
        } else {
            return Ok(RunStatus::CompilationError);
        };
        if !failed_ids.is_empty() {
            tracing::info!(failed = failed_ids.len(), "tests failed");
        }

        // Drain before touching the population so a bad trace leaves it whole.
        let mut traces = store.drain()?;

        let chromosomes = container.chromosomes_mut();
        let (mut failed, mut survivors): (Vec<C>, Vec<C>) = std::mem::take(chromosomes)
            .into_iter()
            .partition(|c| failed_ids.contains(&c.id()));
        for chromosome in &mut failed {
            chromosome.set_fails(true);
        }
        for chromosome in &mut survivors {
            chromosome.set_coverage(traces.remove(&chromosome.id()).unwrap_or_default());
        }
        *chromosomes = survivors;

        if let Err(e) = container.refresh() {
            container.chromosomes_mut().extend(failed);
            return Err(e);
        }

        self.transition(RunnerState::Done)?;
        Ok(RunStatus::Ok { failed })
    }

    fn instrumentation_env<S: TraceStore>(
        &self,
        crate_name: &str,
        crate_root: &Path,
        store: &S,
    ) -> Vec<(String, String)> {
        let mut env = vec![
            ("RU_STAGE".to_string(), "instrumentation".to_string()),
            ("RU_CRATE_NAME".to_string(), crate_name.to_string()),
            ("RU_CRATE_ROOT".to_string(), crate_root.display().to_string()),
            ("RU_RUN".to_string(), self.config.run.to_string()),
            ("RUST_LOG".to_string(), self.config.log_level.clone()),
        ];
        env.extend(store.env());
        env
    }

    /// Relative script paths resolve against the working directory of
    /// this process, not the crate root.
    fn report_script(&self) -> ExecResult<PathBuf> {
        let script = &self.config.report_script;
        if script.is_absolute() {
            Ok(script.clone())
        } else {
            Ok(std::env::current_dir()?.join(script))
        }
    }

    /// Truncate `tests.log` and `tests.error` for a new cycle.
    fn reset_logs(&self) -> ExecResult<CycleLogs> {
        fs::create_dir_all(&self.config.output_dir)?;
        let logs = CycleLogs {
            stdout: self.config.output_dir.join(TESTS_LOG),
            stderr: self.config.output_dir.join(TESTS_ERROR),
        };
        File::create(&logs.stdout)?;
        File::create(&logs.stderr)?;
        Ok(logs)
    }
}

/// Per-cycle log files; every stage appends to them.
struct CycleLogs {
    stdout: PathBuf,
    stderr: PathBuf,
}

impl CycleLogs {
    fn stdout(&self) -> ExecResult<Stdio> {
        Ok(Stdio::from(append(&self.stdout)?))
    }

    fn stderr(&self) -> ExecResult<Stdio> {
        Ok(Stdio::from(append(&self.stderr)?))
    }
}

fn append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn check_crate_root(crate_root: &Path) -> ExecResult<()> {
    if crate_root.is_dir() {
        Ok(())
    } else {
        Err(ExecError::CrateRoot {
            path: crate_root.to_path_buf(),
        })
    }
}

/// Remove stale artifacts so a crashed cycle cannot leak into this one.
fn clear_coverage_dir(dir: &Path) -> ExecResult<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn profraw_files(dir: &Path) -> ExecResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension() == Some(OsStr::new("profraw")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

fn run_status(stage: Stage, cmd: &mut Command) -> ExecResult<ExitStatus> {
    tracing::info!(stage = %stage, program = %program_name(cmd), "starting stage");
    cmd.status().map_err(|source| ExecError::Spawn {
        stage,
        program: program_name(cmd),
        source,
    })
}

fn run_output(stage: Stage, cmd: &mut Command) -> ExecResult<Output> {
    tracing::info!(stage = %stage, program = %program_name(cmd), "starting stage");
    cmd.output().map_err(|source| ExecError::Spawn {
        stage,
        program: program_name(cmd),
        source,
    })
}

fn check_status(stage: Stage, status: ExitStatus) -> ExecResult<()> {
    if status.success() {
        tracing::info!(stage = %stage, "stage finished");
        Ok(())
    } else {
        Err(ExecError::ToolInvocation {
            stage,
            exit_code: status.code(),
        })
    }
}

fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        use RunnerState::*;
        assert!(Idle.can_transition_to(Collecting));
        assert!(Reporting.can_transition_to(Done));
        assert!(Idle.can_transition_to(InstrumentedRun));
        assert!(!Idle.can_transition_to(Merging));
        assert!(!Collecting.can_transition_to(InstrumentedRun));
        assert!(!Done.can_transition_to(Collecting));
    }

    #[test]
    fn test_invalid_transition_is_reported() {
        let mut runner = TestCaseRunner::new(RunnerConfig::default());
        let err = runner.transition(RunnerState::Reporting).unwrap_err();
        assert!(matches!(err, ExecError::InvalidTransition { .. }));
        assert_eq!(runner.state(), RunnerState::Idle);
    }

    #[test]
    fn test_missing_crate_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner =
            TestCaseRunner::new(RunnerConfig::default().with_output_dir(dir.path().join("out")));
        let err = runner.run_at(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ExecError::CrateRoot { .. }));
        assert_eq!(runner.state(), RunnerState::Idle);
    }

    #[test]
    fn test_clear_coverage_dir_removes_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let coverage = dir.path().join("coverage");
        fs::create_dir_all(coverage.join("keep")).unwrap();
        fs::write(coverage.join("old.profraw"), b"x").unwrap();
        clear_coverage_dir(&coverage).unwrap();
        assert!(profraw_files(&coverage).unwrap().is_empty());
        assert!(coverage.join("keep").is_dir());
    }
}
