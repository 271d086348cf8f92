// src/heuristics/limits.rs

//! Time limit selection from a reference solution
//!
//! The model solution is compiled in a scratch directory, measured on every
//! test input and the slowest run is turned into a limit:
//! `ceil(2 * SAFETY_FACTOR * max) / 2` seconds.

use crate::error::{Error, Result};
use crate::executors::compiler::{Compiler, DEFAULT_COMPILE_TIMEOUT};
use crate::executors::process::{CommandRunner, SystemRunner};
use crate::executors::timer::{DEFAULT_GHZ, PerfTimer, TimerMeasurement, TimerPool};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::info;

/// Multiplier applied to the slowest measured run
pub const SAFETY_FACTOR: f64 = 3.0;

/// Wall-clock limit for a measured run during estimation
pub const ESTIMATION_MEASURE_TIMEOUT: Duration = Duration::from_secs(20);

/// A time limit, in whole half-seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeLimit {
    half_seconds: u64,
}

impl TimeLimit {
    /// Round `seconds` up to the nearest half-second
    pub fn from_seconds_ceil(seconds: f64) -> Self {
        let half_seconds = (2.0 * seconds.max(0.0)).ceil();
        Self {
            half_seconds: half_seconds as u64,
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.half_seconds as f64 / 2.0
    }

    pub fn as_millis(&self) -> u64 {
        self.half_seconds * 500
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs_f64())
    }
}

/// Turn measured times into a limit
///
/// Returns `None` for an empty measurement set.
pub fn pick_time_limit(times: &[f64]) -> Option<TimeLimit> {
    let max = times.iter().copied().reduce(f64::max)?;
    Some(TimeLimit::from_seconds_ceil(SAFETY_FACTOR * max))
}

/// Compiles and measures a reference solution
pub struct TimeLimitEstimator {
    runner: Arc<dyn CommandRunner>,
    threads: usize,
    perf: Option<PathBuf>,
    shell: Option<PathBuf>,
    compile_timeout: Duration,
    measure_timeout: Duration,
    ghz: f64,
}

impl Default for TimeLimitEstimator {
    fn default() -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            threads: 1,
            perf: None,
            shell: None,
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            measure_timeout: ESTIMATION_MEASURE_TIMEOUT,
            ghz: DEFAULT_GHZ,
        }
    }
}

impl TimeLimitEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of measurements run in parallel
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Use a different process runner for compiling and measuring
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Use explicit `perf` and shell binaries instead of searching PATH
    pub fn with_tools(mut self, perf: &Path, shell: &Path) -> Self {
        self.perf = Some(perf.to_path_buf());
        self.shell = Some(shell.to_path_buf());
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn with_measure_timeout(mut self, timeout: Duration) -> Self {
        self.measure_timeout = timeout;
        self
    }

    pub fn with_ghz(mut self, ghz: f64) -> Self {
        self.ghz = ghz;
        self
    }

    /// Measure `solution` on every input
    ///
    /// The solution is copied to and compiled in a temporary directory that
    /// is removed when this returns, whatever the outcome.
    pub fn measure(&self, solution: &Path, inputs: &[PathBuf]) -> Result<Vec<TimerMeasurement>> {
        if inputs.is_empty() {
            return Err(Error::NoInputs);
        }

        let sandbox = TempDir::new()?;
        let ext = solution
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let sandboxed = sandbox.path().join(format!("a.{}", ext));
        fs::copy(solution, &sandboxed)?;

        let mut compiler = Compiler::new(&sandboxed, self.runner.clone())?
            .with_timeout(self.compile_timeout);
        if !compiler.compile() {
            return Err(Error::CompileFailed {
                source_path: solution.to_path_buf(),
                log: compiler.log().to_string(),
            });
        }

        let timer = match (&self.perf, &self.shell) {
            (Some(perf), Some(shell)) => PerfTimer::new(compiler.executable(), perf, shell),
            _ => PerfTimer::locate(compiler.executable())?,
        }
        .with_timeout(self.measure_timeout)
        .with_ghz(self.ghz)
        .with_runner(self.runner.clone());

        TimerPool::new(timer, self.threads).measure(inputs)
    }

    /// Pick a time limit for `solution` over `inputs`
    pub fn estimate(&self, solution: &Path, inputs: &[PathBuf]) -> Result<TimeLimit> {
        info!("Picking time limits for {}", solution.display());
        let measurements = self.measure(solution, inputs)?;
        let times: Vec<f64> = measurements.iter().map(|m| m.seconds).collect();
        let limit = pick_time_limit(&times).ok_or(Error::NoInputs)?;
        info!(
            "Slowest run {:.3}s, time limit {}",
            times.iter().copied().fold(0.0, f64::max),
            limit
        );
        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::process::{CommandOutput, CommandSpec, ProcessStatus};
    use std::sync::Mutex;

    #[test]
    fn test_quantization() {
        assert_eq!(TimeLimit::from_seconds_ceil(0.0).as_millis(), 0);
        assert_eq!(TimeLimit::from_seconds_ceil(0.01).as_millis(), 500);
        assert_eq!(TimeLimit::from_seconds_ceil(0.5).as_millis(), 500);
        assert_eq!(TimeLimit::from_seconds_ceil(0.51).as_millis(), 1000);
        assert_eq!(TimeLimit::from_seconds_ceil(2.2).as_secs_f64(), 2.5);
        assert_eq!(TimeLimit::from_seconds_ceil(-1.0).as_millis(), 0);
    }

    #[test]
    fn test_pick_time_limit() {
        assert_eq!(pick_time_limit(&[]), None);
        // 3 * 0.4 = 1.2 -> 1.5
        assert_eq!(pick_time_limit(&[0.1, 0.4, 0.2]).unwrap().as_millis(), 1500);
        // 3 * 1.0 = 3.0 stays
        assert_eq!(pick_time_limit(&[1.0]).unwrap().as_millis(), 3000);
    }

    #[test]
    fn test_limit_scales_with_measurements() {
        let base = [0.13, 0.41, 0.27];
        let limit = pick_time_limit(&base).unwrap().as_secs_f64();
        for k in [2.0, 3.5, 10.0] {
            let scaled: Vec<f64> = base.iter().map(|t| t * k).collect();
            let scaled_limit = pick_time_limit(&scaled).unwrap().as_secs_f64();
            let exact = SAFETY_FACTOR * 0.41 * k;
            assert!(scaled_limit >= exact && scaled_limit < exact + 0.5);
            assert!(scaled_limit >= limit);
            assert!((scaled_limit - k * limit).abs() <= 0.5 * k + 0.5);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeLimit::from_seconds_ceil(1.2).to_string(), "1.5s");
    }

    /// Compiles successfully and reports per-input instruction counts
    struct FakeToolchain {
        compile_status: ProcessStatus,
        instructions: Vec<(&'static str, u64)>,
        compiled: Mutex<Vec<PathBuf>>,
    }

    impl CommandRunner for FakeToolchain {
        fn run(&self, command: &CommandSpec, _timeout: Duration) -> Result<CommandOutput> {
            if command.program_name() != "perf" {
                let source = PathBuf::from(command.args.last().unwrap());
                assert!(source.exists(), "sandboxed source must exist while compiling");
                self.compiled.lock().unwrap().push(source);
                return Ok(CommandOutput {
                    status: self.compile_status,
                    output: "compiler says hi".to_string(),
                });
            }
            let stdin = command.stdin.as_ref().unwrap();
            let name = stdin.file_name().unwrap().to_str().unwrap();
            let count = self
                .instructions
                .iter()
                .find(|(input, _)| *input == name)
                .map(|(_, count)| *count)
                .unwrap();
            let report = command
                .args
                .iter()
                .filter_map(|a| a.to_str())
                .find_map(|a| a.strip_prefix("-o"))
                .unwrap();
            fs::write(report, format!("{},,instructions,,,\n", count))?;
            Ok(CommandOutput {
                status: ProcessStatus::Exited(0),
                output: String::new(),
            })
        }
    }

    fn fixture() -> (TempDir, PathBuf, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let solution = dir.path().join("abc.cpp");
        fs::write(&solution, "int main() {}").unwrap();
        let inputs: Vec<PathBuf> = ["abc1.in", "abc2.in", "abc3.in"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, "1\n").unwrap();
                path
            })
            .collect();
        (dir, solution, inputs)
    }

    fn estimator(runner: Arc<FakeToolchain>) -> TimeLimitEstimator {
        TimeLimitEstimator::new()
            .with_runner(runner)
            .with_tools(Path::new("/usr/bin/perf"), Path::new("/bin/bash"))
            .with_threads(2)
    }

    #[test]
    fn test_estimate() {
        let (_dir, solution, inputs) = fixture();
        let runner = Arc::new(FakeToolchain {
            compile_status: ProcessStatus::Exited(0),
            // 0.25s, 0.7s and 0.1s at 2 GHz
            instructions: vec![
                ("abc1.in", 500_000_000),
                ("abc2.in", 1_400_000_000),
                ("abc3.in", 200_000_000),
            ],
            compiled: Mutex::new(Vec::new()),
        });

        let est = estimator(runner.clone());
        let measured = est.measure(&solution, &inputs).unwrap();
        assert_eq!(
            measured.iter().map(|m| m.input.clone()).collect::<Vec<_>>(),
            inputs
        );

        // 3 * 0.7 = 2.1 -> 2.5
        let limit = est.estimate(&solution, &inputs).unwrap();
        assert_eq!(limit.as_millis(), 2500);

        // Sandbox is gone once estimation returns
        let compiled = runner.compiled.lock().unwrap();
        assert!(compiled.iter().all(|p| p.file_name().unwrap() == "a.cpp"));
        assert!(compiled.iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_compile_failure_is_fatal() {
        let (_dir, solution, inputs) = fixture();
        let runner = Arc::new(FakeToolchain {
            compile_status: ProcessStatus::Exited(1),
            instructions: vec![],
            compiled: Mutex::new(Vec::new()),
        });

        let err = estimator(runner.clone()).estimate(&solution, &inputs).unwrap_err();
        match err {
            Error::CompileFailed { log, .. } => assert_eq!(log, "compiler says hi"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!runner.compiled.lock().unwrap()[0].exists());
    }

    #[test]
    fn test_no_inputs() {
        let (_dir, solution, _) = fixture();
        let runner = Arc::new(FakeToolchain {
            compile_status: ProcessStatus::Exited(0),
            instructions: vec![],
            compiled: Mutex::new(Vec::new()),
        });
        assert!(matches!(
            estimator(runner).estimate(&solution, &[]),
            Err(Error::NoInputs)
        ));
    }

    #[test]
    fn test_unsupported_solution_language() {
        let dir = tempfile::tempdir().unwrap();
        let solution = dir.path().join("abc.py");
        fs::write(&solution, "print(1)").unwrap();
        let input = dir.path().join("abc1.in");
        fs::write(&input, "").unwrap();

        let result = TimeLimitEstimator::new().estimate(&solution, &[input]);
        assert!(matches!(result, Err(Error::UnsupportedExtension(_))));
    }
}
