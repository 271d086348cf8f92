// src/executors/timer.rs

//! Instruction-counting execution timer
//!
//! Wall-clock time depends on machine load, so solutions are measured by
//! the number of retired instructions reported by `perf stat`. The count
//! is turned into seconds by simulating a processor that retires one
//! instruction per cycle at a fixed clock rate.
//!
//! `TimerPool` fans measurements out over a bounded rayon pool and returns
//! them in input order.

use super::process::{CommandRunner, CommandSpec, ProcessStatus, SystemRunner};
use crate::error::{Error, Result};
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info};

/// Default wall-clock limit for one measured run
pub const DEFAULT_MEASURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default simulated clock rate
pub const DEFAULT_GHZ: f64 = 2.0;

static INSTRUCTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(\d+),[^,]*,instructions").expect("static regex is valid")
});

/// One measured input
#[derive(Debug, Clone, PartialEq)]
pub struct TimerMeasurement {
    pub input: PathBuf,
    /// Simulated execution time in seconds
    pub seconds: f64,
}

/// Measures how long an executable takes on one input
pub trait Timer: Send + Sync {
    fn measure(&self, input: &Path) -> Result<f64>;
}

/// Convert an instruction count to simulated seconds
pub fn instructions_to_seconds(instructions: u64, ghz: f64) -> f64 {
    instructions as f64 / (ghz * 1e9)
}

/// Extract the instruction count from a `perf stat -x,` report
pub fn parse_instruction_count(report: &str) -> Result<u64> {
    let caps = INSTRUCTIONS_RE
        .captures(report)
        .ok_or_else(|| Error::MeasurementParse(report.trim().to_string()))?;
    caps[1]
        .parse()
        .map_err(|_| Error::MeasurementParse(caps[0].to_string()))
}

/// Timer backed by `perf stat -e instructions`
pub struct PerfTimer {
    executable: PathBuf,
    perf: PathBuf,
    shell: PathBuf,
    timeout: Duration,
    ghz: f64,
    runner: Arc<dyn CommandRunner>,
}

impl PerfTimer {
    /// Create a timer using explicit `perf` and shell paths
    pub fn new(executable: &Path, perf: &Path, shell: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
            perf: perf.to_path_buf(),
            shell: shell.to_path_buf(),
            timeout: DEFAULT_MEASURE_TIMEOUT,
            ghz: DEFAULT_GHZ,
            runner: Arc::new(SystemRunner),
        }
    }

    /// Create a timer, locating `perf` and `bash` on PATH
    pub fn locate(executable: &Path) -> Result<Self> {
        let perf = which::which("perf").map_err(|_| Error::ToolNotFound("perf".to_string()))?;
        let shell = which::which("bash").map_err(|_| Error::ToolNotFound("bash".to_string()))?;
        Ok(Self::new(executable, &perf, &shell))
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the simulated clock rate
    pub fn with_ghz(mut self, ghz: f64) -> Self {
        self.ghz = ghz;
        self
    }

    /// Use a different process runner
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    fn command(&self, input: &Path, report: &Path) -> CommandSpec {
        let mut output_flag = std::ffi::OsString::from("-o");
        output_flag.push(report);
        // Wrapped in a shell so crashes surface as an exit status
        let script = format!("'{}'; exit $?", self.executable.display());
        CommandSpec::new(&self.perf)
            .args(["stat", "-einstructions", "-x,"])
            .arg(output_flag)
            .arg(&self.shell)
            .arg("-c")
            .arg(script)
            .stdin_file(input)
            .discard_output()
    }
}

impl Timer for PerfTimer {
    fn measure(&self, input: &Path) -> Result<f64> {
        let report = tempfile::NamedTempFile::new()?;
        let command = self.command(input, report.path());

        let out = self.runner.run(&command, self.timeout)?;
        match out.status {
            ProcessStatus::Exited(0) => {}
            ProcessStatus::TimedOut => {
                return Err(Error::Timeout {
                    input: input.to_path_buf(),
                    timeout: self.timeout,
                });
            }
            status => {
                return Err(Error::ExecutionFailed {
                    input: input.to_path_buf(),
                    status: status.to_string(),
                });
            }
        }

        let instructions = parse_instruction_count(&fs::read_to_string(report.path())?)?;
        let seconds = instructions_to_seconds(instructions, self.ghz);
        debug!(
            "{}: {} instructions, {:.3}s",
            input.display(),
            instructions,
            seconds
        );
        Ok(seconds)
    }
}

/// Measures many inputs on a bounded worker pool
pub struct TimerPool<T: Timer> {
    timer: T,
    threads: usize,
}

impl<T: Timer> TimerPool<T> {
    /// Create a pool running at most `threads` measurements at once
    pub fn new(timer: T, threads: usize) -> Self {
        Self {
            timer,
            threads: threads.max(1),
        }
    }

    /// Measure every input
    ///
    /// Results are in the same order as `inputs`, whatever the completion
    /// order. The first failure aborts the batch.
    pub fn measure(&self, inputs: &[PathBuf]) -> Result<Vec<TimerMeasurement>> {
        info!(
            "Measuring {} input(s) on {} thread(s)",
            inputs.len(),
            self.threads
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()?;

        pool.install(|| {
            inputs
                .par_iter()
                .map(|input| -> Result<TimerMeasurement> {
                    let seconds = self.timer.measure(input)?;
                    Ok(TimerMeasurement {
                        input: input.clone(),
                        seconds,
                    })
                })
                .collect()
        })
    }
}
