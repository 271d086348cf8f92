// src/executors/process.rs

//! External process invocation with a wall-clock timeout
//!
//! Compilers and measured solutions are run through the `CommandRunner`
//! capability so that tests can substitute fakes that simulate crashes and
//! timeouts without spawning anything.
//!
//! `SystemRunner` is the real implementation:
//! - stdin comes from a file or is nullified to prevent hangs
//! - stdout and stderr are captured together in one scratch file, which
//!   keeps their interleaving and cannot fill a pipe and stall the child
//! - each child leads its own process group; at the deadline the whole
//!   group is killed and the child reaped, so helpers it started (the
//!   solution under `perf`, a compiler's backend) do not outlive it

use crate::error::Result;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// A command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: PathBuf,
    /// Arguments to the program
    pub args: Vec<OsString>,
    /// File wired to standard input (`None` means /dev/null)
    pub stdin: Option<PathBuf>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
    /// Whether stdout/stderr are collected into `CommandOutput::output`
    pub capture_output: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            work_dir: None,
            capture_output: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin_file(mut self, path: impl AsRef<Path>) -> Self {
        self.stdin = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Send stdout/stderr to /dev/null instead of capturing them
    pub fn discard_output(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Program name without directories, for messages and test doubles
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// How a process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Exited normally with the given code
    Exited(i32),
    /// Terminated by a signal
    Killed,
    /// Still running at the deadline; it was killed
    TimedOut,
}

impl ProcessStatus {
    /// True for a zero exit code
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "returned non-zero exit code {}", code),
            Self::Killed => write!(f, "was killed by a signal"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Result of running a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: ProcessStatus,
    /// Combined stdout and stderr (empty when output was discarded)
    pub output: String,
}

/// Capability to run external commands
///
/// An `Err` means the command could not be started at all; everything that
/// happens after a successful spawn is described by `CommandOutput`.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<CommandOutput>;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<CommandOutput> {
        debug!("Running {:?} {:?}", command.program, command.args);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).process_group(0);
        if let Some(dir) = &command.work_dir {
            cmd.current_dir(dir);
        }
        match &command.stdin {
            Some(path) => cmd.stdin(File::open(path)?),
            None => cmd.stdin(Stdio::null()),
        };

        let mut capture = None;
        if command.capture_output {
            let file = tempfile::tempfile()?;
            cmd.stdout(file.try_clone()?);
            cmd.stderr(file.try_clone()?);
            capture = Some(file);
        } else {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        }

        let mut child = cmd.spawn()?;
        let status = match child.wait_timeout(timeout)? {
            Some(status) => match status.code() {
                Some(code) => ProcessStatus::Exited(code),
                None => ProcessStatus::Killed,
            },
            None => {
                // Timeout - kill the process group and reap the leader
                if let Ok(pgid) = i32::try_from(child.id()) {
                    let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
                }
                let _ = child.kill();
                let _ = child.wait();
                ProcessStatus::TimedOut
            }
        };

        let mut output = String::new();
        if let Some(mut file) = capture {
            let mut raw = Vec::new();
            file.seek(SeekFrom::Start(0))?;
            file.read_to_end(&mut raw)?;
            output = String::from_utf8_lossy(&raw).into_owned();
        }

        debug!("{} finished: {:?}", command.program_name(), status);
        Ok(CommandOutput { status, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh").arg("-c").arg(script)
    }

    #[test]
    fn test_exit_code_and_combined_output() {
        let out = SystemRunner
            .run(&sh("echo out; echo err >&2; exit 3"), Duration::from_secs(10))
            .unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(3));
        assert!(!out.status.success());
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[test]
    fn test_stdin_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("abc1.in");
        std::fs::write(&input, "42\n").unwrap();

        let out = SystemRunner
            .run(&sh("read x; echo got $x").stdin_file(&input), Duration::from_secs(10))
            .unwrap();
        assert!(out.status.success());
        assert_eq!(out.output.trim(), "got 42");
    }

    #[test]
    fn test_timeout_kills_child() {
        let out = SystemRunner
            .run(&sh("sleep 5"), Duration::from_millis(200))
            .unwrap();
        assert_eq!(out.status, ProcessStatus::TimedOut);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleeper.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());

        let out = SystemRunner
            .run(&sh(&script), Duration::from_millis(500))
            .unwrap();
        assert_eq!(out.status, ProcessStatus::TimedOut);

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let stat = format!("/proc/{}/stat", pid.trim());
        let gone = |stat: &str| match std::fs::read_to_string(stat) {
            // State follows the parenthesised command name
            Ok(line) => line.rsplit_once(") ").is_some_and(|(_, rest)| rest.starts_with('Z')),
            Err(_) => true,
        };
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !gone(&stat) && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(gone(&stat), "background sleep survived the timeout");
    }

    #[test]
    fn test_discarded_output() {
        let out = SystemRunner
            .run(&sh("echo noisy").discard_output(), Duration::from_secs(10))
            .unwrap();
        assert!(out.status.success());
        assert!(out.output.is_empty());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = SystemRunner.run(
            &CommandSpec::new("/nonexistent/definitely-not-a-tool"),
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_program_name() {
        assert_eq!(CommandSpec::new("/usr/bin/g++").program_name(), "g++");
        assert_eq!(CommandSpec::new("perf").program_name(), "perf");
    }
}
