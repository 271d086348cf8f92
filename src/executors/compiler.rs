// src/executors/compiler.rs

//! Compilation of a single source file
//!
//! The toolchain is picked from the source extension through the
//! `TOOLCHAINS` table; supporting a new language means adding a row.

use super::process::{CommandRunner, CommandSpec, ProcessStatus};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default wall-clock limit for one compilation
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default extension of produced executables
pub const DEFAULT_OUTPUT_EXTENSION: &str = "e";

/// Supported toolchains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toolchain {
    Cpp,
    C,
    Pascal,
}

/// Source extension (without the dot) to toolchain
pub const TOOLCHAINS: &[(&str, Toolchain)] = &[
    ("cpp", Toolchain::Cpp),
    ("cc", Toolchain::Cpp),
    ("c", Toolchain::C),
    ("pas", Toolchain::Pascal),
];

impl Toolchain {
    /// Look up the toolchain for a source extension
    pub fn for_extension(ext: &str) -> Result<Self> {
        TOOLCHAINS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, toolchain)| *toolchain)
            .ok_or_else(|| Error::UnsupportedExtension(ext.to_string()))
    }

    /// Look up the toolchain for a source path
    pub fn for_source(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::for_extension(ext)
    }

    /// Compiler executable
    pub fn program(&self) -> &'static str {
        match self {
            Self::Cpp => "g++",
            Self::C => "gcc",
            Self::Pascal => "fpc",
        }
    }

    /// Flags used when the caller does not override them
    pub fn default_flags(&self) -> &'static [&'static str] {
        match self {
            Self::Cpp => &["-O3", "--static", "--std=c++17"],
            Self::C => &["-O3", "--static", "--std=c17"],
            Self::Pascal => &["-O3"],
        }
    }

    /// Build the compiler invocation
    pub fn command(&self, flags: &[String], source: &Path, executable: &Path) -> CommandSpec {
        let mut output_flag = std::ffi::OsString::from("-o");
        output_flag.push(executable);
        CommandSpec::new(self.program())
            .args(flags)
            .arg(output_flag)
            .arg(source)
    }
}

/// Compiles one source file into an executable next to it
pub struct Compiler {
    toolchain: Toolchain,
    source: PathBuf,
    executable: PathBuf,
    flags: Vec<String>,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
    log: String,
}

impl Compiler {
    /// Create a compiler for `source`, picking the toolchain by extension
    pub fn new(source: &Path, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let toolchain = Toolchain::for_source(source)?;
        Ok(Self {
            toolchain,
            source: source.to_path_buf(),
            executable: source.with_extension(DEFAULT_OUTPUT_EXTENSION),
            flags: toolchain
                .default_flags()
                .iter()
                .map(|f| f.to_string())
                .collect(),
            timeout: DEFAULT_COMPILE_TIMEOUT,
            runner,
            log: String::new(),
        })
    }

    /// Replace the default flags
    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Change the executable extension
    pub fn with_output_extension(mut self, ext: &str) -> Self {
        self.executable = self.source.with_extension(ext);
        self
    }

    pub fn toolchain(&self) -> Toolchain {
        self.toolchain
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Compiler output of the last `compile()` call
    pub fn log(&self) -> &str {
        &self.log
    }

    /// Run the compiler
    ///
    /// Returns whether compilation succeeded. Failures (non-zero exit,
    /// timeout, compiler not startable) are described in `log()`.
    pub fn compile(&mut self) -> bool {
        let command = self
            .toolchain
            .command(&self.flags, &self.source, &self.executable);
        info!("Compiling {} with {}", self.source.display(), self.toolchain.program());

        match self.runner.run(&command, self.timeout) {
            Ok(out) => {
                self.log = out.output;
                match out.status {
                    ProcessStatus::Exited(0) => true,
                    ProcessStatus::TimedOut => {
                        self.log.push_str(&format!(
                            "\ncompilation timed out after {} seconds",
                            self.timeout.as_secs()
                        ));
                        false
                    }
                    status => {
                        debug!("{} {}", self.toolchain.program(), status);
                        false
                    }
                }
            }
            Err(e) => {
                self.log = format!("failed to run {}: {}", self.toolchain.program(), e);
                false
            }
        }
    }
}
