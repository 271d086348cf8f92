// src/cli.rs
//! Command-line interface of `sinolify-convert`

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use sinolify::Error;
use std::path::PathBuf;

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Error,
    #[default]
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sinolify-convert")]
#[command(version)]
#[command(about = "Convert a Sowa task package to a Sinol package", long_about = None)]
pub struct Cli {
    /// Sowa package to convert (zip)
    pub source: PathBuf,

    /// Where to write the Sinol package (zip)
    pub output: PathBuf,

    /// Overwrite the output if it exists
    #[arg(short, long)]
    pub force: bool,

    /// Derive time limits by measuring the main solution
    #[arg(short, long)]
    pub time_limits: bool,

    /// Number of parallel measurement workers
    #[arg(short = 'j', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub threads: u32,

    /// Checker mapping directory (containing find/ and replace/)
    #[arg(short, long, value_name = "DIR")]
    pub checkers: Option<PathBuf>,

    /// Convert without writing the output
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Log verbosity
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warning)]
    pub verbosity: LogLevel,
}

impl Cli {
    /// Checks that do not need the source package
    pub fn validate(&self) -> Result<()> {
        if self.output.extension().is_none_or(|ext| ext != "zip") {
            bail!("Output {} must be a .zip file", self.output.display());
        }
        if !self.dry_run && !self.force && self.output.exists() {
            return Err(Error::OutputExists(self.output.clone()).into());
        }
        Ok(())
    }
}
