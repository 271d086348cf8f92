// src/error.rs

//! Error types shared by the whole crate
//!
//! Every condition the converter treats as fatal has its own variant, so the
//! CLI can print a precise message and tests can match on the cause.
//! Conditions that are only worth a warning never become an `Error`; they
//! are logged with `tracing::warn!` where they are detected.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a conversion
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading or writing package files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive could not be read or written
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Package tree could not be walked
    #[error("failed to walk package tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// A path pattern is not a valid regular expression
    #[error("invalid path pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Measurement worker pool could not be created
    #[error("failed to start measurement pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Archive layout does not describe a single task package
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// Loaded package ID differs from the expected one
    #[error("wrong task ID: expected '{expected}', found '{found}'")]
    WrongPackageId { expected: String, found: String },

    /// A required part of the source package is missing
    #[error("{0}")]
    MissingRequired(String),

    /// A pattern that must match at most one path matched several
    #[error("expected at most one file matching '{pattern}', found {}: {}", .paths.len(), .paths.join(", "))]
    Ambiguous { pattern: String, paths: Vec<String> },

    /// Source package has a checker but no mapping was configured
    #[error("Checker found but no checker mapping was set up")]
    CheckerUnmapped,

    /// Checker content was unknown and has been enrolled for manual review
    #[error(
        "Putting the checker in mapper as {key}. Please provide a working checker at {} and rerun.",
        .todo.display()
    )]
    CheckerEnrolled { key: String, todo: PathBuf },

    /// Checker approval is recorded but its replacement file is absent
    #[error(
        "Unable to find a replacement for the checker in checker mapper: {} does not exist",
        .path.display()
    )]
    ReplacementMissing { key: String, path: PathBuf },

    /// Checker mapping directory does not have the expected layout
    #[error("malformed checker mapping: {0}")]
    MappingLayout(String),

    /// No toolchain is registered for the source extension
    #[error("Unknown source code extension '{0}'")]
    UnsupportedExtension(String),

    /// Reference solution did not compile
    #[error("Failed to compile the solution {}:\n{log}", .source_path.display())]
    CompileFailed { source_path: PathBuf, log: String },

    /// A measured run did not finish in time
    #[error("Model solution execution timed out after {}s on {}", .timeout.as_secs(), .input.display())]
    Timeout { input: PathBuf, timeout: Duration },

    /// A measured run exited unsuccessfully
    #[error("Model solution {status} on {}", .input.display())]
    ExecutionFailed { input: PathBuf, status: String },

    /// Instruction counter output could not be interpreted
    #[error("unable to read instruction count from perf output: {0}")]
    MeasurementParse(String),

    /// An external tool is not available on PATH
    #[error("{0} is not installed or not on PATH")]
    ToolNotFound(String),

    /// Time limits were requested for a package without inputs
    #[error("no inputs to measure")]
    NoInputs,

    /// Output archive exists and overwriting was not requested
    #[error("Output {} exists. Use -f to overwrite.", .0.display())]
    OutputExists(PathBuf),

    /// Broken internal invariant
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an error for a missing required package part
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingRequired(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
