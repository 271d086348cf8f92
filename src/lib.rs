// src/lib.rs

//! sinolify: task package conversion
//!
//! Converts programming-contest task packages from the Sowa layout to the
//! Sinol layout.
//!
//! # Architecture
//!
//! - Packages: zip archives extracted into private scratch workspaces
//! - Conversion: ordered copy rules that claim source files; anything
//!   left unclaimed is reported
//! - Checkers: replaced through a content-addressed mapping kept on disk
//! - Time limits: instruction counts of the model solution measured on a
//!   bounded worker pool

pub mod convert;
mod error;
pub mod executors;
pub mod hash;
pub mod heuristics;
pub mod package;

pub use convert::{
    CheckerOutcome, ConversionMapping, ConversionReport, ConversionRule, Converter,
    SowaToSinolConverter,
};
pub use error::{Error, Result};
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use heuristics::{TimeLimit, TimeLimitEstimator};
pub use package::Package;
