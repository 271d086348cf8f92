// src/convert/mod.rs

//! Package conversion
//!
//! - `base`: rule-driven copying with claim tracking
//! - `mapping`: content-addressed checker replacements
//! - `config`: generated `config.yml`
//! - `sowa`: the Sowa to Sinol ruleset

pub mod base;
pub mod config;
pub mod mapping;
pub mod sowa;

pub use base::{ConversionRule, Converter, Rewrite};
pub use config::{SinolConfig, extract_title, test_name};
pub use mapping::{ConversionMapping, MappingMatch};
pub use sowa::{CheckerOutcome, ConversionReport, SowaToSinolConverter};
