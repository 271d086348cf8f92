// src/heuristics/mod.rs

//! Heuristics deriving package configuration from measurements

pub mod limits;

pub use limits::{TimeLimit, TimeLimitEstimator, pick_time_limit};
