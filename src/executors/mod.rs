// src/executors/mod.rs

//! Running external programs: compilers and instrumented solution runs

pub mod compiler;
pub mod process;
pub mod timer;

pub use compiler::{Compiler, Toolchain};
pub use process::{CommandOutput, CommandRunner, CommandSpec, ProcessStatus, SystemRunner};
pub use timer::{PerfTimer, Timer, TimerMeasurement, TimerPool};
