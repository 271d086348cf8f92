// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, LogLevel};
use sinolify::{ConversionMapping, Package, SowaToSinolConverter, TimeLimitEstimator};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Log to stderr as `LEVEL message`; `RUST_LOG` takes precedence over `-v`
fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    cli.validate()?;

    let mapping = match &cli.checkers {
        Some(dir) => {
            info!("Setting up checker mapping {}", dir.display());
            Some(
                ConversionMapping::open(dir)
                    .with_context(|| format!("Cannot use checker mapping {}", dir.display()))?,
            )
        }
        None => None,
    };

    let source = Package::load(&cli.source, None)
        .with_context(|| format!("Failed to load {}", cli.source.display()))?;
    let target = Package::create(source.id())?;

    let mut converter = SowaToSinolConverter::new(&source, &target);
    if let Some(mapping) = mapping {
        converter = converter.with_checkers(mapping);
    }
    if cli.time_limits {
        converter =
            converter.with_time_limits(TimeLimitEstimator::new().with_threads(cli.threads as usize));
    }

    let report = converter.convert()?;
    info!(
        "Converted '{}': {} file(s) copied, {} not processed",
        source.id(),
        report.copied,
        report.unprocessed.len()
    );
    if let Some(limit) = report.time_limit {
        info!("Time limit set to {}", limit);
    }

    if cli.dry_run {
        info!("Dry run, not writing {}", cli.output.display());
        return Ok(());
    }
    target.save(&cli.output, cli.force)?;
    info!("Saved {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
