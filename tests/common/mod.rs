// tests/common/mod.rs

//! Shared helpers for integration tests: Sowa archives, mapping
//! directories and a fake toolchain.

#![allow(dead_code)]

use sinolify::executors::{CommandOutput, CommandRunner, CommandSpec, ProcessStatus};
use sinolify::{
    ConversionMapping, ConversionReport, Package, SowaToSinolConverter, TimeLimitEstimator,
};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Files of the smallest package that converts cleanly
pub const MINIMAL_TASK: &[(&str, &[u8])] = &[
    ("in/abc1.in", b"1 2\n"),
    ("in/abc2.in", b"3 4\n"),
    ("out/abc1.out", b"3\n"),
    ("out/abc2.out", b"7\n"),
    ("sol/abc.cpp", b"int main() { return 0; }\n"),
    ("doc/abc.pdf", b"%PDF-1.4\n"),
];

/// Write `<dir>/<id>.zip` holding `files` under the `<id>/` directory
pub fn write_sowa_zip(dir: &Path, id: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(format!("{}.zip", id));
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    for (name, content) in files {
        zip.start_file(format!("{}/{}", id, name), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// `files` plus extra entries
pub fn with_files<'a>(
    files: &[(&'a str, &'a [u8])],
    extra: &[(&'a str, &'a [u8])],
) -> Vec<(&'a str, &'a [u8])> {
    files.iter().chain(extra).copied().collect()
}

/// Entry names of a zip archive
pub fn zip_entries(path: &Path) -> BTreeSet<String> {
    let zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    zip.file_names().map(String::from).collect()
}

/// Contents of one zip entry
pub fn zip_entry(path: &Path, name: &str) -> String {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut contents = String::new();
    zip.by_name(name)
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    contents
}

/// Empty checker mapping directory
pub fn mapping_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("find")).unwrap();
    fs::create_dir(dir.path().join("replace")).unwrap();
    dir
}

/// Options of one conversion run
#[derive(Default)]
pub struct RunOptions {
    pub checkers: Option<PathBuf>,
    pub estimator: Option<TimeLimitEstimator>,
    pub overwrite: bool,
}

/// Load, convert and save the way `sinolify-convert` does
pub fn convert_archive(
    source: &Path,
    output: &Path,
    options: RunOptions,
) -> sinolify::Result<ConversionReport> {
    let mapping = options
        .checkers
        .as_deref()
        .map(ConversionMapping::open)
        .transpose()?;
    let source = Package::load(source, None)?;
    let target = Package::create(source.id())?;

    let mut converter = SowaToSinolConverter::new(&source, &target);
    if let Some(mapping) = mapping {
        converter = converter.with_checkers(mapping);
    }
    if let Some(estimator) = options.estimator {
        converter = converter.with_time_limits(estimator);
    }
    let report = converter.convert()?;
    target.save(output, options.overwrite)?;
    Ok(report)
}

/// Compiles anything and reports a fixed instruction count for every run
pub struct FakeToolchain {
    pub instructions: u64,
}

impl CommandRunner for FakeToolchain {
    fn run(&self, command: &CommandSpec, _timeout: Duration) -> sinolify::Result<CommandOutput> {
        if command.program_name() == "perf" {
            let report = command
                .args
                .iter()
                .filter_map(|a| a.to_str())
                .find_map(|a| a.strip_prefix("-o"))
                .unwrap();
            fs::write(report, format!("{},,instructions,,,\n", self.instructions))?;
        }
        Ok(CommandOutput {
            status: ProcessStatus::Exited(0),
            output: String::new(),
        })
    }
}

/// Estimator that measures with `FakeToolchain`
pub fn fake_estimator(instructions: u64) -> TimeLimitEstimator {
    TimeLimitEstimator::new()
        .with_runner(Arc::new(FakeToolchain { instructions }))
        .with_tools(Path::new("/usr/bin/perf"), Path::new("/bin/bash"))
        .with_threads(2)
}
