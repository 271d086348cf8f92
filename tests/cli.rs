// tests/cli.rs
//! Command-line behaviour of `sinolify-convert`
//!
//! These run the built binary: argument validation, the checker mapping
//! check that happens before the source is read, dry runs and overwrite
//! protection.

mod common;

use common::{MINIMAL_TASK, write_sowa_zip, zip_entries};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn convert(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sinolify-convert"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute sinolify-convert")
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_output_must_be_zip() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_sowa_zip(dir.path(), "abc", MINIMAL_TASK);
    let output = dir.path().join("abc.tar");

    let out = convert(&[arg(&source), arg(&output)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("must be a .zip file"), "{}", stderr(&out));
    assert!(!output.exists());
}

#[test]
fn test_bad_mapping_fails_before_loading_source() {
    let dir = tempfile::tempdir().unwrap();
    let checkers = dir.path().join("checkers");
    fs::create_dir(&checkers).unwrap();
    let missing_source = dir.path().join("missing.zip");
    let output = dir.path().join("out.zip");

    let out = convert(&["-c", arg(&checkers), arg(&missing_source), arg(&output)]);
    let err = stderr(&out);
    assert!(!out.status.success());
    assert!(err.contains("Cannot use checker mapping"), "{}", err);
    assert!(!err.contains("Failed to load"), "{}", err);
    assert!(!output.exists());
}

#[test]
fn test_unreadable_source() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.zip");

    let out = convert(&[arg(&dir.path().join("missing.zip")), arg(&output)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Failed to load"), "{}", stderr(&out));
}

// =============================================================================
// Output handling
// =============================================================================

#[test]
fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_sowa_zip(dir.path(), "abc", MINIMAL_TASK);
    let output = dir.path().join("out.zip");

    let out = convert(&["-n", arg(&source), arg(&output)]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(!output.exists());
}

#[test]
fn test_dry_run_still_reports_conversion_errors() {
    let dir = tempfile::tempdir().unwrap();
    let no_statement: Vec<_> = MINIMAL_TASK
        .iter()
        .copied()
        .filter(|(name, _)| !name.starts_with("doc/"))
        .collect();
    let source = write_sowa_zip(dir.path(), "abc", &no_statement);
    let output = dir.path().join("out.zip");

    let out = convert(&["-n", arg(&source), arg(&output)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("No problem statement"), "{}", stderr(&out));
    assert!(!output.exists());
}

#[test]
fn test_convert_and_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_sowa_zip(dir.path(), "abc", MINIMAL_TASK);
    let output = dir.path().join("out.zip");

    let out = convert(&[arg(&source), arg(&output)]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(zip_entries(&output).contains("abc/config.yml"));

    fs::write(&output, b"keep me").unwrap();
    let out = convert(&[arg(&source), arg(&output)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Use -f to overwrite"), "{}", stderr(&out));
    assert_eq!(fs::read(&output).unwrap(), b"keep me");

    let out = convert(&["-f", arg(&source), arg(&output)]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(zip_entries(&output).contains("abc/prog/abc1.cpp"));
}
