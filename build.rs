// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn flag(name: &'static str, long: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(long)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("sinolify-convert")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert a Sowa task package to a Sinol package")
        .arg(Arg::new("source").required(true).help("Sowa package to convert (zip)"))
        .arg(Arg::new("output").required(true).help("Where to write the Sinol package (zip)"))
        .arg(flag("force", "force", 'f', "Overwrite the output if it exists"))
        .arg(flag(
            "time_limits",
            "time-limits",
            't',
            "Derive time limits by measuring the main solution",
        ))
        .arg(
            Arg::new("threads")
                .short('j')
                .long("threads")
                .value_name("N")
                .default_value("1")
                .help("Number of parallel measurement workers"),
        )
        .arg(
            Arg::new("checkers")
                .short('c')
                .long("checkers")
                .value_name("DIR")
                .help("Checker mapping directory (containing find/ and replace/)"),
        )
        .arg(flag("dry_run", "dry-run", 'n', "Convert without writing the output"))
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .value_parser(["error", "warning", "info", "debug"])
                .default_value("warning")
                .help("Log verbosity"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("sinolify-convert.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
