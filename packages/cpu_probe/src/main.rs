#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point of the processor probing tool.
//!
//! Excluded from mutation testing; the logic lives in the library and is tested there.

use std::io;
use std::process::ExitCode;

use cpu_probe::{Args, run};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    let mut env_args = std::env::args();
    let program_name = env_args.next().unwrap_or_else(|| "cpu_probe".to_string());
    let arguments: Vec<String> = env_args.collect();

    let args = match Args::parse(&program_name, &arguments) {
        Ok(args) => args,
        Err(early_exit) => {
            return if early_exit.status.is_ok() {
                println!("{}", early_exit.output);
                ExitCode::SUCCESS
            } else {
                eprintln!("{}", early_exit.output);
                ExitCode::FAILURE
            };
        }
    };

    init_logging(args.verbose());

    match run(&args, &mut io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Events go to stderr, filtered by `RUST_LOG`. Without it, only warnings and errors are shown,
/// or everything from debug up with `--verbose`.
#[cfg_attr(test, mutants::skip)]
fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
