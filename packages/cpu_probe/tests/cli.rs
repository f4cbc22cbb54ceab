//! Runs the built binary the way a user would.

#![cfg(not(miri))]

use std::process::{Command, Output};

use hw_topology::Topology;

fn cpu_probe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cpu_probe"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_word_prints_usage_and_succeeds() {
    let output = cpu_probe(&["/?"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage:"));
    assert!(!stdout(&output).contains("General processor info"));
}

#[test]
fn help_switch_lists_options() {
    let output = cpu_probe(&["--help"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("--step-policy"));
}

#[test]
fn cpuinfo_prints_topology() {
    let output = cpu_probe(&["cpuinfo"]);

    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("General processor info:"));
    assert!(text.contains("Process affinity:"));
    assert!(text.ends_with("Finished.\n"));
}

#[test]
fn invalid_option_value_fails() {
    let output = cpu_probe(&["--repeat", "many"]);

    assert!(!output.status.success());
}

#[test]
fn invalid_phase_length_fails_with_message() {
    let output = cpu_probe(&["cpu", "-5"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn short_hyperthreading_run_on_one_core() {
    let core = Topology::current().allowed_processors()[0].to_string();

    let output = cpu_probe(&[
        "hyper",
        "0.05",
        "--warm-seconds",
        "0",
        "--repeat",
        "1",
        "--cores",
        &core,
    ]);

    assert!(output.status.success(), "{output:?}");

    let text = stdout(&output);
    assert!(text.contains("It will take around"));
    assert!(text.contains("Operations per millisecond, by pair:"));
    assert!(text.contains("Percent of best pair:"));
}

#[test]
fn verbose_logs_to_stderr() {
    let core = Topology::current().allowed_processors()[0].to_string();

    let output = cpu_probe(&[
        "--verbose",
        "local",
        "0.05",
        "--warm-seconds",
        "0",
        "--repeat",
        "1",
        "--cores",
        &core,
    ]);

    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("phase advanced"));
    assert!(!stdout(&output).contains("phase advanced"));
}
