#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Command-line front end of the processor probes in [`phased_bench`].
//!
//! The binary parses its command line into [`Args`], installs logging and hands over to
//! [`run()`], which prints everything to the given writer.

mod args;
mod config_file;
mod console_reporter;
mod cpu_info;
mod error;
mod words;

use std::io::Write;
use std::time::Duration;

pub use args::*;
pub use config_file::*;
pub use console_reporter::*;
pub use cpu_info::*;
pub use error::*;
use hw_topology::{ProcessorId, Topology};
use itertools::Itertools;
use phased_bench::{HyperthreadingProbe, LocalMemoryProbe, NumaProbe, Probe, RunConfiguration};
use tracing::info;
pub use words::*;

/// How a [`run()`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Outcome {
    /// Usage was shown and nothing else was done.
    UsageShown,
    /// Every selected probe ran.
    Completed,
}

/// Runs the probes selected by `args`, writing all output to `out`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a probe fails or `out` cannot be written.
pub fn run(args: &Args, out: &mut impl Write) -> Result<Outcome, CliError> {
    writeln!(out, "Utility to check CPU cores.")?;
    writeln!(out)?;

    let invocation = Invocation::from_words(args.words());

    if invocation.show_usage() {
        write_usage(out)?;
    }

    if invocation.exit() {
        return Ok(Outcome::UsageShown);
    }

    let config = build_configuration(args, &invocation)?;
    let topology = Topology::current();
    let cores = args.cores().cloned().unwrap_or_default().resolve(topology);

    info!(
        probes = %invocation.probes().iter().join(","),
        cores = cores.len(),
        "starting"
    );

    // `None` stands for the static topology display, which has nothing to measure.
    let probes: Vec<Option<Box<dyn Probe>>> = invocation
        .probes()
        .iter()
        .map(|&kind| benchmark_probe(kind, &cores))
        .collect();

    let total: Duration = probes
        .iter()
        .flatten()
        .map(|probe| probe.estimated_duration(&config))
        .sum();

    if !total.is_zero() {
        write_plan(out, &config, total)?;
    }

    for probe in &probes {
        if let Some(probe) = probe {
            let reporter = ConsoleReporter::new(&mut *out);
            probe.run(&config, &reporter)?;
            reporter.into_inner()?;
        } else {
            writeln!(out)?;
            write_cpu_info(topology, out)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Finished.")?;

    Ok(Outcome::Completed)
}

/// Defaults, then the configuration file, then command-line arguments.
fn build_configuration(
    args: &Args,
    invocation: &Invocation,
) -> Result<RunConfiguration, CliError> {
    let mut builder = RunConfiguration::builder();

    if let Some(path) = args.config() {
        builder = FileSettings::load(path)?.apply(builder);
    }

    if let Some(seconds) = invocation.seconds_per_phase() {
        builder = builder.seconds_per_phase(seconds);
    }

    if let Some(seconds) = args.warm_seconds() {
        builder = builder.warm_seconds(seconds);
    }

    if let Some(count) = args.repeat() {
        builder = builder.repeat_count(count);
    }

    if let Some(policy) = args.step_policy() {
        builder = builder.step_policy(policy);
    }

    if let Some(basis) = args.basis() {
        builder = builder.throughput_basis(basis);
    }

    Ok(builder.build()?)
}

/// The measuring probe for `kind`; `None` for the static topology display.
fn benchmark_probe(kind: ProbeKind, cores: &[ProcessorId]) -> Option<Box<dyn Probe>> {
    match kind {
        ProbeKind::CpuInfo => None,
        ProbeKind::Hyperthreading => Some(Box::new(HyperthreadingProbe::new(cores.to_vec()))),
        ProbeKind::LocalMemory => Some(Box::new(LocalMemoryProbe::new(cores.to_vec()))),
        ProbeKind::Numa => Some(Box::new(NumaProbe::new(cores.to_vec()))),
    }
}

fn write_usage(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Usage:")?;
    writeln!(
        out,
        "  cpu_probe [cpuinfo] [hyperthreading] [numa] [local] [seconds-per-phase] [options]"
    )?;
    writeln!(out, "  cpu_probe --help for the list of options")?;
    writeln!(out)
}

fn write_plan(
    out: &mut impl Write,
    config: &RunConfiguration,
    total: Duration,
) -> std::io::Result<()> {
    writeln!(out, "Run probes:")?;
    writeln!(
        out,
        "Use {:?} per phase, {} phase(s) per cycle after {:?} of warm-up.",
        config.phase_duration(),
        config.repeat_count(),
        config.warm_duration()
    )?;
    writeln!(out, "It will take around: {}s", total.as_secs())?;
    writeln!(out)?;
    writeln!(
        out,
        "The hyperthreading probe runs a compute workload on every pair of processors. \
         Siblings slow each other down."
    )?;
    writeln!(
        out,
        "The local memory probe walks a private buffer on every processor. It is the \
         baseline for the NUMA probe."
    )?;
    writeln!(
        out,
        "The NUMA probe walks one buffer shared by all processors. Processors far from \
         its memory are slower."
    )
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fs;

    use phased_bench::{BenchmarkError, StepPolicy};

    use super::*;

    fn args(items: &[&str]) -> Args {
        let items: Vec<String> = items.iter().map(ToString::to_string).collect();
        Args::parse("cpu_probe", &items).unwrap()
    }

    fn run_to_string(args: &Args) -> (Result<Outcome, CliError>, String) {
        let mut out = Vec::new();
        let result = run(args, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn help_word_only_shows_usage() {
        let (result, text) = run_to_string(&args(&["help"]));

        assert_eq!(result.unwrap(), Outcome::UsageShown);
        assert!(text.contains("Usage:"));
        assert!(!text.contains("General processor info"));
    }

    #[test]
    fn cpuinfo_alone_has_no_plan() {
        let (result, text) = run_to_string(&args(&["cpu"]));

        assert_eq!(result.unwrap(), Outcome::Completed);
        assert!(!text.contains("Usage:"));
        assert!(!text.contains("It will take around"));
        assert!(text.contains("General processor info:"));
        assert!(text.ends_with("Finished.\n"));
    }

    #[test]
    fn invalid_phase_length_is_an_error() {
        let (result, _) = run_to_string(&args(&["cpu", "-2"]));

        assert!(matches!(
            result,
            Err(CliError::Benchmark(BenchmarkError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn arguments_override_configuration_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        fs::write(&path, "repeat_count = 9\nwarm_seconds = 4\nstep_policy = \"fixed\"\n").unwrap();

        let path = path.to_str().unwrap();
        let args = args(&["--config", path, "--repeat", "2", "1.5"]);
        let invocation = Invocation::from_words(args.words());

        let config = build_configuration(&args, &invocation).unwrap();

        assert_eq!(config.repeat_count().get(), 2);
        assert_eq!(config.warm_duration(), Duration::from_secs(4));
        assert_eq!(config.phase_duration(), Duration::from_millis(1500));
        assert_eq!(config.step_policy(), StepPolicy::FixedStride);
    }

    #[test]
    fn cpuinfo_has_no_measuring_probe() {
        assert!(benchmark_probe(ProbeKind::CpuInfo, &[0]).is_none());

        let probe = benchmark_probe(ProbeKind::Numa, &[0, 1]).unwrap();
        assert_eq!(probe.name(), "numa");
    }
}
