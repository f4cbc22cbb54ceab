use std::path::PathBuf;

use argh::FromArgs;
use phased_bench::{CoreSelection, StepPolicy, ThroughputBasis};

/// Options that take a value. Everything else starting with `--` is a switch.
const VALUE_OPTIONS: &[&str] = &[
    "--warm-seconds",
    "--repeat",
    "--step-policy",
    "--basis",
    "--cores",
    "--config",
];

/// Benchmarks logical processors against each other to detect hyperthreading siblings and NUMA
/// nodes.
///
/// Words: cpuinfo (cpu), hyperthreading (hyper, cores), numa (socket, sockets, numanode,
/// numanodes), local (baseline), help (?, h) and one number, the seconds per measurement phase.
#[derive(Debug, Default, FromArgs)]
pub struct Args {
    /// seconds of warm-up before the measurement phases of every cycle
    #[argh(option)]
    warm_seconds: Option<f64>,

    /// number of measurement phases per cycle
    #[argh(option)]
    repeat: Option<u32>,

    /// how memory workloads step through their buffer (randomized, fixed)
    #[argh(option)]
    step_policy: Option<StepPolicy>,

    /// duration throughput is computed against (processor, wall)
    #[argh(option)]
    basis: Option<ThroughputBasis>,

    /// processors to probe (all, even, odd or a cpulist such as 0-3,8)
    #[argh(option)]
    cores: Option<CoreSelection>,

    /// TOML configuration file with defaults for the options above
    #[argh(option)]
    config: Option<PathBuf>,

    /// log debug events to stderr
    #[argh(switch)]
    verbose: bool,

    /// probes to run, help words and seconds per measurement phase
    #[argh(positional)]
    words: Vec<String>,
}

impl Args {
    /// Parses the process command line, without the program name.
    ///
    /// Probe words may carry a leading `-`, `/` or `\`, which a plain option parser would take
    /// for an unknown option, so they are moved behind a `--` first.
    ///
    /// # Errors
    ///
    /// Returns the parser's early exit: the help text or a description of the invalid argument.
    pub fn parse(program_name: &str, arguments: &[String]) -> Result<Self, argh::EarlyExit> {
        let arranged = arrange(arguments);
        let arranged: Vec<&str> = arranged.iter().map(String::as_str).collect();

        Self::from_args(&[program_name], &arranged)
    }

    pub(crate) fn warm_seconds(&self) -> Option<f64> {
        self.warm_seconds
    }

    pub(crate) fn repeat(&self) -> Option<u32> {
        self.repeat
    }

    pub(crate) fn step_policy(&self) -> Option<StepPolicy> {
        self.step_policy
    }

    pub(crate) fn basis(&self) -> Option<ThroughputBasis> {
        self.basis
    }

    pub(crate) fn cores(&self) -> Option<&CoreSelection> {
        self.cores.as_ref()
    }

    pub(crate) fn config(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    /// Whether debug logging was requested.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub(crate) fn words(&self) -> &[String] {
        &self.words
    }
}

/// Options (with their values) first, then `--`, then all other words in their original order.
fn arrange(arguments: &[String]) -> Vec<String> {
    let mut options = Vec::new();
    let mut words = Vec::new();

    let mut remaining = arguments.iter();

    while let Some(argument) = remaining.next() {
        if argument == "--" {
            words.extend(remaining.by_ref().cloned());
            break;
        }

        if !argument.starts_with("--") {
            words.push(argument.clone());
            continue;
        }

        options.push(argument.clone());

        if VALUE_OPTIONS.contains(&argument.as_str()) {
            if let Some(value) = remaining.next() {
                options.push(value.clone());
            }
        }
    }

    if !words.is_empty() {
        options.push("--".to_string());
        options.extend(words);
    }

    options
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn parse(items: &[&str]) -> Args {
        Args::parse("cpu_probe", &strings(items)).unwrap()
    }

    #[test]
    fn arrange_moves_words_behind_separator() {
        assert_eq!(
            arrange(&strings(&["-hyper", "--repeat", "3", "/numa", "--verbose", "2.5"])),
            strings(&["--repeat", "3", "--verbose", "--", "-hyper", "/numa", "2.5"])
        );
    }

    #[test]
    fn arrange_without_words_has_no_separator() {
        assert_eq!(
            arrange(&strings(&["--basis", "wall"])),
            strings(&["--basis", "wall"])
        );
        assert!(arrange(&[]).is_empty());
    }

    #[test]
    fn arrange_keeps_explicit_separator() {
        assert_eq!(
            arrange(&strings(&["--verbose", "--", "--repeat"])),
            strings(&["--verbose", "--", "--repeat"])
        );
    }

    #[test]
    fn parse_options_and_words() {
        let args = parse(&[
            "\\cpu",
            "--warm-seconds",
            "1.5",
            "--step-policy",
            "fixed",
            "--basis",
            "wall",
            "--cores",
            "even",
            "4",
        ]);

        assert_eq!(args.warm_seconds(), Some(1.5));
        assert_eq!(args.repeat(), None);
        assert_eq!(args.step_policy(), Some(StepPolicy::FixedStride));
        assert_eq!(args.basis(), Some(ThroughputBasis::WallClock));
        assert_eq!(args.cores(), Some(&CoreSelection::Even));
        assert!(!args.verbose());
        assert_eq!(args.words(), strings(&["\\cpu", "4"]).as_slice());
    }

    #[test]
    fn invalid_option_value_is_rejected() {
        let early_exit = Args::parse("cpu_probe", &strings(&["--repeat", "many"])).unwrap_err();

        assert!(early_exit.status.is_err());
    }

    #[test]
    fn help_switch_exits_early() {
        let early_exit = Args::parse("cpu_probe", &strings(&["--help"])).unwrap_err();

        assert!(early_exit.status.is_ok());
        assert!(early_exit.output.contains("--warm-seconds"));
    }
}
