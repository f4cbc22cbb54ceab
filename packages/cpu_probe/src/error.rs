use std::io;
use std::path::PathBuf;

use phased_bench::BenchmarkError;
use thiserror::Error;

/// Why the tool failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CliError {
    /// The configuration file could not be read.
    #[error("cannot read configuration file '{}': {source}", path.display())]
    ConfigRead {
        /// Path as given on the command line.
        path: PathBuf,
        /// What went wrong.
        source: io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("configuration file '{}' is not valid TOML: {source}", path.display())]
    ConfigSyntax {
        /// Path as given on the command line.
        path: PathBuf,
        /// What went wrong.
        source: toml::de::Error,
    },

    /// A configuration file key has a value of the wrong type or range.
    #[error("configuration key '{key}': {problem}")]
    ConfigValue {
        /// The offending key.
        key: String,
        /// Human-readable description of the problem.
        problem: String,
    },

    /// The run configuration or a probe failed.
    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),

    /// Writing the output failed.
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}
