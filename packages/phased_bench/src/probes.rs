//! Probes turn a scheduling mode and a workload into one hardware fact.
//!
//! * [`HyperthreadingProbe`] runs every pair of cores against each other with a compute workload.
//!   Pairs that slow each other down the most are likely hyperthreading siblings.
//! * [`NumaProbe`] runs all cores at once over one shared memory buffer. Cores far from the
//!   memory that backs the buffer show lower throughput.
//! * [`LocalMemoryProbe`] is the same run with a private buffer per core, the baseline for
//!   reading [`NumaProbe`] results.

use std::time::Duration;

use crate::{BenchmarkError, CoreVector, PairMatrix, Reporter, RunConfiguration};

mod hyperthreading;
mod local_memory;
mod numa;
mod selection;

pub use hyperthreading::*;
pub use local_memory::*;
pub use numa::*;
pub use selection::*;

/// A measurement that reports its progress and result through a [`Reporter`].
pub trait Probe {
    /// Short human-readable name.
    fn name(&self) -> &'static str;

    /// How long [`run()`][Self::run] is expected to take with `config`.
    fn estimated_duration(&self, config: &RunConfiguration) -> Duration;

    /// Runs the probe to completion.
    ///
    /// # Errors
    ///
    /// Returns the first error of any scheduling cycle. The reporter sees no result in that case.
    fn run(
        &self,
        config: &RunConfiguration,
        reporter: &dyn Reporter,
    ) -> Result<ProbeReport, BenchmarkError>;
}

/// What a [`Probe`] produced.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ProbeReport {
    /// Pairwise result.
    Matrix(PairMatrix),
    /// Per-core result.
    Vector(CoreVector),
}

/// Runs one subset-mode probe: a single scheduling cycle reported as a vector.
fn run_subset_probe(
    name: &str,
    config: &RunConfiguration,
    reporter: &dyn Reporter,
    cores: &[hw_topology::ProcessorId],
    workload: &crate::WorkloadKind,
) -> Result<ProbeReport, BenchmarkError> {
    reporter.progress_started(1);

    let vector = crate::run_subset(config, cores, workload)?;

    reporter.progress_tick();
    reporter.progress_completed();

    tracing::debug!(probe = name, cores = vector.len(), "probe measured");

    reporter.vector(&vector);
    reporter.probe_completed();

    Ok(ProbeReport::Vector(vector))
}
