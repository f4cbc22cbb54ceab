use std::time::Duration;

use hw_topology::{ProcessorId, Topology};

use crate::{
    BenchmarkError, CoreSelection, Probe, ProbeReport, Reporter, RunConfiguration, WorkloadKind,
    pair_cycle_count, run_pairwise,
};

/// Runs the compute workload on every pair of cores, one pair at a time.
///
/// The result matrix holds, for each pair, the mean of the two cores' best throughput; the
/// diagonal holds each core running alone. Hyperthreading siblings share one physical core and
/// show up as a mutual row minimum well below their solo throughput
/// (see [`PairMatrix::likely_siblings()`][crate::PairMatrix::likely_siblings]).
#[derive(Clone, Debug)]
pub struct HyperthreadingProbe {
    cores: Vec<ProcessorId>,
}

impl HyperthreadingProbe {
    /// Probes the given cores, in this order.
    #[must_use]
    pub fn new(cores: Vec<ProcessorId>) -> Self {
        Self { cores }
    }

    /// Probes the cores of the current process that match `selection`.
    #[must_use]
    pub fn with_selection(selection: &CoreSelection) -> Self {
        Self::new(selection.resolve(Topology::current()))
    }

    /// The cores this probe runs on.
    #[must_use]
    pub fn cores(&self) -> &[ProcessorId] {
        &self.cores
    }
}

impl Probe for HyperthreadingProbe {
    fn name(&self) -> &'static str {
        "hyperthreading"
    }

    fn estimated_duration(&self, config: &RunConfiguration) -> Duration {
        let cycles = u32::try_from(pair_cycle_count(self.cores.len())).unwrap_or(u32::MAX);

        config.cycle_duration().saturating_mul(cycles)
    }

    fn run(
        &self,
        config: &RunConfiguration,
        reporter: &dyn Reporter,
    ) -> Result<ProbeReport, BenchmarkError> {
        reporter.probe_started(self.name());
        reporter.progress_started(pair_cycle_count(self.cores.len()));

        let matrix = run_pairwise(config, &self.cores, &WorkloadKind::Prime, || {
            reporter.progress_tick();
        })?;

        reporter.progress_completed();
        reporter.matrix(&matrix);
        reporter.probe_completed();

        Ok(ProbeReport::Matrix(matrix))
    }
}
