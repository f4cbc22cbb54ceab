use std::sync::Arc;
use std::time::Duration;

use hw_topology::{ProcessorId, Topology};

use crate::probes::run_subset_probe;
use crate::{
    BenchmarkError, CoreSelection, Probe, ProbeReport, Reporter, RunConfiguration, WorkloadKind,
    random_buffer,
};

/// Runs the shared-memory workload on all cores at once, over one buffer allocated before the
/// run.
///
/// The buffer's memory lands on whichever NUMA node the allocating thread touched it from.
/// Cores on other nodes pay for remote access and report lower throughput than in
/// [`LocalMemoryProbe`][crate::LocalMemoryProbe].
#[derive(Clone, Debug)]
pub struct NumaProbe {
    cores: Vec<ProcessorId>,
}

impl NumaProbe {
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

impl Probe for NumaProbe {
    fn name(&self) -> &'static str {
        "numa"
    }

    fn estimated_duration(&self, config: &RunConfiguration) -> Duration {
        config.cycle_duration()
    }

    fn run(
        &self,
        config: &RunConfiguration,
        reporter: &dyn Reporter,
    ) -> Result<ProbeReport, BenchmarkError> {
        reporter.probe_started(self.name());
        reporter.initializing();

        let buffer: Arc<[u32]> = random_buffer(config.shared_buffer_words()).into();

        let workload = WorkloadKind::SharedMemory {
            buffer,
            policy: config.step_policy(),
        };

        run_subset_probe(self.name(), config, reporter, &self.cores, &workload)
    }
}
