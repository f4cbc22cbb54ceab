use std::time::Duration;

use hw_topology::{ProcessorId, Topology};

use crate::probes::run_subset_probe;
use crate::{
    BenchmarkError, CoreSelection, Probe, ProbeReport, Reporter, RunConfiguration, WorkloadKind,
};

/// Runs the memory workload on all cores at once, each over a private buffer that its own
/// pinned thread allocates and fills.
#[derive(Clone, Debug)]
pub struct LocalMemoryProbe {
    cores: Vec<ProcessorId>,
}

impl LocalMemoryProbe {
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

impl Probe for LocalMemoryProbe {
    fn name(&self) -> &'static str {
        "local memory"
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

        let workload = WorkloadKind::LocalMemory {
            words: config.local_buffer_words(),
            policy: config.step_policy(),
        };

        run_subset_probe(self.name(), config, reporter, &self.cores, &workload)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use testing::with_watchdog;

    use super::*;
    use crate::MockReporter;
    use crate::probes::test_config;

    #[test]
    fn reports_one_entry_per_core_without_initializing() {
        with_watchdog(|| {
            let cores = test_config::two_cores();
            let expected = cores.clone();

            let mut reporter = MockReporter::new();

            reporter.expect_probe_started().times(1).return_const(());
            reporter.expect_initializing().never();
            reporter.expect_progress_started().times(1).return_const(());
            reporter.expect_progress_tick().times(1).return_const(());
            reporter.expect_progress_completed().times(1).return_const(());
            reporter
                .expect_vector()
                .withf(move |vector| {
                    vector
                        .entries()
                        .iter()
                        .map(|(core, _)| *core)
                        .eq(expected.iter().copied())
                })
                .times(1)
                .return_const(());
            reporter.expect_probe_completed().times(1).return_const(());

            LocalMemoryProbe::new(cores)
                .run(&test_config::quick(), &reporter)
                .unwrap();
        });
    }

    #[test]
    fn empty_core_set_is_an_error() {
        let mut reporter = MockReporter::new();

        reporter.expect_probe_started().return_const(());
        reporter.expect_progress_started().return_const(());
        reporter.expect_vector().never();

        let result = LocalMemoryProbe::new(Vec::new()).run(&test_config::quick(), &reporter);

        assert!(matches!(result, Err(BenchmarkError::NoParticipants)));
    }
}
