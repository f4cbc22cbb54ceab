//! The processors the current process may use, as reported by `many_cpus`.

use itertools::Itertools;
use many_cpus::ProcessorSet;

use crate::{NumaNodeId, ProcessorId};

/// Every processor the current process may use, with its NUMA node, in ascending ID order.
///
/// The resource quota of the process is ignored, every processor is measured on its own.
pub(crate) fn available_processors() -> Vec<(ProcessorId, NumaNodeId)> {
    ProcessorSet::builder()
        .ignoring_resource_quota()
        .take_all()
        .map(|set| {
            set.processors()
                .iter()
                .map(|processor| (processor.id(), processor.memory_region_id()))
                .sorted_unstable()
                .collect()
        })
        .unwrap_or_default()
}

/// A single-processor set for `processor_id`, if the current process may use that processor.
pub(crate) fn available_processor(processor_id: ProcessorId) -> Option<ProcessorSet> {
    ProcessorSet::builder()
        .ignoring_resource_quota()
        .filter(|processor| processor.id() == processor_id)
        .take_all()
}
