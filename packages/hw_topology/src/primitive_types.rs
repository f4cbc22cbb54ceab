/// Identifies a logical processor.
///
/// This matches the numeric identifier used by standard tooling of the operating system. The
/// values are not guaranteed to be contiguous or to start from zero.
pub type ProcessorId = many_cpus::ProcessorId;

/// Identifies a NUMA node. This is the memory region ID reported by `many_cpus`.
pub type NumaNodeId = many_cpus::MemoryRegionId;

/// Index of a processor group. Platforms without processor groups report a single group 0.
pub type ProcessorGroupIndex = u16;
