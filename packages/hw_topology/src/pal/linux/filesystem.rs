use std::fmt::Debug;
use std::fs;

use crate::ProcessorId;

/// The parts of the Linux virtual filesystem that describe how processors share hardware.
///
/// Every getter returns `None` if the file does not exist or cannot be read. Some of these files
/// are absent in containers, virtual machines and older kernels, so callers must degrade
/// gracefully instead of failing.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Filesystem: Debug + Send + Sync + 'static {
    /// Contents of `/sys/devices/system/cpu/cpu{processor_id}/topology/{name}`.
    fn cpu_topology_attribute(&self, processor_id: ProcessorId, name: &str) -> Option<String>;

    /// Contents of `/sys/devices/system/cpu/cpu{processor_id}/cache/index{index}/{name}`.
    fn cpu_cache_attribute(&self, processor_id: ProcessorId, index: u32, name: &str)
    -> Option<String>;
}

#[derive(Debug)]
pub(crate) struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn cpu_topology_attribute(&self, processor_id: ProcessorId, name: &str) -> Option<String> {
        fs::read_to_string(format!(
            "/sys/devices/system/cpu/cpu{processor_id}/topology/{name}"
        ))
        .ok()
    }

    fn cpu_cache_attribute(
        &self,
        processor_id: ProcessorId,
        index: u32,
        name: &str,
    ) -> Option<String> {
        fs::read_to_string(format!(
            "/sys/devices/system/cpu/cpu{processor_id}/cache/index{index}/{name}"
        ))
        .ok()
    }
}
