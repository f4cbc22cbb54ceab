use tracing::debug;

use crate::pal::Platform;
use crate::pal::linux::Filesystem;
use crate::{CacheType, ProcessorId, ProcessorMask, RelationshipKind};

// Newer kernels use the first name, older kernels only offer the second.
const CORE_SIBLINGS_FILES: [&str; 2] = ["core_cpus_list", "thread_siblings_list"];
const PACKAGE_SIBLINGS_FILES: [&str; 2] = ["package_cpus_list", "core_siblings_list"];

/// Linux platform, reading processor relationships from the `/sys` virtual filesystem.
///
/// Generic over the filesystem so unit tests can simulate arbitrary machines.
#[derive(Debug)]
pub(crate) struct LinuxPlatform<F> {
    fs: F,
}

impl<F> LinuxPlatform<F> {
    pub(crate) const fn new(fs: F) -> Self {
        Self { fs }
    }
}

impl<F> Platform for LinuxPlatform<F>
where
    F: Filesystem,
{
    fn processor_relationships(
        &self,
        processors: &ProcessorMask,
    ) -> Vec<(ProcessorMask, RelationshipKind)> {
        let mut relationships = Vec::new();

        let mut add = |entry: (ProcessorMask, RelationshipKind)| {
            if !relationships.contains(&entry) {
                relationships.push(entry);
            }
        };

        for processor_id in processors.iter() {
            if let Some(core) = self.sibling_mask(processor_id, CORE_SIBLINGS_FILES) {
                add((core, RelationshipKind::ProcessorCore));
            }

            if let Some(package) = self.sibling_mask(processor_id, PACKAGE_SIBLINGS_FILES) {
                add((package, RelationshipKind::ProcessorPackage));
            }

            for cache in self.caches_of(processor_id) {
                add(cache);
            }
        }

        relationships
    }
}

impl<F> LinuxPlatform<F>
where
    F: Filesystem,
{
    fn sibling_mask(&self, processor_id: ProcessorId, files: [&str; 2]) -> Option<ProcessorMask> {
        files.iter().find_map(|name| {
            self.fs
                .cpu_topology_attribute(processor_id, name)
                .as_deref()
                .and_then(parse_cpulist)
                .filter(|mask| !mask.is_empty())
        })
    }

    fn caches_of(&self, processor_id: ProcessorId) -> Vec<(ProcessorMask, RelationshipKind)> {
        let mut caches = Vec::new();

        for index in 0_u32.. {
            let attribute = |name: &str| self.fs.cpu_cache_attribute(processor_id, index, name);

            // The index directories are contiguous, the first missing one ends the list.
            let Some(level) = attribute("level") else {
                break;
            };

            let Ok(level) = level.trim().parse::<u8>() else {
                continue;
            };

            let size_bytes = attribute("size")
                .as_deref()
                .and_then(parse_cache_size)
                .unwrap_or_default();

            let line_size = attribute("coherency_line_size")
                .and_then(|value| value.trim().parse::<u32>().ok())
                .unwrap_or_default();

            let cache_type = attribute("type")
                .map_or(CacheType::Unknown, |value| {
                    CacheType::from_platform_name(value.trim())
                });

            let processors = attribute("shared_cpu_list")
                .as_deref()
                .and_then(parse_cpulist)
                .filter(|mask| !mask.is_empty())
                .unwrap_or_else(|| [processor_id].into_iter().collect());

            caches.push((
                processors,
                RelationshipKind::Cache {
                    level,
                    size_bytes,
                    line_size,
                    cache_type,
                },
            ));
        }

        caches
    }
}

fn parse_cpulist(contents: &str) -> Option<ProcessorMask> {
    let contents = contents.trim();

    if contents.is_empty() {
        return Some(ProcessorMask::new());
    }

    match cpulist::parse(contents) {
        Ok(ids) => Some(ids.into_iter().collect()),
        Err(e) => {
            debug!(contents, error = %e, "ignoring malformed cpulist");
            None
        }
    }
}

/// Parses sysfs cache sizes such as `48K`, `2048K` or `32M`.
fn parse_cache_size(contents: &str) -> Option<u64> {
    let contents = contents.trim();

    let (digits, multiplier) = match contents.chars().last()? {
        'K' => (contents.strip_suffix('K')?, 1024),
        'M' => (contents.strip_suffix('M')?, 1024 * 1024),
        'G' => (contents.strip_suffix('G')?, 1024 * 1024 * 1024),
        _ => (contents, 1),
    };

    digits.parse::<u64>().ok()?.checked_mul(multiplier)
}
