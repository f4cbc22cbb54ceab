use std::fmt::Debug;

use crate::{ProcessorMask, RelationshipKind};

/// Reports how processors relate to each other beyond NUMA membership: which of them share a
/// physical core, a package or a cache.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Relationships that involve any of `processors`.
    ///
    /// Never fails. Anything the platform cannot tell us is left out.
    fn processor_relationships(
        &self,
        processors: &ProcessorMask,
    ) -> Vec<(ProcessorMask, RelationshipKind)>;
}
