use derive_more::Display;

use crate::{NumaNodeId, ProcessorGroupIndex, ProcessorMask};

/// Kind of cache described by a [`RelationshipKind::Cache`] relationship.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CacheType {
    /// Holds both instructions and data.
    Unified,
    /// Holds instructions only.
    Instruction,
    /// Holds data only.
    Data,
    /// Trace cache.
    Trace,
    /// The platform reported a cache type we do not recognize.
    Unknown,
}

impl CacheType {
    pub(crate) fn from_platform_name(name: &str) -> Self {
        match name {
            "Unified" => Self::Unified,
            "Instruction" => Self::Instruction,
            "Data" => Self::Data,
            "Trace" => Self::Trace,
            _ => Self::Unknown,
        }
    }
}

/// What a set of processors has in common.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum RelationshipKind {
    /// The processors are hardware threads of the same physical core.
    ProcessorCore,

    /// The processors are in the same physical package (socket).
    ProcessorPackage,

    /// The processors belong to the same NUMA node.
    NumaNode {
        /// Identifier of the NUMA node.
        node: NumaNodeId,
    },

    /// The processors share a cache.
    Cache {
        /// Cache level, e.g. 1 for L1.
        level: u8,
        /// Cache capacity in bytes.
        size_bytes: u64,
        /// Cache line size in bytes.
        line_size: u32,
        /// What the cache holds.
        cache_type: CacheType,
    },

    /// The processors are members of the same processor group.
    Group {
        /// Index of the processor group.
        index: ProcessorGroupIndex,
    },
}

/// One relationship reported by the platform: a set of processors and what they share.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProcessorRelationship {
    processors: ProcessorMask,
    kind: RelationshipKind,
}

impl ProcessorRelationship {
    /// Creates a relationship between the processors in `processors`.
    #[must_use]
    pub fn new(processors: ProcessorMask, kind: RelationshipKind) -> Self {
        Self { processors, kind }
    }

    /// The processors that take part in the relationship.
    #[must_use]
    pub fn processors(&self) -> &ProcessorMask {
        &self.processors
    }

    /// What the processors share.
    #[must_use]
    pub fn kind(&self) -> RelationshipKind {
        self.kind
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn cache_type_from_platform_name() {
        assert_eq!(CacheType::from_platform_name("Data"), CacheType::Data);
        assert_eq!(
            CacheType::from_platform_name("Instruction"),
            CacheType::Instruction
        );
        assert_eq!(CacheType::from_platform_name("Unified"), CacheType::Unified);
        assert_eq!(CacheType::from_platform_name("Trace"), CacheType::Trace);
        assert_eq!(CacheType::from_platform_name("data"), CacheType::Unknown);
    }
}
