use std::sync::OnceLock;

use itertools::Itertools;

use crate::pal::{BUILD_TARGET_PLATFORM, Platform};
use crate::{
    NumaNodeId, ProcessorGroupIndex, ProcessorId, ProcessorMask, ProcessorRelationship,
    RelationshipKind, hardware,
};

/// A processor group as reported by the platform.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessorGroup {
    index: ProcessorGroupIndex,
    active_processor_count: usize,
}

impl ProcessorGroup {
    /// Index of the group.
    #[must_use]
    pub fn index(&self) -> ProcessorGroupIndex {
        self.index
    }

    /// Number of active logical processors in the group.
    #[must_use]
    pub fn active_processor_count(&self) -> usize {
        self.active_processor_count
    }
}

/// A NUMA node and the processors that belong to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NumaNode {
    id: NumaNodeId,
    processors: ProcessorMask,
}

impl NumaNode {
    /// Identifier of the node.
    #[must_use]
    pub fn id(&self) -> NumaNodeId {
        self.id
    }

    /// Processors in the node.
    #[must_use]
    pub fn processors(&self) -> &ProcessorMask {
        &self.processors
    }
}

/// Read-only snapshot of the processor topology.
///
/// Obtain the snapshot of the current machine via [`Topology::current()`]. Tests and tools that
/// want to describe some other machine can assemble one via [`Topology::builder()`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Topology {
    logical_processors: ProcessorMask,
    groups: Vec<ProcessorGroup>,
    maximum_group_count: u16,
    process_affinity: ProcessorMask,
    system_affinity: ProcessorMask,
    numa_nodes: Vec<NumaNode>,
    relationships: Vec<ProcessorRelationship>,
}

impl Topology {
    /// The topology of the current machine, as seen by the current process.
    ///
    /// Only processors the process may use are included, so the logical processors, the
    /// process affinity and the system affinity are the same set. Processor groups are not
    /// reported: there is one group holding every processor.
    ///
    /// The snapshot is taken on first use and shared by all later callers.
    #[must_use]
    pub fn current() -> &'static Self {
        static CURRENT: OnceLock<Topology> = OnceLock::new();

        CURRENT.get_or_init(|| {
            Self::assemble(&hardware::available_processors(), &BUILD_TARGET_PLATFORM)
        })
    }

    fn assemble(processors: &[(ProcessorId, NumaNodeId)], platform: &impl Platform) -> Self {
        let available: ProcessorMask = processors.iter().map(|&(id, _)| id).collect();

        let mut builder = Topology::builder(available.clone())
            .group(0, available.count())
            .maximum_group_count(1)
            .relationship(available.clone(), RelationshipKind::Group { index: 0 });

        let nodes = processors
            .iter()
            .map(|&(id, node)| (node, id))
            .into_group_map();

        for (node, members) in nodes.into_iter().sorted_unstable_by_key(|&(node, _)| node) {
            let members: ProcessorMask = members.into_iter().collect();

            builder = builder
                .numa_node(node, members.clone())
                .relationship(members, RelationshipKind::NumaNode { node });
        }

        for (members, kind) in platform.processor_relationships(&available) {
            builder = builder.relationship(members, kind);
        }

        builder.build()
    }

    /// Starts describing a machine with the given online logical processors.
    #[must_use]
    pub fn builder(logical_processors: ProcessorMask) -> TopologyBuilder {
        TopologyBuilder {
            logical_processors,
            groups: Vec::new(),
            maximum_group_count: None,
            process_affinity: None,
            system_affinity: None,
            numa_nodes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Number of online logical processors.
    #[must_use]
    pub fn logical_processor_count(&self) -> usize {
        self.logical_processors.count()
    }

    /// All online logical processors.
    #[must_use]
    pub fn logical_processors(&self) -> &ProcessorMask {
        &self.logical_processors
    }

    /// Processor groups in use. Platforms without groups report exactly one.
    #[must_use]
    pub fn processor_groups(&self) -> &[ProcessorGroup] {
        &self.groups
    }

    /// Maximum number of processor groups the platform supports.
    #[must_use]
    pub fn maximum_group_count(&self) -> u16 {
        self.maximum_group_count
    }

    /// Processors the current process is allowed to run on.
    #[must_use]
    pub fn process_affinity(&self) -> &ProcessorMask {
        &self.process_affinity
    }

    /// Processors the system makes available to processes.
    #[must_use]
    pub fn system_affinity(&self) -> &ProcessorMask {
        &self.system_affinity
    }

    /// Processors that are both online and in the process affinity mask, in ascending order.
    ///
    /// These are the processors a benchmark can meaningfully pin threads to.
    #[must_use]
    pub fn allowed_processors(&self) -> Vec<ProcessorId> {
        self.logical_processors
            .intersection(&self.process_affinity)
            .iter()
            .collect()
    }

    /// NUMA nodes that contain at least one processor, in ascending ID order.
    #[must_use]
    pub fn numa_nodes(&self) -> &[NumaNode] {
        &self.numa_nodes
    }

    /// The highest NUMA node ID, if the platform reports any nodes.
    #[must_use]
    pub fn highest_numa_node(&self) -> Option<NumaNodeId> {
        self.numa_nodes.iter().map(NumaNode::id).max()
    }

    /// The NUMA node the processor belongs to, if known.
    #[must_use]
    pub fn numa_node_of(&self, processor_id: ProcessorId) -> Option<NumaNodeId> {
        self.numa_nodes
            .iter()
            .find(|node| node.processors.contains(processor_id))
            .map(NumaNode::id)
    }

    /// All relationships reported by the platform.
    #[must_use]
    pub fn relationships(&self) -> &[ProcessorRelationship] {
        &self.relationships
    }

    /// Other processors the platform reports as sharing a physical core with `processor_id`.
    #[must_use]
    pub fn core_siblings_of(&self, processor_id: ProcessorId) -> Vec<ProcessorId> {
        self.relationships
            .iter()
            .filter(|relationship| relationship.kind() == RelationshipKind::ProcessorCore)
            .filter(|relationship| relationship.processors().contains(processor_id))
            .flat_map(|relationship| relationship.processors().iter())
            .filter(|&other| other != processor_id)
            .unique()
            .collect()
    }
}

/// Assembles a [`Topology`] from parts.
///
/// Anything not provided is filled in with the single-group, single-node defaults that describe
/// a machine without any structure: the affinity masks default to every logical processor, the
/// groups default to one group holding every processor and the NUMA nodes default to node 0
/// holding every processor.
#[derive(Debug)]
#[must_use]
pub struct TopologyBuilder {
    logical_processors: ProcessorMask,
    groups: Vec<ProcessorGroup>,
    maximum_group_count: Option<u16>,
    process_affinity: Option<ProcessorMask>,
    system_affinity: Option<ProcessorMask>,
    numa_nodes: Vec<NumaNode>,
    relationships: Vec<ProcessorRelationship>,
}

impl TopologyBuilder {
    /// Sets the processors the process is allowed to run on.
    pub fn process_affinity(mut self, mask: ProcessorMask) -> Self {
        self.process_affinity = Some(mask);
        self
    }

    /// Sets the processors the system makes available to processes.
    pub fn system_affinity(mut self, mask: ProcessorMask) -> Self {
        self.system_affinity = Some(mask);
        self
    }

    /// Adds a processor group.
    pub fn group(mut self, index: ProcessorGroupIndex, active_processor_count: usize) -> Self {
        self.groups.push(ProcessorGroup {
            index,
            active_processor_count,
        });
        self
    }

    /// Sets the maximum number of processor groups the platform supports.
    pub fn maximum_group_count(mut self, count: u16) -> Self {
        self.maximum_group_count = Some(count);
        self
    }

    /// Adds a NUMA node. Nodes without processors are ignored.
    pub fn numa_node(mut self, id: NumaNodeId, processors: ProcessorMask) -> Self {
        if !processors.is_empty() {
            self.numa_nodes.push(NumaNode { id, processors });
        }
        self
    }

    /// Adds a relationship. Duplicates are ignored.
    pub fn relationship(mut self, processors: ProcessorMask, kind: RelationshipKind) -> Self {
        let relationship = ProcessorRelationship::new(processors, kind);

        if !self.relationships.contains(&relationship) {
            self.relationships.push(relationship);
        }
        self
    }

    /// Completes the topology, filling in defaults for anything not provided.
    #[must_use]
    pub fn build(self) -> Topology {
        let Self {
            logical_processors,
            mut groups,
            maximum_group_count,
            process_affinity,
            system_affinity,
            mut numa_nodes,
            mut relationships,
        } = self;

        if groups.is_empty() {
            groups.push(ProcessorGroup {
                index: 0,
                active_processor_count: logical_processors.count(),
            });
        }

        if numa_nodes.is_empty() {
            numa_nodes.push(NumaNode {
                id: 0,
                processors: logical_processors.clone(),
            });

            relationships.push(ProcessorRelationship::new(
                logical_processors.clone(),
                RelationshipKind::NumaNode { node: 0 },
            ));
        }

        numa_nodes.sort_by_key(NumaNode::id);

        let maximum_group_count = maximum_group_count
            .unwrap_or_else(|| u16::try_from(groups.len()).unwrap_or(u16::MAX));

        Topology {
            process_affinity: process_affinity.unwrap_or_else(|| logical_processors.clone()),
            system_affinity: system_affinity.unwrap_or_else(|| logical_processors.clone()),
            logical_processors,
            groups,
            maximum_group_count,
            numa_nodes,
            relationships,
        }
    }
}
