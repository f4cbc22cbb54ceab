use std::io::{self, Write};

use hw_topology::{ProcessorMask, RelationshipKind, Topology};
use itertools::Itertools;

/// Writes what the platform reports about its processors: counts, groups, affinity masks, NUMA
/// nodes and the relationships between processors.
///
/// Masks are shown as a cpulist and as one character per processor, `1` for members.
pub fn write_cpu_info(topology: &Topology, out: &mut impl Write) -> io::Result<()> {
    let width = topology
        .logical_processors()
        .max()
        .and_then(|max| usize::try_from(max).ok())
        .map_or(0, |max| max.saturating_add(1));

    writeln!(out, "General processor info:")?;
    writeln!(
        out,
        "  Logical processors: {}",
        topology.logical_processor_count()
    )?;

    writeln!(
        out,
        "  Active processor groups: {}",
        topology.processor_groups().len()
    )?;

    for group in topology.processor_groups() {
        writeln!(
            out,
            "    Group {}: {} logical processors",
            group.index(),
            group.active_processor_count()
        )?;
    }

    writeln!(
        out,
        "  Maximum processor groups: {}",
        topology.maximum_group_count()
    )?;

    write_mask(out, "Process affinity", topology.process_affinity(), width)?;
    write_mask(out, "System affinity", topology.system_affinity(), width)?;

    match topology.highest_numa_node() {
        Some(node) => writeln!(out, "  Highest NUMA node: {node}")?,
        None => writeln!(out, "  Highest NUMA node: (none)")?,
    }

    writeln!(out, "  NUMA nodes:")?;

    for node in topology.numa_nodes() {
        write_mask(out, &format!("  Node {}", node.id()), node.processors(), width)?;
    }

    writeln!(out, "  Processors:")?;

    for processor_id in topology.logical_processors().iter() {
        let node = topology
            .numa_node_of(processor_id)
            .map_or_else(|| "?".to_string(), |node| node.to_string());

        let siblings = topology.core_siblings_of(processor_id);
        let siblings = if siblings.is_empty() {
            "none".to_string()
        } else {
            siblings.iter().join(",")
        };

        writeln!(
            out,
            "    {processor_id}: NUMA node {node}, core siblings: {siblings}"
        )?;
    }

    writeln!(out)?;

    for relationship in topology.relationships() {
        write!(
            out,
            "  Processor mask: {} ",
            relationship.processors().to_bit_string(width)
        )?;

        match relationship.kind() {
            RelationshipKind::ProcessorCore => writeln!(out, "Core.")?,
            RelationshipKind::ProcessorPackage => writeln!(out, "Processor package.")?,
            RelationshipKind::NumaNode { node } => writeln!(out, "NUMA node {node}.")?,
            RelationshipKind::Cache {
                level,
                size_bytes,
                line_size,
                cache_type,
            } => writeln!(
                out,
                "Cache level {level}, size {} KiB, line size {line_size}, type {cache_type}.",
                size_bytes / 1024
            )?,
            RelationshipKind::Group { index } => writeln!(out, "Group {index}.")?,
            _ => writeln!(out, "Other relationship.")?,
        }
    }

    Ok(())
}

fn write_mask(
    out: &mut impl Write,
    label: &str,
    mask: &ProcessorMask,
    width: usize,
) -> io::Result<()> {
    writeln!(
        out,
        "  {label}: {mask} (count: {}, mask: {})",
        mask.count(),
        mask.to_bit_string(width)
    )
}
