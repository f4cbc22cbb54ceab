//! Checks against the real machine the tests are running on.

#![cfg(not(miri))]

use std::thread;

use hw_topology::{PinError, ProcessorId, Topology, pin_current_thread};

#[test]
fn current_topology_is_consistent() {
    let topology = Topology::current();

    assert!(topology.logical_processor_count() >= 1);
    assert!(!topology.allowed_processors().is_empty());
    assert!(!topology.processor_groups().is_empty());
    assert!(!topology.numa_nodes().is_empty());
    assert!(topology.highest_numa_node().is_some());

    for processor_id in topology.allowed_processors() {
        assert!(topology.logical_processors().contains(processor_id));
        assert!(topology.process_affinity().contains(processor_id));
    }

    // Every processor belongs to at most one NUMA node.
    for processor_id in topology.logical_processors().iter() {
        let memberships = topology
            .numa_nodes()
            .iter()
            .filter(|node| node.processors().contains(processor_id))
            .count();
        assert!(memberships <= 1);
    }
}

#[test]
fn current_topology_is_shared() {
    assert!(std::ptr::eq(Topology::current(), Topology::current()));
}

#[test]
fn pin_to_every_allowed_processor() {
    let allowed = Topology::current().allowed_processors();

    thread::spawn(move || {
        for processor_id in allowed {
            pin_current_thread(processor_id).unwrap();
        }
    })
    .join()
    .unwrap();
}

#[test]
fn pin_to_missing_processor_fails() {
    thread::spawn(|| {
        let missing = ProcessorId::MAX - 1;

        assert_eq!(
            pin_current_thread(missing),
            Err(PinError::Unavailable {
                processor_id: missing
            })
        );
    })
    .join()
    .unwrap();
}
