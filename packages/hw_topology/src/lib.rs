#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Read-only snapshot of the processor topology of the current machine.
//!
//! The snapshot answers the questions a hardware-characterization benchmark needs answered
//! before it starts pinning threads:
//!
//! * which logical processors exist and which of them the current process may use,
//! * how the processors are grouped (processor groups, NUMA nodes),
//! * which processors the operating system reports as sharing a physical core, a package
//!   or a cache.
//!
//! The snapshot is taken once via [`Topology::current()`] and never changes afterwards. The
//! processors and their NUMA nodes come from `many_cpus`. Which processors share a core, a
//! package or a cache is read from the platform where it is known (Linux) and left out
//! elsewhere.
//!
//! In addition, [`pin_current_thread()`] binds the calling thread to exactly one logical
//! processor, directly on the calling thread.
//!
//! ```
//! use hw_topology::Topology;
//!
//! let topology = Topology::current();
//!
//! println!(
//!     "{} logical processors in {} NUMA nodes, process may use: {}",
//!     topology.logical_processor_count(),
//!     topology.numa_nodes().len(),
//!     topology.process_affinity()
//! );
//! ```

mod hardware;
mod pal;
mod pin;
mod primitive_types;
mod processor_mask;
mod relationship;
mod topology;

pub use pin::*;
pub use primitive_types::*;
pub use processor_mask::*;
pub use relationship::*;
pub use topology::*;
