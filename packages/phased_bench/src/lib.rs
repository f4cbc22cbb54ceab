#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Runs synthetic workloads on a set of logical processors in lockstep and measures how fast each
//! processor gets through them. Comparing the results across processors reveals hardware facts
//! such as which processors are hyperthreading siblings or which NUMA node a buffer lives on.
//!
//! # Phased execution
//!
//! One invocation ([`run_phased()`]) starts one pinned thread per participating processor. Each
//! thread creates its own [`Workload`] instance and then works through a sequence of phases that
//! a timer thread advances through a lock-free [`PhaseBarrier`]:
//!
//! 1. Phase 0 warms up caches and frequency governors and is never reported.
//! 2. Phases `1..=K` are measurement phases, one [`BenchmarkSample`] per participant each.
//! 3. Phase `K + 1` is terminal; every participant returns.
//!
//! A participant only counts operations once every participant has arrived in the phase, so no
//! processor measures while others are still starting up.
//!
//! # Modes
//!
//! * [`run_pairwise()`] measures every pair of processors against each other into a
//!   [`PairMatrix`].
//! * [`run_subset()`] measures all processors at once into a [`CoreVector`].
//!
//! The [`Probe`] implementations combine a mode, a workload and a [`Reporter`]:
//!
//! ```no_run
//! use phased_bench::{
//!     CoreSelection, HyperthreadingProbe, NullReporter, Probe, ProbeReport, RunConfiguration,
//! };
//!
//! let config = RunConfiguration::builder()
//!     .seconds_per_phase(1.0)
//!     .repeat_count(3)
//!     .build()?;
//!
//! let probe = HyperthreadingProbe::with_selection(&CoreSelection::All);
//! println!("Estimated duration: {:?}", probe.estimated_duration(&config));
//!
//! if let ProbeReport::Matrix(matrix) = probe.run(&config, &NullReporter)? {
//!     for (a, b) in matrix.likely_siblings() {
//!         println!("{a} and {b} are likely hyperthreading siblings");
//!     }
//! }
//! # Ok::<(), phased_bench::BenchmarkError>(())
//! ```

mod barrier;
mod config;
mod context;
mod error;
mod probes;
mod reducer;
mod reporter;
mod runner;
mod sample;
mod scheduler;
mod stepper;
mod timer;
mod workload;

#[cfg(test)]
mod test_samples;

pub use barrier::*;
pub use config::*;
pub(crate) use context::*;
pub use error::*;
pub use probes::*;
pub use reducer::*;
pub use reporter::*;
pub use runner::*;
pub use sample::*;
pub use scheduler::*;
pub use stepper::*;
pub(crate) use timer::*;
pub use workload::*;
