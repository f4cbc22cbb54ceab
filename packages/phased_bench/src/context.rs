use std::num::NonZero;
use std::sync::OnceLock;

use crossbeam::utils::CachePadded;
use hw_topology::ProcessorId;
use tracing::{error, trace};

use crate::{BarrierError, BenchmarkSample, PhaseBarrier};

/// State shared by the participants, the timer and the scheduler of one invocation.
///
/// Owned by the scheduler and handed to the other parties by reference. Nothing here outlives the
/// invocation.
#[derive(Debug)]
pub(crate) struct BenchmarkContext {
    barrier: PhaseBarrier,

    // One slot per participant, indexed by participant ordinal. Each slot is written only by
    // its own participant; padding keeps neighbors off each other's cache lines.
    slots: Box<[CachePadded<ParticipantSlot>]>,
}

#[derive(Debug)]
struct ParticipantSlot {
    core_index: ProcessorId,

    // Index `k - 1` holds the sample of measurement phase `k`.
    samples: Box<[OnceLock<BenchmarkSample>]>,
}

impl BenchmarkContext {
    pub(crate) fn new(participants: &[ProcessorId], measurement_phases: NonZero<u32>) -> Self {
        let participant_count = u32::try_from(participants.len())
            .ok()
            .and_then(NonZero::new)
            .expect("participant set is validated as non-empty and small before creating a context");

        let slots = participants
            .iter()
            .map(|&core_index| {
                CachePadded::new(ParticipantSlot {
                    core_index,
                    samples: (0..measurement_phases.get())
                        .map(|_| OnceLock::new())
                        .collect(),
                })
            })
            .collect();

        Self {
            barrier: PhaseBarrier::new(participant_count, measurement_phases),
            slots,
        }
    }

    pub(crate) fn barrier(&self) -> &PhaseBarrier {
        &self.barrier
    }

    /// Stores the sample of the participant with the given ordinal.
    pub(crate) fn record(&self, ordinal: usize, sample: BenchmarkSample) -> Result<(), BarrierError> {
        let duplicate = BarrierError::DuplicateSample {
            core_index: sample.core_index(),
            phase: sample.phase_index(),
        };

        // The slot must belong to the sampled processor and the phase must be a measurement phase.
        let cell = self.slots.get(ordinal).and_then(|slot| {
            if slot.core_index != sample.core_index() {
                return None;
            }

            let index = usize::try_from(sample.phase_index().checked_sub(1)?).ok()?;
            slot.samples.get(index)
        });

        let Some(cell) = cell else {
            let violation = BarrierError::UnexpectedSample {
                ordinal,
                phase: sample.phase_index(),
            };

            error!(%violation, "phase barrier protocol violated");
            return Err(violation);
        };

        if cell.set(sample).is_err() {
            error!(violation = %duplicate, "phase barrier protocol violated");
            return Err(duplicate);
        }

        trace!(
            core_index = sample.core_index(),
            phase = sample.phase_index(),
            operations = sample.operation_count(),
            "sample recorded"
        );

        Ok(())
    }

    /// All recorded samples, ordered by participant and then by phase.
    pub(crate) fn samples(&self) -> Vec<BenchmarkSample> {
        self.slots
            .iter()
            .flat_map(|slot| slot.samples.iter().filter_map(OnceLock::get).copied())
            .collect()
    }

    pub(crate) fn expected_sample_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.samples.len()).sum()
    }
}
