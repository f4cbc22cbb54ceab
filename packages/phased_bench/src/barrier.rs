use std::num::NonZero;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;
use tracing::error;

use crate::BarrierError;

const READY_BITS: u32 = 32;
const READY_MASK: u64 = (1 << READY_BITS) - 1;

/// Phase number used to mark an aborted barrier. Compares greater than any real phase, so
/// everything that checks for "finished" also sees an abort.
const ABORTED_PHASE: u32 = u32::MAX;

/// Where a [`PhaseBarrier`] is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PhaseState {
    /// Phase 0, the warm-up. Nothing is measured.
    Warming,
    /// Measurement phase `k`, counted from 1.
    Measuring(u32),
    /// All measurement phases have completed.
    Done,
    /// The invocation was aborted.
    Aborted,
}

/// Outcome of [`PhaseBarrier::signal_ready()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadySignal {
    /// This signal completed the cohort: every participant is now ready.
    LastToArrive,
    /// Some participants have not signaled yet.
    Waiting,
    /// The barrier had already moved past the phase being signaled; the signal was not counted.
    PhaseAlreadyOver,
}

/// Lock-free reusable rendezvous for a fixed set of participants.
///
/// The barrier walks through phase 0 (warm-up), phases `1..=K` (measurement) and finally the
/// terminal phase `K + 1`. Phases are advanced by an external timer, never by the participants.
/// Within each phase, participants signal that they have arrived; the signal that completes the
/// cohort is unique per phase.
///
/// The phase number and the ready count share one atomic word: phase in the high half, ready
/// count in the low half. A ready signal is therefore only ever applied to the phase it was meant
/// for and an advance resets the ready count in the same step.
#[derive(Debug)]
pub struct PhaseBarrier {
    state: CachePadded<AtomicU64>,
    participant_count: u32,
    terminal_phase: u32,
}

impl PhaseBarrier {
    /// Creates a barrier for `participant_count` participants and `measurement_phases`
    /// measurement phases after the warm-up.
    #[must_use]
    pub fn new(participant_count: NonZero<u32>, measurement_phases: NonZero<u32>) -> Self {
        Self {
            state: CachePadded::new(AtomicU64::new(0)),
            participant_count: participant_count.get(),
            // The abort sentinel must stay above every real phase.
            terminal_phase: measurement_phases
                .get()
                .saturating_add(1)
                .min(ABORTED_PHASE.wrapping_sub(1)),
        }
    }

    /// Number of participants the barrier was created for.
    #[must_use]
    pub fn participant_count(&self) -> u32 {
        self.participant_count
    }

    /// The phase reached after the last measurement phase.
    #[must_use]
    pub fn terminal_phase(&self) -> u32 {
        self.terminal_phase
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> u32 {
        phase_of(self.state.load(Ordering::SeqCst))
    }

    /// Number of participants that have signaled ready in the current phase.
    #[must_use]
    pub fn ready_count(&self) -> u32 {
        ready_of(self.state.load(Ordering::SeqCst))
    }

    /// Where the barrier is in its lifecycle.
    #[must_use]
    pub fn state(&self) -> PhaseState {
        match self.phase() {
            0 => PhaseState::Warming,
            ABORTED_PHASE => PhaseState::Aborted,
            phase if phase >= self.terminal_phase => PhaseState::Done,
            phase => PhaseState::Measuring(phase),
        }
    }

    /// Whether participants that observe `phase` must stop working.
    #[must_use]
    pub fn is_finished(&self, phase: u32) -> bool {
        phase >= self.terminal_phase
    }

    /// Whether the barrier has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.phase() == ABORTED_PHASE
    }

    /// Signals that the calling participant has arrived in `observed_phase`.
    ///
    /// Each participant signals exactly once per phase. If the barrier has already left
    /// `observed_phase`, nothing is counted.
    ///
    /// # Errors
    ///
    /// Returns [`BarrierError::ReadyOverflow`] if the signal would make the ready count exceed
    /// the participant count. The barrier is aborted before returning.
    pub fn signal_ready(&self, observed_phase: u32) -> Result<ReadySignal, BarrierError> {
        let mut current = self.state.load(Ordering::SeqCst);

        loop {
            if phase_of(current) != observed_phase {
                return Ok(ReadySignal::PhaseAlreadyOver);
            }

            let ready = ready_of(current).wrapping_add(1);

            if ready > self.participant_count {
                let violation = BarrierError::ReadyOverflow {
                    phase: observed_phase,
                    ready,
                    participant_count: self.participant_count,
                };

                error!(%violation, "phase barrier protocol violated");
                self.abort();
                return Err(violation);
            }

            match self.state.compare_exchange_weak(
                current,
                pack(observed_phase, ready),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) if ready == self.participant_count => return Ok(ReadySignal::LastToArrive),
                Ok(_) => return Ok(ReadySignal::Waiting),
                Err(actual) => current = actual,
            }
        }
    }

    /// Whether every participant has signaled ready in `phase` and the barrier is still in it.
    #[must_use]
    pub fn all_ready(&self, phase: u32) -> bool {
        let current = self.state.load(Ordering::SeqCst);

        phase_of(current) == phase && ready_of(current) == self.participant_count
    }

    /// Moves the barrier to the next phase and resets the ready count. Returns the new phase.
    ///
    /// # Errors
    ///
    /// Returns [`BarrierError::Aborted`] if the barrier was aborted and
    /// [`BarrierError::AdvancePastTerminal`] if it is already in the terminal phase. The latter
    /// aborts the barrier.
    pub fn advance(&self) -> Result<u32, BarrierError> {
        let result = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let phase = phase_of(current);

                if phase >= self.terminal_phase {
                    None
                } else {
                    Some(pack(phase.wrapping_add(1), 0))
                }
            });

        match result {
            Ok(previous) => Ok(phase_of(previous).wrapping_add(1)),
            Err(current) if phase_of(current) == ABORTED_PHASE => Err(BarrierError::Aborted),
            Err(_) => {
                let violation = BarrierError::AdvancePastTerminal {
                    terminal_phase: self.terminal_phase,
                };

                error!(%violation, "phase barrier protocol violated");
                self.abort();
                Err(violation)
            }
        }
    }

    /// Ends the invocation for every participant and the timer.
    pub fn abort(&self) {
        self.state.store(pack(ABORTED_PHASE, 0), Ordering::SeqCst);
    }
}

fn pack(phase: u32, ready: u32) -> u64 {
    (u64::from(phase) << READY_BITS) | u64::from(ready)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "shifting out the low half leaves exactly 32 bits"
)]
fn phase_of(state: u64) -> u32 {
    (state >> READY_BITS) as u32
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "masked to the low 32 bits"
)]
fn ready_of(state: u64) -> u32 {
    (state & READY_MASK) as u32
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use new_zealand::nz;
    use static_assertions::assert_impl_all;
    use testing::with_watchdog;

    use super::*;

    assert_impl_all!(PhaseBarrier: Send, Sync);

    #[test]
    fn lifecycle() {
        let barrier = PhaseBarrier::new(nz!(1), nz!(2));

        assert_eq!(barrier.state(), PhaseState::Warming);
        assert_eq!(barrier.terminal_phase(), 3);

        assert_eq!(barrier.advance(), Ok(1));
        assert_eq!(barrier.state(), PhaseState::Measuring(1));
        assert_eq!(barrier.advance(), Ok(2));
        assert_eq!(barrier.state(), PhaseState::Measuring(2));
        assert!(!barrier.is_finished(2));
        assert_eq!(barrier.advance(), Ok(3));
        assert_eq!(barrier.state(), PhaseState::Done);
        assert!(barrier.is_finished(3));
    }

    #[test]
    fn advance_past_terminal_is_violation() {
        let barrier = PhaseBarrier::new(nz!(1), nz!(1));

        barrier.advance().unwrap();
        barrier.advance().unwrap();

        assert_eq!(
            barrier.advance(),
            Err(BarrierError::AdvancePastTerminal { terminal_phase: 2 })
        );
        assert_eq!(barrier.state(), PhaseState::Aborted);
        assert_eq!(barrier.advance(), Err(BarrierError::Aborted));
    }

    #[test]
    fn last_signal_completes_cohort() {
        let barrier = PhaseBarrier::new(nz!(3), nz!(1));

        assert_eq!(barrier.signal_ready(0), Ok(ReadySignal::Waiting));
        assert!(!barrier.all_ready(0));
        assert_eq!(barrier.signal_ready(0), Ok(ReadySignal::Waiting));
        assert_eq!(barrier.signal_ready(0), Ok(ReadySignal::LastToArrive));
        assert!(barrier.all_ready(0));
        assert!(!barrier.all_ready(1));
        assert_eq!(barrier.ready_count(), 3);
    }

    #[test]
    fn advance_resets_ready_count() {
        let barrier = PhaseBarrier::new(nz!(2), nz!(1));

        barrier.signal_ready(0).unwrap();
        barrier.signal_ready(0).unwrap();
        barrier.advance().unwrap();

        assert_eq!(barrier.ready_count(), 0);
        assert!(!barrier.all_ready(1));
    }

    #[test]
    fn ready_overflow_is_violation() {
        let barrier = PhaseBarrier::new(nz!(2), nz!(1));

        barrier.signal_ready(0).unwrap();
        barrier.signal_ready(0).unwrap();

        assert_eq!(
            barrier.signal_ready(0),
            Err(BarrierError::ReadyOverflow {
                phase: 0,
                ready: 3,
                participant_count: 2
            })
        );
        assert!(barrier.is_aborted());
    }

    #[test]
    fn stale_signal_does_not_leak_into_next_phase() {
        let barrier = PhaseBarrier::new(nz!(2), nz!(2));

        barrier.advance().unwrap();

        assert_eq!(barrier.signal_ready(0), Ok(ReadySignal::PhaseAlreadyOver));
        assert_eq!(barrier.ready_count(), 0);
    }

    #[test]
    fn abort_finishes_everything() {
        let barrier = PhaseBarrier::new(nz!(2), nz!(5));

        barrier.abort();

        assert_eq!(barrier.state(), PhaseState::Aborted);
        assert!(barrier.is_finished(barrier.phase()));
        assert_eq!(barrier.signal_ready(0), Ok(ReadySignal::PhaseAlreadyOver));
        assert_eq!(barrier.advance(), Err(BarrierError::Aborted));
    }

    #[test]
    fn exactly_one_last_arrival_per_phase() {
        const PARTICIPANTS: NonZero<u32> = nz!(8);
        const PHASES: NonZero<u32> = nz!(50);

        with_watchdog(|| {
            let barrier = Arc::new(PhaseBarrier::new(PARTICIPANTS, PHASES));
            let last_arrivals = Arc::new(AtomicUsize::new(0));

            let participants: Vec<_> = (0..PARTICIPANTS.get())
                .map(|_| {
                    let barrier = Arc::clone(&barrier);
                    let last_arrivals = Arc::clone(&last_arrivals);

                    thread::spawn(move || {
                        let mut previous = 0;

                        loop {
                            let phase = barrier.phase();
                            assert!(phase >= previous, "phase regressed");
                            previous = phase;

                            if barrier.is_finished(phase) {
                                break;
                            }

                            if barrier.signal_ready(phase).unwrap() == ReadySignal::LastToArrive {
                                last_arrivals.fetch_add(1, Ordering::SeqCst);
                            }

                            while barrier.phase() == phase {
                                std::hint::spin_loop();
                            }
                        }

                        previous
                    })
                })
                .collect();

            // Plays the role of the timer: advances only once the cohort is complete, so every
            // participant sees every phase.
            while !barrier.is_finished(barrier.phase()) {
                let phase = barrier.phase();

                while !barrier.all_ready(phase) {
                    std::hint::spin_loop();
                }

                barrier.advance().unwrap();
            }

            for participant in participants {
                assert_eq!(participant.join().unwrap(), barrier.terminal_phase());
            }

            // One per phase, warm-up included.
            assert_eq!(
                last_arrivals.load(Ordering::SeqCst),
                (PHASES.get() + 1) as usize
            );
        });
    }
}
