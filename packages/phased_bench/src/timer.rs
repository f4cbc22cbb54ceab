use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::{BenchmarkContext, BenchmarkError};

/// How often the timer checks whether every participant has entered the current phase.
const COHORT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Drives a [`PhaseBarrier`][crate::PhaseBarrier] through its phases from a dedicated thread.
///
/// Each phase is timed from the moment every participant has entered it: first `warm` for the
/// warm-up, then `phase` for every measurement phase, until the barrier reaches its terminal
/// phase. Every wait is armed anew from the current instant once the previous one has expired.
///
/// Waiting for the whole cohort, warm-up included, departs from a purely external timer that
/// would advance phases on a fixed schedule. A participant that is slow to start still spends a
/// full phase in every period, so each one contributes exactly one sample per period.
///
/// Dropping the timer (or calling [`stop()`][Self::stop]) ends the timer thread early.
#[derive(Debug)]
pub(crate) struct PhaseTimer {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PhaseTimer {
    pub(crate) fn start(
        context: Arc<BenchmarkContext>,
        warm: Duration,
        phase: Duration,
    ) -> Result<Self, BenchmarkError> {
        let (stop, stop_rx) = mpsc::channel();

        let name = "phased-bench-timer".to_string();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_timer(&context, &stop_rx, warm, phase))
            .map_err(|source| BenchmarkError::ThreadStart { name, source })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Ends the timer thread, if still running, and waits for it to exit.
    pub(crate) fn stop(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        // Disconnecting the channel wakes the timer from any wait.
        drop(self.stop.take());

        if let Some(handle) = self.handle.take() {
            // The timer thread does not panic; there is nothing to propagate if it did.
            drop(handle.join());
        }
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg_attr(test, mutants::skip)] // Timing loop; mutations mostly just hang the test.
fn run_timer(
    context: &BenchmarkContext,
    stop: &mpsc::Receiver<()>,
    warm: Duration,
    phase_duration: Duration,
) {
    let barrier = context.barrier();
    let mut delay = warm;

    loop {
        let phase = barrier.phase();

        if barrier.is_finished(phase) {
            return;
        }

        // The phase clock only starts once nobody is still on their way into the phase.
        while !barrier.all_ready(phase) {
            if barrier.phase() != phase {
                // Aborted.
                return;
            }

            if !sleep_unless_stopped(stop, COHORT_POLL_INTERVAL) {
                return;
            }
        }

        if !sleep_unless_stopped(stop, delay) {
            return;
        }

        match barrier.advance() {
            Ok(new_phase) => debug!(phase = new_phase, "phase advanced"),
            // Either aborted or a violation that has already been logged and has aborted the
            // barrier. Nothing left to drive.
            Err(_) => return,
        }

        delay = phase_duration;
    }
}

/// Waits for `duration`. Returns `false` if the timer was told to stop in the meantime.
fn sleep_unless_stopped(stop: &mpsc::Receiver<()>, duration: Duration) -> bool {
    match stop.recv_timeout(duration) {
        Err(RecvTimeoutError::Timeout) => true,
        Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
    }
}
