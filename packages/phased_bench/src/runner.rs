use std::thread::{self, JoinHandle};

use hw_topology::{ProcessorId, pin_current_thread};
use tracing::{debug, warn};

use crate::{AffinityStatus, BenchmarkError};

type Payload<R> = Box<dyn FnOnce(ProcessorId, AffinityStatus) -> R + Send + 'static>;

/// One thread bound to one logical processor, running a payload.
///
/// Call [`start()`][Self::start] to launch the thread and [`RunningCore::join()`] to wait for the
/// payload to return. A runner is used for one benchmark invocation only.
///
/// ```
/// use phased_bench::{AffinityStatus, CoreRunner};
///
/// let runner = CoreRunner::new(0, |processor_id, affinity| {
///     (processor_id, affinity == AffinityStatus::Pinned)
/// });
///
/// let (processor_id, _pinned) = runner.start().unwrap().join().unwrap();
/// assert_eq!(processor_id, 0);
/// ```
#[derive(derive_more::Debug)]
pub struct CoreRunner<R> {
    processor_id: ProcessorId,

    #[debug(ignore)]
    payload: Payload<R>,
}

impl<R: Send + 'static> CoreRunner<R> {
    /// Creates a runner for `processor_id`. The payload receives the processor ID and whether
    /// the thread was successfully pinned.
    #[must_use]
    pub fn new<F>(processor_id: ProcessorId, payload: F) -> Self
    where
        F: FnOnce(ProcessorId, AffinityStatus) -> R + Send + 'static,
    {
        Self {
            processor_id,
            payload: Box::new(payload),
        }
    }

    /// The processor this runner binds its thread to.
    #[must_use]
    pub fn processor_id(&self) -> ProcessorId {
        self.processor_id
    }

    /// Launches the thread. The thread pins itself to the processor and runs the payload.
    ///
    /// Failure to pin is logged and the payload runs unpinned, seeing
    /// [`AffinityStatus::Unpinned`].
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system refuses to create the thread.
    pub fn start(self) -> Result<RunningCore<R>, BenchmarkError> {
        let Self {
            processor_id,
            payload,
        } = self;

        let name = format!("phased-bench-p{processor_id}");

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let affinity = match pin_current_thread(processor_id) {
                    Ok(()) => AffinityStatus::Pinned,
                    Err(e) => {
                        warn!(processor_id, error = %e, "running unpinned: could not pin thread");
                        AffinityStatus::Unpinned
                    }
                };

                debug!(processor_id, ?affinity, "core runner started");
                let result = payload(processor_id, affinity);
                debug!(processor_id, "core runner exiting");

                result
            })
            .map_err(|source| BenchmarkError::ThreadStart { name, source })?;

        Ok(RunningCore {
            processor_id,
            handle,
        })
    }
}

/// A started [`CoreRunner`].
#[derive(Debug)]
pub struct RunningCore<R> {
    processor_id: ProcessorId,
    handle: JoinHandle<R>,
}

impl<R> RunningCore<R> {
    /// The processor this runner is bound to.
    #[must_use]
    pub fn processor_id(&self) -> ProcessorId {
        self.processor_id
    }

    /// Blocks until the payload has returned and hands back its result.
    ///
    /// # Errors
    ///
    /// Returns [`BenchmarkError::RunnerPanicked`] if the payload panicked.
    pub fn join(self) -> Result<R, BenchmarkError> {
        self.handle
            .join()
            .map_err(|_payload| BenchmarkError::RunnerPanicked(self.processor_id))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use hw_topology::Topology;
    use testing::with_watchdog;

    use super::*;

    fn first_allowed_processor() -> ProcessorId {
        *Topology::current()
            .allowed_processors()
            .first()
            .expect("at least one processor is always allowed")
    }

    #[test]
    fn payload_receives_processor_and_result_is_returned() {
        with_watchdog(|| {
            let processor_id = first_allowed_processor();

            let runner = CoreRunner::new(processor_id, |id, _| id * 10);
            assert_eq!(runner.processor_id(), processor_id);

            let running = runner.start().unwrap();
            assert_eq!(running.processor_id(), processor_id);
            assert_eq!(running.join().unwrap(), processor_id * 10);
        });
    }

    #[test]
    fn allowed_processor_is_pinned() {
        with_watchdog(|| {
            let affinity = CoreRunner::new(first_allowed_processor(), |_, affinity| affinity)
                .start()
                .unwrap()
                .join()
                .unwrap();

            assert_eq!(affinity, AffinityStatus::Pinned);
        });
    }

    #[test]
    fn pin_failure_is_not_fatal() {
        with_watchdog(|| {
            // No machine has this processor, so pinning fails but the payload still runs.
            let affinity = CoreRunner::new(ProcessorId::MAX - 1, |_, affinity| affinity)
                .start()
                .unwrap()
                .join()
                .unwrap();

            assert_eq!(affinity, AffinityStatus::Unpinned);
        });
    }

    #[test]
    fn panic_is_reported_as_error() {
        with_watchdog(|| {
            let result = CoreRunner::new(first_allowed_processor(), |_, _| -> u32 {
                panic!("payload failure");
            })
            .start()
            .unwrap()
            .join();

            assert!(matches!(result, Err(BenchmarkError::RunnerPanicked(_))));
        });
    }
}
