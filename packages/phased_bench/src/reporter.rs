use crate::{CoreVector, PairMatrix};

/// Receives progress and results of probes for display.
///
/// Probes call these in order: `probe_started`, optionally `initializing`, `progress_started`,
/// one `progress_tick` per scheduling cycle, `progress_completed`, then `matrix` or `vector`
/// and finally `probe_completed`.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter {
    /// A probe is starting.
    fn probe_started(&self, name: &str);

    /// The probe is preparing (e.g. filling large buffers) before it can measure.
    fn initializing(&self);

    /// Measurement starts; `total` scheduling cycles will follow.
    fn progress_started(&self, total: usize);

    /// One scheduling cycle completed.
    fn progress_tick(&self);

    /// All scheduling cycles completed.
    fn progress_completed(&self);

    /// Pairwise result.
    fn matrix(&self, matrix: &PairMatrix);

    /// Per-core result.
    fn vector(&self, vector: &CoreVector);

    /// The probe has finished.
    fn probe_completed(&self);
}

/// A [`Reporter`] that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn probe_started(&self, _name: &str) {}

    fn initializing(&self) {}

    fn progress_started(&self, _total: usize) {}

    fn progress_tick(&self) {}

    fn progress_completed(&self) {}

    fn matrix(&self, _matrix: &PairMatrix) {}

    fn vector(&self, _vector: &CoreVector) {}

    fn probe_completed(&self) {}
}
