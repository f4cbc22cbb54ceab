//! Builders for synthetic samples used by unit tests.

use std::time::Duration;

use hw_topology::ProcessorId;

use crate::{AffinityStatus, BenchmarkSample};

/// A pinned sample whose processor-time throughput is `ops_per_ms`, to millisecond precision.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "test rates are small positive numbers"
)]
pub(crate) fn sample_at_rate(core: ProcessorId, phase: u32, ops_per_ms: f64) -> BenchmarkSample {
    BenchmarkSample::new(
        core,
        phase,
        (ops_per_ms * 1000.0).round() as u64,
        Duration::from_secs(1),
        Duration::from_secs(1),
        AffinityStatus::Pinned,
    )
}

/// A sample that consumed no processor time.
pub(crate) fn undefined_sample(core: ProcessorId, phase: u32) -> BenchmarkSample {
    BenchmarkSample::new(
        core,
        phase,
        100,
        Duration::ZERO,
        Duration::ZERO,
        AffinityStatus::Unpinned,
    )
}
