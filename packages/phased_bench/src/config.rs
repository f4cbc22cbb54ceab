use std::num::NonZero;
use std::time::Duration;

use new_zealand::nz;

use crate::{BenchmarkError, StepPolicy, ThroughputBasis};

const DEFAULT_SECONDS_PER_PHASE: f64 = 3.0;
const DEFAULT_WARM_SECONDS: f64 = 5.0;
const DEFAULT_REPEAT_COUNT: NonZero<u32> = nz!(5);

/// 200 MiB of 4-byte words.
const DEFAULT_LOCAL_BUFFER_WORDS: usize = 200 * 1024 * 1024 / 4;

/// 1 GiB of 4-byte words.
const DEFAULT_SHARED_BUFFER_WORDS: usize = 1024 * 1024 * 1024 / 4;

/// Settings of a benchmark invocation. Immutable once built.
///
/// ```
/// use phased_bench::{RunConfiguration, StepPolicy};
///
/// let config = RunConfiguration::builder()
///     .seconds_per_phase(0.5)
///     .warm_seconds(1.0)
///     .step_policy(StepPolicy::FixedStride)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.repeat_count().get(), 5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfiguration {
    phase_duration: Duration,
    warm_duration: Duration,
    repeat_count: NonZero<u32>,
    step_policy: StepPolicy,
    throughput_basis: ThroughputBasis,
    local_buffer_words: usize,
    shared_buffer_words: usize,
}

impl RunConfiguration {
    /// Starts from the defaults.
    #[must_use]
    pub fn builder() -> RunConfigurationBuilder {
        RunConfigurationBuilder::default()
    }

    /// A builder pre-filled with this configuration.
    #[must_use]
    pub fn to_builder(&self) -> RunConfigurationBuilder {
        RunConfigurationBuilder {
            seconds_per_phase: self.phase_duration.as_secs_f64(),
            warm_seconds: self.warm_duration.as_secs_f64(),
            repeat_count: self.repeat_count.get(),
            step_policy: self.step_policy,
            throughput_basis: self.throughput_basis,
            local_buffer_words: self.local_buffer_words,
            shared_buffer_words: self.shared_buffer_words,
        }
    }

    /// Length of each measurement phase.
    #[must_use]
    pub fn phase_duration(&self) -> Duration {
        self.phase_duration
    }

    /// Length of the warm-up phase.
    #[must_use]
    pub fn warm_duration(&self) -> Duration {
        self.warm_duration
    }

    /// Number of measurement phases.
    #[must_use]
    pub fn repeat_count(&self) -> NonZero<u32> {
        self.repeat_count
    }

    /// How memory workloads step through their buffers.
    #[must_use]
    pub fn step_policy(&self) -> StepPolicy {
        self.step_policy
    }

    /// Which duration throughput is computed against.
    #[must_use]
    pub fn throughput_basis(&self) -> ThroughputBasis {
        self.throughput_basis
    }

    /// Size of the private buffer of each local memory workload, in 4-byte words.
    #[must_use]
    pub fn local_buffer_words(&self) -> usize {
        self.local_buffer_words
    }

    /// Size of the buffer shared by shared memory workloads, in 4-byte words.
    #[must_use]
    pub fn shared_buffer_words(&self) -> usize {
        self.shared_buffer_words
    }

    /// Time one scheduling cycle takes: warm-up plus every measurement phase.
    #[must_use]
    pub fn cycle_duration(&self) -> Duration {
        self.phase_duration
            .saturating_mul(self.repeat_count.get())
            .saturating_add(self.warm_duration)
    }
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            phase_duration: Duration::from_secs_f64(DEFAULT_SECONDS_PER_PHASE),
            warm_duration: Duration::from_secs_f64(DEFAULT_WARM_SECONDS),
            repeat_count: DEFAULT_REPEAT_COUNT,
            step_policy: StepPolicy::default(),
            throughput_basis: ThroughputBasis::default(),
            local_buffer_words: DEFAULT_LOCAL_BUFFER_WORDS,
            shared_buffer_words: DEFAULT_SHARED_BUFFER_WORDS,
        }
    }
}

/// Builds a validated [`RunConfiguration`].
#[derive(Clone, Debug)]
#[must_use]
pub struct RunConfigurationBuilder {
    seconds_per_phase: f64,
    warm_seconds: f64,
    repeat_count: u32,
    step_policy: StepPolicy,
    throughput_basis: ThroughputBasis,
    local_buffer_words: usize,
    shared_buffer_words: usize,
}

impl Default for RunConfigurationBuilder {
    fn default() -> Self {
        RunConfiguration::default().to_builder()
    }
}

impl RunConfigurationBuilder {
    /// Length of each measurement phase, in seconds.
    pub fn seconds_per_phase(mut self, seconds: f64) -> Self {
        self.seconds_per_phase = seconds;
        self
    }

    /// Length of the warm-up phase, in seconds. Zero skips the warm-up wait.
    pub fn warm_seconds(mut self, seconds: f64) -> Self {
        self.warm_seconds = seconds;
        self
    }

    /// Number of measurement phases.
    pub fn repeat_count(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self
    }

    /// How memory workloads step through their buffers.
    pub fn step_policy(mut self, policy: StepPolicy) -> Self {
        self.step_policy = policy;
        self
    }

    /// Which duration throughput is computed against.
    pub fn throughput_basis(mut self, basis: ThroughputBasis) -> Self {
        self.throughput_basis = basis;
        self
    }

    /// Size of the private buffer of each local memory workload, in 4-byte words.
    pub fn local_buffer_words(mut self, words: usize) -> Self {
        self.local_buffer_words = words;
        self
    }

    /// Size of the buffer shared by shared memory workloads, in 4-byte words.
    pub fn shared_buffer_words(mut self, words: usize) -> Self {
        self.shared_buffer_words = words;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`BenchmarkError::InvalidConfiguration`] if a duration is negative or not finite,
    /// the measurement phase is zero-length, the repeat count is zero or a buffer is empty.
    pub fn build(self) -> Result<RunConfiguration, BenchmarkError> {
        let phase_duration = seconds_to_duration("seconds per phase", self.seconds_per_phase)?;
        let warm_duration = seconds_to_duration("warm seconds", self.warm_seconds)?;

        if phase_duration.is_zero() {
            return Err(BenchmarkError::InvalidConfiguration(
                "seconds per phase must be greater than zero".to_string(),
            ));
        }

        let repeat_count = NonZero::new(self.repeat_count).ok_or_else(|| {
            BenchmarkError::InvalidConfiguration("repeat count must be at least 1".to_string())
        })?;

        if self.local_buffer_words == 0 || self.shared_buffer_words == 0 {
            return Err(BenchmarkError::InvalidConfiguration(
                "memory buffers must not be empty".to_string(),
            ));
        }

        Ok(RunConfiguration {
            phase_duration,
            warm_duration,
            repeat_count,
            step_policy: self.step_policy,
            throughput_basis: self.throughput_basis,
            local_buffer_words: self.local_buffer_words,
            shared_buffer_words: self.shared_buffer_words,
        })
    }
}

fn seconds_to_duration(name: &str, seconds: f64) -> Result<Duration, BenchmarkError> {
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        BenchmarkError::InvalidConfiguration(format!("{name} must be a non-negative number ({seconds}): {e}"))
    })
}
