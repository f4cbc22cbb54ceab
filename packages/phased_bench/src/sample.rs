use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use hw_topology::ProcessorId;

/// Whether a core runner managed to pin its thread to its processor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AffinityStatus {
    /// The thread ran on its assigned processor only.
    Pinned,
    /// Pinning failed; the thread ran wherever the operating system put it.
    Unpinned,
}

/// Which duration throughput is computed against.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ThroughputBasis {
    /// Processor time consumed by the measuring thread.
    #[default]
    ProcessorTime,
    /// Wall clock time of the measured window.
    WallClock,
}

impl Display for ThroughputBasis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessorTime => write!(f, "processor"),
            Self::WallClock => write!(f, "wall"),
        }
    }
}

impl FromStr for ThroughputBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processor" | "cpu" | "processor-time" => Ok(Self::ProcessorTime),
            "wall" | "wall-clock" | "wallclock" => Ok(Self::WallClock),
            _ => Err(format!("unknown throughput basis '{s}', expected 'processor' or 'wall'")),
        }
    }
}

/// Operations per millisecond, or the explicit absence of a value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Throughput {
    /// A measured value.
    Measured(f64),
    /// The measured duration was zero, so no rate can be computed.
    Undefined,
}

impl Throughput {
    /// The measured value, if any.
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Measured(value) => Some(value),
            Self::Undefined => None,
        }
    }
}

impl Display for Throughput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(value) => write!(f, "{value:.3}"),
            Self::Undefined => write!(f, "n/a"),
        }
    }
}

/// Result of one participant in one measurement phase.
///
/// Written exactly once, by the participant's own thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BenchmarkSample {
    core_index: ProcessorId,
    phase_index: u32,
    operation_count: u64,
    wall_elapsed: Duration,
    processor_time: Duration,
    affinity: AffinityStatus,
}

impl BenchmarkSample {
    /// Creates a sample.
    #[must_use]
    pub fn new(
        core_index: ProcessorId,
        phase_index: u32,
        operation_count: u64,
        wall_elapsed: Duration,
        processor_time: Duration,
        affinity: AffinityStatus,
    ) -> Self {
        Self {
            core_index,
            phase_index,
            operation_count,
            wall_elapsed,
            processor_time,
            affinity,
        }
    }

    /// Processor the participant was assigned to.
    #[must_use]
    pub fn core_index(&self) -> ProcessorId {
        self.core_index
    }

    /// Measurement phase the sample is for, counted from 1.
    #[must_use]
    pub fn phase_index(&self) -> u32 {
        self.phase_index
    }

    /// Operations counted within the measured window.
    #[must_use]
    pub fn operation_count(&self) -> u64 {
        self.operation_count
    }

    /// Wall clock length of the measured window.
    #[must_use]
    pub fn wall_elapsed(&self) -> Duration {
        self.wall_elapsed
    }

    /// Processor time the thread consumed within the measured window.
    #[must_use]
    pub fn processor_time(&self) -> Duration {
        self.processor_time
    }

    /// Whether the thread was pinned.
    #[must_use]
    pub fn affinity(&self) -> AffinityStatus {
        self.affinity
    }

    /// Throughput of the measured window.
    #[must_use]
    pub fn ops_per_ms(&self, basis: ThroughputBasis) -> Throughput {
        let elapsed = match basis {
            ThroughputBasis::ProcessorTime => self.processor_time,
            ThroughputBasis::WallClock => self.wall_elapsed,
        };

        if elapsed.is_zero() {
            return Throughput::Undefined;
        }

        #[expect(
            clippy::cast_precision_loss,
            reason = "operation counts stay far below 2^52 within one phase"
        )]
        let operations = self.operation_count as f64;

        Throughput::Measured(operations / (elapsed.as_secs_f64() * 1000.0))
    }
}
