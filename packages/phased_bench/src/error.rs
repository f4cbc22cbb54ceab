use std::io;

use hw_topology::ProcessorId;
use thiserror::Error;

/// Violation of the phase barrier protocol.
///
/// Any of these means the engine itself is broken or was misused; results of the invocation
/// that observed it cannot be trusted and it is aborted.
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum BarrierError {
    /// More participants signaled readiness in one phase than the barrier was sized for.
    #[error("{ready} participants signaled ready in phase {phase} of a barrier for {participant_count}")]
    ReadyOverflow {
        /// Phase in which the overflow was observed.
        phase: u32,
        /// Ready count that would have resulted from the signal.
        ready: u32,
        /// Number of participants the barrier was created for.
        participant_count: u32,
    },

    /// A participant observed a phase lower than one it had already observed.
    #[error("phase regressed from {previous} to {observed}")]
    PhaseRegression {
        /// Highest phase the participant had observed before.
        previous: u32,
        /// The lower phase observed afterwards.
        observed: u32,
    },

    /// The timer tried to advance a barrier that had already reached its terminal phase.
    #[error("cannot advance past terminal phase {terminal_phase}")]
    AdvancePastTerminal {
        /// The terminal phase of the barrier.
        terminal_phase: u32,
    },

    /// A sample for the same participant and phase was recorded twice.
    #[error("processor {core_index} recorded a second sample for phase {phase}")]
    DuplicateSample {
        /// Processor of the participant that recorded the sample.
        core_index: ProcessorId,
        /// Phase the sample is for.
        phase: u32,
    },

    /// A sample was recorded for a phase that has no measurement slot, by a participant the
    /// invocation does not have or for a processor other than the participant's.
    #[error("participant {ordinal} recorded a sample for phase {phase} that has no slot")]
    UnexpectedSample {
        /// Ordinal of the participant.
        ordinal: usize,
        /// Phase the sample claims to be for.
        phase: u32,
    },

    /// The invocation was aborted because of a failure elsewhere.
    #[error("the benchmark invocation was aborted")]
    Aborted,
}

/// Failure of a benchmark invocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BenchmarkError {
    /// The run configuration is not usable.
    #[error("invalid run configuration: {0}")]
    InvalidConfiguration(String),

    /// The participant set is empty.
    #[error("no participating processors were selected")]
    NoParticipants,

    /// The same processor was listed more than once as a participant.
    #[error("processor {0} is listed more than once as a participant")]
    DuplicateParticipant(ProcessorId),

    /// The phase barrier protocol was violated.
    #[error(transparent)]
    Barrier(#[from] BarrierError),

    /// A thread could not be started.
    #[error("failed to start thread {name}")]
    ThreadStart {
        /// Name of the thread.
        name: String,
        /// Error reported by the operating system.
        #[source]
        source: io::Error,
    },

    /// A core runner thread panicked.
    #[error("the core runner for processor {0} panicked")]
    RunnerPanicked(ProcessorId),

    /// The invocation completed but some participant did not record every measurement phase.
    #[error("expected {expected} samples but {recorded} were recorded")]
    IncompleteRun {
        /// Samples expected: participants times measurement phases.
        expected: usize,
        /// Samples actually recorded.
        recorded: usize,
    },
}
