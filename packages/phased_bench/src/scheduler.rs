use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpu_time::ThreadTime;
use hw_topology::ProcessorId;
use itertools::Itertools;
use tracing::{error, info};

use crate::{
    AffinityStatus, BarrierError, BenchmarkContext, BenchmarkError, BenchmarkSample, CoreRunner,
    CoreVector, PairMatrix, PhaseBarrier, PhaseTimer, ReadySignal, RunConfiguration, Throughput,
    Workload, WorkloadKind, best_per_core,
};

/// Runs one phased benchmark invocation over `participants`.
///
/// One [`CoreRunner`] per participant creates its workload via `create_workload(ordinal)` on its
/// own pinned thread, then works through the warm-up and `repeat_count` measurement phases in
/// lockstep with the other participants. Returns exactly one sample per participant per
/// measurement phase, ordered by participant and then by phase.
///
/// # Errors
///
/// Returns an error if the participant set is empty or has duplicates, if a thread cannot be
/// started or panics, or if the phase barrier protocol is violated. Any of these aborts the
/// invocation for every participant.
pub fn run_phased<W, F>(
    config: &RunConfiguration,
    participants: &[ProcessorId],
    create_workload: F,
) -> Result<Vec<BenchmarkSample>, BenchmarkError>
where
    W: Workload + 'static,
    F: Fn(usize) -> W + Send + Sync + 'static,
{
    validate_participants(participants)?;

    let context = Arc::new(BenchmarkContext::new(participants, config.repeat_count()));
    let create_workload = Arc::new(create_workload);

    info!(
        participants = %participants.iter().join(","),
        repeat_count = config.repeat_count().get(),
        "phased benchmark starting"
    );

    let mut failure = None;
    let mut running = Vec::with_capacity(participants.len());

    for (ordinal, &processor_id) in participants.iter().enumerate() {
        let participant_context = Arc::clone(&context);
        let create_workload = Arc::clone(&create_workload);

        let runner = CoreRunner::new(processor_id, move |processor_id, affinity| {
            let _abort_on_panic = AbortOnPanic(participant_context.barrier());

            let mut workload = create_workload(ordinal);
            workload.warm();

            run_participant(
                &participant_context,
                ordinal,
                processor_id,
                affinity,
                &mut workload,
            )
        });

        match runner.start() {
            Ok(core) => running.push(core),
            Err(e) => {
                context.barrier().abort();
                failure = Some(e);
                break;
            }
        }
    }

    let timer = if failure.is_none() {
        match PhaseTimer::start(
            Arc::clone(&context),
            config.warm_duration(),
            config.phase_duration(),
        ) {
            Ok(timer) => Some(timer),
            Err(e) => {
                context.barrier().abort();
                failure = Some(e);
                None
            }
        }
    } else {
        None
    };

    for core in running {
        if let Err(e) = core.join().and_then(|result| result) {
            context.barrier().abort();
            failure.get_or_insert(e);
        }
    }

    if let Some(timer) = timer {
        timer.stop();
    }

    if let Some(e) = failure {
        return Err(e);
    }

    if context.barrier().is_aborted() {
        return Err(BarrierError::Aborted.into());
    }

    let samples = context.samples();
    let expected = context.expected_sample_count();

    if samples.len() != expected {
        return Err(BenchmarkError::IncompleteRun {
            expected,
            recorded: samples.len(),
        });
    }

    info!(samples = samples.len(), "phased benchmark finished");

    Ok(samples)
}

/// Pairwise mode: one scheduling cycle per unordered pair `(i, j)`, `i <= j`, of `cores`.
///
/// The diagonal runs a single participant. Each cell is the mean of the best-of-K throughput of
/// the (one or two) participants. `on_cycle` is called after every cycle.
///
/// # Errors
///
/// Stops at and returns the first failed cycle.
pub fn run_pairwise(
    config: &RunConfiguration,
    cores: &[ProcessorId],
    workload: &WorkloadKind,
    mut on_cycle: impl FnMut(),
) -> Result<PairMatrix, BenchmarkError> {
    validate_participants(cores)?;

    let mut matrix = PairMatrix::empty(cores.to_vec());

    for (row, &first) in cores.iter().enumerate() {
        for (column, &second) in cores.iter().enumerate().skip(row) {
            let participants = if row == column {
                vec![first]
            } else {
                vec![first, second]
            };

            let kind = workload.clone();
            let samples = run_phased(config, &participants, move |ordinal| kind.create(ordinal))?;

            let per_core = best_per_core(&samples, config.throughput_basis());
            matrix.set(row, column, mean_of_defined(&per_core));

            on_cycle();
        }
    }

    Ok(matrix)
}

/// Subset mode: one scheduling cycle over all of `cores` at once, reduced to one best-of-K value
/// per core.
///
/// # Errors
///
/// Returns the error of the cycle, if it fails.
pub fn run_subset(
    config: &RunConfiguration,
    cores: &[ProcessorId],
    workload: &WorkloadKind,
) -> Result<CoreVector, BenchmarkError> {
    let kind = workload.clone();
    let samples = run_phased(config, cores, move |ordinal| kind.create(ordinal))?;

    Ok(best_per_core(&samples, config.throughput_basis()))
}

/// Number of scheduling cycles [`run_pairwise()`] performs for `core_count` cores.
#[must_use]
#[expect(
    clippy::integer_division,
    reason = "n * (n + 1) is always even"
)]
pub fn pair_cycle_count(core_count: usize) -> usize {
    core_count.saturating_mul(core_count.saturating_add(1)) / 2
}

fn mean_of_defined(vector: &CoreVector) -> Throughput {
    let values = vector
        .entries()
        .iter()
        .filter_map(|(_, value)| value.value())
        .collect_vec();

    if values.is_empty() {
        return Throughput::Undefined;
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "at most two participants per pair"
    )]
    let count = values.len() as f64;

    Throughput::Measured(values.iter().sum::<f64>() / count)
}

fn validate_participants(participants: &[ProcessorId]) -> Result<(), BenchmarkError> {
    if participants.is_empty() {
        return Err(BenchmarkError::NoParticipants);
    }

    if u32::try_from(participants.len()).is_err() {
        return Err(BenchmarkError::InvalidConfiguration(format!(
            "{} participants is more than a phase barrier supports",
            participants.len()
        )));
    }

    let mut seen = HashSet::with_capacity(participants.len());

    for &processor_id in participants {
        if !seen.insert(processor_id) {
            return Err(BenchmarkError::DuplicateParticipant(processor_id));
        }
    }

    Ok(())
}

/// Aborts the barrier if the participant thread unwinds, so its peers and the timer do not wait
/// for it forever.
struct AbortOnPanic<'a>(&'a PhaseBarrier);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// The work loop of one participant, from the warm-up to the terminal phase.
fn run_participant<W: Workload>(
    context: &BenchmarkContext,
    ordinal: usize,
    processor_id: ProcessorId,
    affinity: AffinityStatus,
    workload: &mut W,
) -> Result<(), BenchmarkError> {
    let barrier = context.barrier();
    let mut previous = 0;

    loop {
        let phase = barrier.phase();

        if phase < previous {
            let violation = BarrierError::PhaseRegression {
                previous,
                observed: phase,
            };

            error!(processor_id, %violation, "phase barrier protocol violated");
            barrier.abort();
            return Err(violation.into());
        }

        previous = phase;

        if barrier.is_finished(phase) {
            return Ok(());
        }

        let Some(measurement) = run_phase(barrier, phase, workload)? else {
            continue;
        };

        // Phase 0 is the warm-up and is never reported.
        if phase == 0 {
            continue;
        }

        let sample = BenchmarkSample::new(
            processor_id,
            phase,
            measurement.operations,
            measurement.wall_elapsed,
            measurement.processor_time,
            affinity,
        );

        if let Err(violation) = context.record(ordinal, sample) {
            barrier.abort();
            return Err(violation.into());
        }
    }
}

#[derive(Debug)]
struct PhaseMeasurement {
    operations: u64,
    wall_elapsed: Duration,
    processor_time: Duration,
}

/// Works through one phase. Returns `None` if the phase was already over on arrival.
///
/// Operations are only counted once every participant has arrived, and the measured window
/// starts at that moment, so early arrivals get no head start.
fn run_phase<W: Workload>(
    barrier: &PhaseBarrier,
    phase: u32,
    workload: &mut W,
) -> Result<Option<PhaseMeasurement>, BarrierError> {
    let signal = barrier.signal_ready(phase)?;

    if signal == ReadySignal::PhaseAlreadyOver {
        return Ok(None);
    }

    let mut ready = signal == ReadySignal::LastToArrive;
    let mut window = MeasurementWindow::start();
    let mut operations: u64 = 0;

    while barrier.phase() == phase {
        workload.do_work();

        if ready {
            operations = operations.wrapping_add(1);
        } else if barrier.all_ready(phase) {
            ready = true;
            window = MeasurementWindow::start();
        }
    }

    let (wall_elapsed, processor_time) = window.elapsed();

    Ok(Some(PhaseMeasurement {
        operations,
        wall_elapsed,
        processor_time,
    }))
}

/// Wall clock and thread processor time since the window started.
struct MeasurementWindow {
    wall: Instant,
    // `None` if the platform cannot report thread processor time; the sample then has zero
    // processor time and an undefined processor-time throughput.
    processor: Option<ThreadTime>,
}

impl MeasurementWindow {
    fn start() -> Self {
        Self {
            wall: Instant::now(),
            processor: ThreadTime::try_now().ok(),
        }
    }

    fn elapsed(&self) -> (Duration, Duration) {
        let processor = self
            .processor
            .as_ref()
            .and_then(|start| start.try_elapsed().ok())
            .unwrap_or_default();

        (self.wall.elapsed(), processor)
    }
}
