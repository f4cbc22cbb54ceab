use std::hint::black_box;
use std::sync::Arc;

use rand::Rng;

use crate::{AddressStepper, StepPolicy};

/// Exclusive upper bound of the values stored in memory workload buffers.
const BUFFER_VALUE_LIMIT: u32 = 500;

/// The candidate counter of [`PrimeWorkload`] restarts from zero once it reaches this value.
const PRIME_CANDIDATE_LIMIT: u32 = i32::MAX.unsigned_abs();

/// A repeatable unit of processor or memory work.
///
/// Instances are created on the thread that will run them, after that thread has been pinned,
/// and before any phase starts. `do_work()` must be callable without limit and must not grow
/// the memory owned by the instance.
pub trait Workload: Send {
    /// Performs one unit of work. One call is one counted operation.
    fn do_work(&mut self);

    /// Prepares the instance for measurement. Called once, on the worker thread, before the
    /// first phase.
    fn warm(&mut self) {}
}

/// Compute-bound workload: tests successive integers for primality.
#[derive(Debug, Default)]
pub struct PrimeWorkload {
    candidate: u32,
    primes_found: u64,
}

impl PrimeWorkload {
    /// Creates a workload that starts testing from 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            candidate: 1,
            primes_found: 0,
        }
    }

    /// Number of primes found so far.
    #[must_use]
    pub fn primes_found(&self) -> u64 {
        self.primes_found
    }
}

impl Workload for PrimeWorkload {
    fn do_work(&mut self) {
        self.candidate = if self.candidate >= PRIME_CANDIDATE_LIMIT {
            0
        } else {
            self.candidate.wrapping_add(1)
        };

        if is_prime(black_box(self.candidate)) {
            self.primes_found = self.primes_found.wrapping_add(1);
        }
    }
}

/// Trial division primality test.
#[must_use]
pub fn is_prime(candidate: u32) -> bool {
    if candidate & 1 == 0 {
        return candidate == 2;
    }

    let candidate = u64::from(candidate);
    let mut divisor: u64 = 3;

    while divisor.wrapping_mul(divisor) <= candidate {
        if candidate.checked_rem(divisor) == Some(0) {
            return false;
        }

        divisor = divisor.wrapping_add(2);
    }

    candidate != 1
}

/// Creates a buffer of `words` small random values.
#[must_use]
pub fn random_buffer(words: usize) -> Vec<u32> {
    let mut rng = rand::rng();

    (0..words)
        .map(|_| rng.random_range(0..BUFFER_VALUE_LIMIT))
        .collect()
}

/// Walks a buffer with an [`AddressStepper`], summing the values it visits.
#[derive(Debug)]
struct BufferWalk {
    stepper: AddressStepper,
    forward: bool,
    next: usize,
    sum: u64,
}

impl BufferWalk {
    fn new(policy: StepPolicy, forward: bool, length: usize) -> Self {
        let next = if length == 0 {
            0
        } else {
            rand::rng().random_range(0..length)
        };

        Self {
            stepper: AddressStepper::new(policy),
            forward,
            next,
            sum: 0,
        }
    }

    fn step(&mut self, buffer: &[u32]) {
        let value = buffer.get(self.next).copied().unwrap_or_default();
        self.sum = self.sum.wrapping_add(u64::from(black_box(value)));

        self.next = self.stepper.next(self.next, self.forward, buffer.len());
    }
}

/// Memory workload over a buffer private to the worker.
///
/// The buffer is filled in `warm()` so that its pages are first touched by the pinned worker
/// thread and therefore placed in memory local to that processor.
#[derive(Debug)]
pub struct LocalMemoryWorkload {
    buffer: Vec<u32>,
    walk: BufferWalk,
}

impl LocalMemoryWorkload {
    /// Creates a workload over a private buffer of `words` 4-byte words.
    #[must_use]
    pub fn new(words: usize, forward: bool, policy: StepPolicy) -> Self {
        Self {
            buffer: vec![0; words],
            walk: BufferWalk::new(policy, forward, words),
        }
    }
}

impl Workload for LocalMemoryWorkload {
    fn do_work(&mut self) {
        self.walk.step(&self.buffer);
    }

    fn warm(&mut self) {
        let mut rng = rand::rng();

        for word in &mut self.buffer {
            *word = rng.random_range(0..BUFFER_VALUE_LIMIT);
        }
    }
}

/// Memory workload over a buffer shared by every worker of the run.
///
/// The buffer is only read. Each worker keeps its own position, so the walk state is never
/// shared.
#[derive(Debug)]
pub struct SharedMemoryWorkload {
    buffer: Arc<[u32]>,
    walk: BufferWalk,
}

impl SharedMemoryWorkload {
    /// Creates a workload that walks `buffer` from a random starting position.
    #[must_use]
    pub fn new(buffer: Arc<[u32]>, forward: bool, policy: StepPolicy) -> Self {
        let walk = BufferWalk::new(policy, forward, buffer.len());

        Self { buffer, walk }
    }
}

impl Workload for SharedMemoryWorkload {
    fn do_work(&mut self) {
        self.walk.step(&self.buffer);
    }
}

/// Selects which workload every participant of a run executes.
///
/// This is the factory for the closed set of workloads: each participant calls
/// [`create()`][Self::create] on its own thread.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum WorkloadKind {
    /// [`PrimeWorkload`].
    Prime,

    /// [`LocalMemoryWorkload`] with a buffer of `words` per participant.
    LocalMemory {
        /// Buffer size in 4-byte words.
        words: usize,
        /// How to step through the buffer.
        policy: StepPolicy,
    },

    /// [`SharedMemoryWorkload`] over one buffer allocated before the run.
    SharedMemory {
        /// The buffer shared by all participants.
        buffer: Arc<[u32]>,
        /// How to step through the buffer.
        policy: StepPolicy,
    },
}

impl WorkloadKind {
    /// Creates the workload instance for the participant with the given ordinal.
    ///
    /// Memory workloads walk forward for even ordinals and backward for odd ones.
    #[must_use]
    pub fn create(&self, ordinal: usize) -> AnyWorkload {
        let forward = ordinal % 2 == 0;

        match self {
            Self::Prime => AnyWorkload::Prime(PrimeWorkload::new()),
            Self::LocalMemory { words, policy } => {
                AnyWorkload::LocalMemory(LocalMemoryWorkload::new(*words, forward, *policy))
            }
            Self::SharedMemory { buffer, policy } => AnyWorkload::SharedMemory(
                SharedMemoryWorkload::new(Arc::clone(buffer), forward, *policy),
            ),
        }
    }
}

/// One of the built-in workloads, dispatched without a virtual call in the hot loop.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyWorkload {
    /// See [`PrimeWorkload`].
    Prime(PrimeWorkload),
    /// See [`LocalMemoryWorkload`].
    LocalMemory(LocalMemoryWorkload),
    /// See [`SharedMemoryWorkload`].
    SharedMemory(SharedMemoryWorkload),
}

impl Workload for AnyWorkload {
    #[inline]
    fn do_work(&mut self) {
        match self {
            Self::Prime(w) => w.do_work(),
            Self::LocalMemory(w) => w.do_work(),
            Self::SharedMemory(w) => w.do_work(),
        }
    }

    fn warm(&mut self) {
        match self {
            Self::Prime(w) => w.warm(),
            Self::LocalMemory(w) => w.warm(),
            Self::SharedMemory(w) => w.warm(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(AnyWorkload: Send);
    assert_impl_all!(WorkloadKind: Send, Sync);

    #[test]
    fn primality() {
        let primes: Vec<u32> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);

        assert!(is_prime(2_147_483_647));
        assert!(!is_prime(2_147_483_649));
        assert!(!is_prime(u32::MAX));
    }

    #[test]
    fn prime_workload_counts_primes() {
        let mut workload = PrimeWorkload::new();

        // Candidates 2..=11.
        for _ in 0..10 {
            workload.do_work();
        }

        assert_eq!(workload.primes_found(), 5);
    }

    #[test]
    fn prime_workload_wraps_at_limit() {
        let mut workload = PrimeWorkload {
            candidate: PRIME_CANDIDATE_LIMIT - 1,
            primes_found: 0,
        };

        workload.do_work();
        assert_eq!(workload.candidate, PRIME_CANDIDATE_LIMIT);

        workload.do_work();
        assert_eq!(workload.candidate, 0);
    }

    #[test]
    fn local_memory_fills_buffer_when_warmed() {
        let mut workload = LocalMemoryWorkload::new(4096, true, StepPolicy::Randomized);
        assert!(workload.buffer.iter().all(|&w| w == 0));

        workload.warm();
        assert!(workload.buffer.iter().all(|&w| w < BUFFER_VALUE_LIMIT));
        assert!(workload.buffer.iter().any(|&w| w != 0));

        for _ in 0..10_000 {
            workload.do_work();
            assert!(workload.walk.next < workload.buffer.len());
        }

        assert_eq!(workload.buffer.len(), 4096);
    }

    #[test]
    fn shared_memory_only_reads_buffer() {
        let buffer: Arc<[u32]> = random_buffer(1000).into();
        let snapshot = buffer.to_vec();

        let mut a = SharedMemoryWorkload::new(Arc::clone(&buffer), true, StepPolicy::FixedStride);
        let mut b = SharedMemoryWorkload::new(Arc::clone(&buffer), false, StepPolicy::Randomized);

        for _ in 0..1000 {
            a.do_work();
            b.do_work();
        }

        assert_eq!(&*buffer, snapshot.as_slice());
        assert!(a.walk.sum > 0 || b.walk.sum > 0);
    }

    #[test]
    fn empty_buffer_is_harmless() {
        let mut workload = LocalMemoryWorkload::new(0, false, StepPolicy::FixedStride);
        workload.warm();
        workload.do_work();
        assert_eq!(workload.walk.sum, 0);
    }

    #[test]
    fn kind_alternates_direction_by_ordinal() {
        let kind = WorkloadKind::LocalMemory {
            words: 16,
            policy: StepPolicy::FixedStride,
        };

        let AnyWorkload::LocalMemory(even) = kind.create(0) else {
            panic!("expected local memory workload");
        };
        let AnyWorkload::LocalMemory(odd) = kind.create(1) else {
            panic!("expected local memory workload");
        };

        assert!(even.walk.forward);
        assert!(!odd.walk.forward);
    }

    #[test]
    fn random_buffer_values_bounded() {
        let buffer = random_buffer(10_000);
        assert_eq!(buffer.len(), 10_000);
        assert!(buffer.iter().all(|&w| w < BUFFER_VALUE_LIMIT));
    }
}
