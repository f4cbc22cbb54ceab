use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Upper bound (exclusive) of the randomized step magnitude, in buffer words.
/// The magnitude is drawn from `[RANDOMIZED_STEP_WORDS / 2, RANDOMIZED_STEP_WORDS)`.
pub const RANDOMIZED_STEP_WORDS: usize = 16_777_216;

/// Step magnitude of the fixed stride policy: 17 MiB worth of 4-byte words.
pub const FIXED_STRIDE_WORDS: usize = 17 * 1024 * 1024 / 4;

/// How the memory workloads move through their buffer.
///
/// The two policies are different stress patterns. The randomized step makes every access land
/// somewhere hard to predict, defeating prefetchers and thrashing the TLB. The fixed stride is
/// deterministic and repeatable between runs.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum StepPolicy {
    /// Step magnitude drawn uniformly from a range for every step.
    #[default]
    Randomized,

    /// The same step magnitude every time.
    FixedStride,
}

impl Display for StepPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Randomized => write!(f, "randomized"),
            Self::FixedStride => write!(f, "fixed"),
        }
    }
}

impl FromStr for StepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "randomized" | "random" => Ok(Self::Randomized),
            "fixed" | "fixed-stride" | "stride" => Ok(Self::FixedStride),
            _ => Err(format!("unknown step policy '{s}', expected 'randomized' or 'fixed'")),
        }
    }
}

/// Computes the next index into a circular buffer.
///
/// Owns the random number generator used by [`StepPolicy::Randomized`], so each workload
/// instance has its own.
#[derive(Debug)]
pub struct AddressStepper {
    policy: StepPolicy,
    rng: SmallRng,
}

impl AddressStepper {
    /// Creates a stepper with a randomly seeded generator.
    #[must_use]
    pub fn new(policy: StepPolicy) -> Self {
        Self {
            policy,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    /// Creates a stepper with a fixed seed, for repeatable sequences.
    #[must_use]
    pub fn with_seed(policy: StepPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// The policy this stepper applies.
    #[must_use]
    pub fn policy(&self) -> StepPolicy {
        self.policy
    }

    /// Returns the index one step away from `current` in the given direction.
    ///
    /// For any `length > 0` and `current < length` the result is in `[0, length)`. The step
    /// magnitude is reduced modulo `length` first, so a single wraparound correction is always
    /// enough, even for buffers shorter than the step. A zero `length` yields 0.
    #[must_use]
    pub fn next(&mut self, current: usize, forward: bool, length: usize) -> usize {
        if length == 0 {
            return 0;
        }

        debug_assert!(current < length, "index {current} outside buffer of {length}");
        let current = current.checked_rem(length).unwrap_or_default();

        let magnitude = match self.policy {
            StepPolicy::Randomized => self
                .rng
                .random_range(RANDOMIZED_STEP_WORDS / 2..RANDOMIZED_STEP_WORDS),
            StepPolicy::FixedStride => FIXED_STRIDE_WORDS,
        }
        .checked_rem(length)
        .unwrap_or_default();

        wrap_step(current, magnitude, forward, length)
    }
}

/// Moves `magnitude` words from `current` around a ring of `length` words.
///
/// Requires `current < length` and `magnitude < length`. Never overflows.
fn wrap_step(current: usize, magnitude: usize, forward: bool, length: usize) -> usize {
    if forward {
        // Words left before the end of the buffer; always at least 1.
        let room = length.wrapping_sub(current);

        if magnitude < room {
            current.wrapping_add(magnitude)
        } else {
            magnitude.wrapping_sub(room)
        }
    } else if magnitude <= current {
        current.wrapping_sub(magnitude)
    } else {
        length.wrapping_sub(magnitude.wrapping_sub(current))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn result_always_within_bounds() {
        let lengths = [
            1,
            2,
            3,
            1000,
            FIXED_STRIDE_WORDS - 1,
            FIXED_STRIDE_WORDS,
            FIXED_STRIDE_WORDS + 1,
            RANDOMIZED_STEP_WORDS / 2,
            RANDOMIZED_STEP_WORDS + 7,
            200 * 1024 * 1024 / 4,
        ];

        for policy in [StepPolicy::Randomized, StepPolicy::FixedStride] {
            let mut stepper = AddressStepper::with_seed(policy, 42);

            for length in lengths {
                for current in [0, length / 2, length - 1] {
                    for forward in [true, false] {
                        let next = stepper.next(current, forward, length);
                        assert!(
                            next < length,
                            "{policy} step from {current} (forward: {forward}) left buffer of {length}: {next}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn long_walk_stays_in_bounds() {
        let length = 12_345_679;
        let mut stepper = AddressStepper::with_seed(StepPolicy::Randomized, 7);
        let mut index = 0;

        for step in 0..10_000 {
            index = stepper.next(index, step % 2 == 0, length);
            assert!(index < length);
        }
    }

    #[test]
    fn fixed_stride_is_deterministic() {
        let length = FIXED_STRIDE_WORDS * 3;
        let mut stepper = AddressStepper::new(StepPolicy::FixedStride);

        assert_eq!(stepper.next(0, true, length), FIXED_STRIDE_WORDS);
        assert_eq!(stepper.next(FIXED_STRIDE_WORDS * 2, true, length), 0);
        assert_eq!(stepper.next(0, false, length), FIXED_STRIDE_WORDS * 2);
        assert_eq!(stepper.next(FIXED_STRIDE_WORDS, false, length), 0);
    }

    #[test]
    fn randomized_magnitude_within_range() {
        // With a buffer much larger than the step, no wrapping happens and the distance moved
        // is exactly the drawn magnitude.
        let length = RANDOMIZED_STEP_WORDS * 4;
        let start = RANDOMIZED_STEP_WORDS * 2;
        let mut stepper = AddressStepper::with_seed(StepPolicy::Randomized, 1);

        for _ in 0..1000 {
            let forward = stepper.next(start, true, length) - start;
            assert!((RANDOMIZED_STEP_WORDS / 2..RANDOMIZED_STEP_WORDS).contains(&forward));

            let backward = start - stepper.next(start, false, length);
            assert!((RANDOMIZED_STEP_WORDS / 2..RANDOMIZED_STEP_WORDS).contains(&backward));
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = AddressStepper::with_seed(StepPolicy::Randomized, 99);
        let mut b = AddressStepper::with_seed(StepPolicy::Randomized, 99);

        let length = 50_000_000;
        let (mut x, mut y) = (0, 0);

        for _ in 0..100 {
            x = a.next(x, true, length);
            y = b.next(y, true, length);
            assert_eq!(x, y);
        }
    }

    #[test]
    fn wrap_step_edges() {
        assert_eq!(wrap_step(9, 1, true, 10), 0);
        assert_eq!(wrap_step(9, 9, true, 10), 8);
        assert_eq!(wrap_step(0, 1, false, 10), 9);
        assert_eq!(wrap_step(3, 3, false, 10), 0);
        assert_eq!(wrap_step(0, 0, true, 1), 0);
        assert_eq!(wrap_step(0, 0, false, 1), 0);
    }

    #[test]
    fn zero_length_yields_zero() {
        let mut stepper = AddressStepper::with_seed(StepPolicy::FixedStride, 0);
        assert_eq!(stepper.next(0, true, 0), 0);
    }

    #[test]
    fn parse_policy() {
        assert_eq!("Randomized".parse(), Ok(StepPolicy::Randomized));
        assert_eq!("fixed".parse(), Ok(StepPolicy::FixedStride));
        assert!("zigzag".parse::<StepPolicy>().is_err());
        assert_eq!(StepPolicy::FixedStride.to_string(), "fixed");
    }
}
