use std::fmt::{self, Display, Formatter};

use crate::ProcessorId;

const WORD_BITS: u32 = u64::BITS;

/// A set of logical processors, stored as a bit mask.
///
/// Used for affinity masks and for the processor sets of topology relationships. Any processor
/// ID is accepted; the mask grows as needed.
///
/// The [`Display`] implementation emits the mask in the Linux `cpulist` format (e.g. `0-3,8`).
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ProcessorMask {
    // Bit N of word W represents processor W * 64 + N. Trailing zero words are never stored,
    // so that equality and hashing only depend on the set contents.
    words: Vec<u64>,
}

impl ProcessorMask {
    /// Creates an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a processor to the mask. Adding a processor that is already present has no effect.
    pub fn insert(&mut self, processor_id: ProcessorId) {
        let (word_index, bit) = locate(processor_id);

        if self.words.len() <= word_index {
            self.words.resize(word_index.wrapping_add(1), 0);
        }

        if let Some(word) = self.words.get_mut(word_index) {
            *word |= bit;
        }
    }

    /// Whether the processor is a member of the mask.
    #[must_use]
    pub fn contains(&self, processor_id: ProcessorId) -> bool {
        let (word_index, bit) = locate(processor_id);

        self.words
            .get(word_index)
            .is_some_and(|word| word & bit != 0)
    }

    /// Number of processors in the mask.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    /// Whether the mask contains no processors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The highest processor ID in the mask, if any.
    #[must_use]
    pub fn max(&self) -> Option<ProcessorId> {
        self.iter().last()
    }

    /// Iterates over the member processors in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ProcessorId> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                (0..WORD_BITS).filter_map(move |bit_index| {
                    if word & (1_u64 << bit_index) == 0 {
                        return None;
                    }

                    let base = ProcessorId::try_from(word_index).ok()?.checked_mul(WORD_BITS)?;
                    base.checked_add(bit_index)
                })
            })
    }

    /// Processors present in both masks.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut words: Vec<u64> = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a & b)
            .collect();

        trim_trailing_zeros(&mut words);

        Self { words }
    }

    /// Renders the mask as a string of `width` characters where position `i` is `1` if
    /// processor `i` is a member and `-` if it is not.
    ///
    /// Members with an ID at or above `width` are not rendered.
    #[must_use]
    pub fn to_bit_string(&self, width: usize) -> String {
        (0..width)
            .map(|position| {
                let member = ProcessorId::try_from(position).is_ok_and(|id| self.contains(id));

                if member { '1' } else { '-' }
            })
            .collect()
    }
}

impl FromIterator<ProcessorId> for ProcessorMask {
    fn from_iter<T: IntoIterator<Item = ProcessorId>>(iter: T) -> Self {
        let mut mask = Self::new();

        for processor_id in iter {
            mask.insert(processor_id);
        }

        mask
    }
}

impl Extend<ProcessorId> for ProcessorMask {
    fn extend<T: IntoIterator<Item = ProcessorId>>(&mut self, iter: T) {
        for processor_id in iter {
            self.insert(processor_id);
        }
    }
}

impl Display for ProcessorMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }

        write!(f, "{}", cpulist::emit(self.iter()))
    }
}

fn locate(processor_id: ProcessorId) -> (usize, u64) {
    let word_index = (processor_id >> WORD_BITS.trailing_zeros()) as usize;
    let bit = 1_u64 << (processor_id & (WORD_BITS.wrapping_sub(1)));

    (word_index, bit)
}

fn trim_trailing_zeros(words: &mut Vec<u64>) {
    while words.last() == Some(&0) {
        words.pop();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ProcessorMask: Send, Sync, Clone);

    #[test]
    fn insert_and_contains() {
        let mut mask = ProcessorMask::new();
        assert!(mask.is_empty());

        mask.insert(0);
        mask.insert(5);
        mask.insert(130);
        mask.insert(5);

        assert_eq!(mask.count(), 3);
        assert!(mask.contains(0));
        assert!(mask.contains(5));
        assert!(mask.contains(130));
        assert!(!mask.contains(1));
        assert!(!mask.contains(64));
        assert!(!mask.contains(10_000));
        assert_eq!(mask.max(), Some(130));
    }

    #[test]
    fn iter_is_ascending() {
        let mask: ProcessorMask = [70, 3, 64, 1].into_iter().collect();

        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 3, 64, 70]);
    }

    #[test]
    fn equality_ignores_construction_order() {
        let a: ProcessorMask = [1, 200].into_iter().collect();
        let b: ProcessorMask = [200, 1].into_iter().collect();

        assert_eq!(a, b);
    }

    #[test]
    fn intersection_trims_empty_words() {
        let a: ProcessorMask = [1, 2, 100].into_iter().collect();
        let b: ProcessorMask = [2, 3].into_iter().collect();

        let both = a.intersection(&b);

        assert_eq!(both, [2].into_iter().collect());

        let none = ProcessorMask::from_iter([100]).intersection(&b);
        assert!(none.is_empty());
        assert_eq!(none, ProcessorMask::new());
    }

    #[test]
    fn bit_string_marks_members() {
        let mask: ProcessorMask = [0, 2, 3, 9].into_iter().collect();

        assert_eq!(mask.to_bit_string(6), "1-11--");
        assert_eq!(mask.to_bit_string(0), "");
    }

    #[test]
    fn display_uses_cpulist_ranges() {
        let mask: ProcessorMask = [0, 1, 2, 3, 8, 10, 11].into_iter().collect();
        assert_eq!(mask.to_string(), "0-3,8,10,11");

        assert_eq!(ProcessorMask::new().to_string(), "(none)");
    }
}
