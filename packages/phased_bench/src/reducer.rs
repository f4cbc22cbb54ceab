//! Reduces raw samples to per-core statistics, pair matrices and per-core vectors.

use hw_topology::ProcessorId;
use itertools::Itertools;

use crate::{BenchmarkSample, Throughput, ThroughputBasis};

/// A paired run whose throughput falls below this fraction of the two processors' solo
/// throughput (on top of being the minimum of both rows) marks the pair as likely siblings.
const SIBLING_THRESHOLD: f64 = 0.8;

/// The best throughput among the samples. Undefined samples are ignored; if no sample has a
/// defined throughput, the result is undefined.
#[must_use]
pub fn best_of<'a>(
    samples: impl IntoIterator<Item = &'a BenchmarkSample>,
    basis: ThroughputBasis,
) -> Throughput {
    samples
        .into_iter()
        .filter_map(|sample| sample.ops_per_ms(basis).value())
        .reduce(f64::max)
        .map_or(Throughput::Undefined, Throughput::Measured)
}

/// Best-of-K throughput of every processor that has samples, in order of first appearance.
#[must_use]
pub fn best_per_core(samples: &[BenchmarkSample], basis: ThroughputBasis) -> CoreVector {
    let entries = samples
        .iter()
        .map(BenchmarkSample::core_index)
        .unique()
        .map(|core| {
            let best = best_of(samples.iter().filter(|s| s.core_index() == core), basis);
            (core, best)
        })
        .collect();

    CoreVector { entries }
}

/// `value` as a percentage of `max`. Undefined if either is undefined or `max` is not positive.
#[must_use]
pub fn percent_of(value: Throughput, max: Option<f64>) -> Throughput {
    match (value, max) {
        (Throughput::Measured(value), Some(max)) if max > 0.0 => {
            Throughput::Measured(value * 100.0 / max)
        }
        _ => Throughput::Undefined,
    }
}

fn max_defined(values: impl Iterator<Item = Throughput>) -> Option<f64> {
    values.filter_map(Throughput::value).reduce(f64::max)
}

/// Pairwise throughput, defined for every `row <= column`.
///
/// Rows and columns are positions in [`cores()`][Self::cores]. The diagonal holds the throughput
/// of a processor running alone.
#[derive(Clone, Debug, PartialEq)]
pub struct PairMatrix {
    cores: Vec<ProcessorId>,
    // Row-major, size * size. Cells below the diagonal stay undefined.
    cells: Vec<Throughput>,
}

impl PairMatrix {
    /// Creates a matrix over `cores`, computing each upper-triangle cell with `cell(row, column)`.
    #[must_use]
    pub fn from_fn(
        cores: Vec<ProcessorId>,
        mut cell: impl FnMut(usize, usize) -> Throughput,
    ) -> Self {
        let size = cores.len();

        let cells = (0..size)
            .cartesian_product(0..size)
            .map(|(row, column)| {
                if row <= column {
                    cell(row, column)
                } else {
                    Throughput::Undefined
                }
            })
            .collect();

        Self { cores, cells }
    }

    pub(crate) fn empty(cores: Vec<ProcessorId>) -> Self {
        Self::from_fn(cores, |_, _| Throughput::Undefined)
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, value: Throughput) {
        debug_assert!(row <= column, "only the upper triangle is stored");

        if let Some(cell) = self.index(row, column).and_then(|i| self.cells.get_mut(i)) {
            *cell = value;
        }
    }

    /// The processors, in row/column order.
    #[must_use]
    pub fn cores(&self) -> &[ProcessorId] {
        &self.cores
    }

    /// Number of rows (and columns).
    #[must_use]
    pub fn size(&self) -> usize {
        self.cores.len()
    }

    /// The cell at `row`, `column`. `None` below the diagonal or out of range.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<Throughput> {
        if row > column {
            return None;
        }

        self.index(row, column)
            .and_then(|i| self.cells.get(i))
            .copied()
    }

    fn index(&self, row: usize, column: usize) -> Option<usize> {
        let size = self.size();

        if row >= size || column >= size {
            return None;
        }

        row.checked_mul(size)?.checked_add(column)
    }

    fn upper_cells(&self) -> impl Iterator<Item = (usize, usize, Throughput)> + '_ {
        let size = self.size();

        (0..size)
            .flat_map(move |row| (row..size).map(move |column| (row, column)))
            .filter_map(|(row, column)| Some((row, column, self.get(row, column)?)))
    }

    /// The largest defined cell.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        max_defined(self.upper_cells().map(|(_, _, value)| value))
    }

    /// Every cell as a percentage of the largest cell of the whole matrix.
    #[must_use]
    pub fn to_percent_of_max(&self) -> Self {
        let max = self.max();

        Self::from_fn(self.cores.clone(), |row, column| {
            percent_of(
                self.get(row, column).unwrap_or(Throughput::Undefined),
                max,
            )
        })
    }

    /// For every row, the smallest defined off-diagonal cell involving that row's processor,
    /// looking both along the row and down the column.
    #[must_use]
    pub fn row_minimums(&self) -> Vec<Option<f64>> {
        (0..self.size()).map(|i| self.row_minimum(i)).collect()
    }

    fn row_minimum(&self, i: usize) -> Option<f64> {
        (0..self.size())
            .filter(|&j| j != i)
            .filter_map(|j| self.get(i.min(j), i.max(j)))
            .filter_map(Throughput::value)
            .reduce(f64::min)
    }

    /// Whether the cell is off the diagonal and equal to the minimum of its row.
    #[must_use]
    pub fn is_row_minimum(&self, row: usize, column: usize) -> bool {
        if row == column {
            return false;
        }

        match (
            self.get(row, column).and_then(Throughput::value),
            self.row_minimum(row),
        ) {
            (Some(value), Some(min)) => value <= min,
            _ => false,
        }
    }

    /// Pairs of processors that are probably hyperthreading siblings.
    ///
    /// A pair qualifies if its paired throughput is the minimum of both processors' rows and
    /// clearly below what the two achieve alone.
    #[must_use]
    pub fn likely_siblings(&self) -> Vec<(ProcessorId, ProcessorId)> {
        let minimums = self.row_minimums();

        let solo = |i: usize| self.get(i, i).and_then(Throughput::value);

        self.upper_cells()
            .filter(|&(row, column, _)| row != column)
            .filter_map(|(row, column, value)| {
                let value = value.value()?;

                let mutual_minimum = [row, column].iter().all(|i| {
                    minimums
                        .get(*i)
                        .copied()
                        .flatten()
                        .is_some_and(|min| value <= min)
                });

                let solo_mean = (solo(row)? + solo(column)?) / 2.0;

                if mutual_minimum && value < solo_mean * SIBLING_THRESHOLD {
                    Some((*self.cores.get(row)?, *self.cores.get(column)?))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// One throughput value per processor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreVector {
    entries: Vec<(ProcessorId, Throughput)>,
}

impl CoreVector {
    /// Creates a vector from `(processor, throughput)` entries.
    #[must_use]
    pub fn new(entries: Vec<(ProcessorId, Throughput)>) -> Self {
        Self { entries }
    }

    /// The entries, in participant order.
    #[must_use]
    pub fn entries(&self) -> &[(ProcessorId, Throughput)] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vector has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Throughput of `core`, if present.
    #[must_use]
    pub fn get(&self, core: ProcessorId) -> Option<Throughput> {
        self.entries
            .iter()
            .find(|(c, _)| *c == core)
            .map(|(_, value)| *value)
    }

    /// The largest defined value.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        max_defined(self.entries.iter().map(|(_, value)| *value))
    }

    /// Every value as a percentage of the largest value.
    #[must_use]
    pub fn to_percent_of_max(&self) -> Self {
        let max = self.max();

        Self {
            entries: self
                .entries
                .iter()
                .map(|&(core, value)| (core, percent_of(value, max)))
                .collect(),
        }
    }
}
