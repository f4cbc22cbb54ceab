use std::cell::RefCell;
use std::io::{self, Write};

use itertools::Itertools;
use phased_bench::{CoreVector, PairMatrix, Reporter, Throughput};

const CELL_WIDTH: usize = 12;

/// Writes probe progress and results as text tables.
///
/// Matrix cells on the diagonal (a processor running alone) are marked with `*`, the smallest
/// off-diagonal cell of a row with `<`. In per-core tables, the slower half of the processors is
/// marked with `<`.
///
/// Write errors do not interrupt the probe; the first one is returned by
/// [`into_inner()`][Self::into_inner].
#[derive(Debug)]
pub struct ConsoleReporter<W: Write> {
    out: RefCell<W>,
    failure: RefCell<Option<io::Error>>,
}

impl<W: Write> ConsoleReporter<W> {
    /// Creates a reporter writing to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            failure: RefCell::new(None),
        }
    }

    /// Returns the writer, or the first write error.
    ///
    /// # Errors
    ///
    /// Returns the first error any write produced.
    pub fn into_inner(self) -> io::Result<W> {
        match self.failure.into_inner() {
            Some(e) => Err(e),
            None => Ok(self.out.into_inner()),
        }
    }

    fn write(&self, f: impl FnOnce(&mut W) -> io::Result<()>) {
        if self.failure.borrow().is_some() {
            return;
        }

        let mut out = self.out.borrow_mut();

        if let Err(e) = f(&mut out).and_then(|()| out.flush()) {
            *self.failure.borrow_mut() = Some(e);
        }
    }

    fn write_matrix(out: &mut W, matrix: &PairMatrix, percent: bool) -> io::Result<()> {
        write!(out, "    | ")?;

        for core in matrix.cores() {
            write!(out, "{core:>CELL_WIDTH$}  | ")?;
        }

        writeln!(out)?;

        for (row, core) in matrix.cores().iter().enumerate() {
            write!(out, "{core:>3} | ")?;

            for column in 0..matrix.size() {
                let Some(value) = matrix.get(row, column) else {
                    write!(out, "{:>CELL_WIDTH$}  | ", "")?;
                    continue;
                };

                let marker = if row == column {
                    '*'
                } else if matrix.is_row_minimum(row, column) {
                    '<'
                } else {
                    ' '
                };

                write!(out, "{:>CELL_WIDTH$}{marker} | ", format_value(value, percent))?;
            }

            writeln!(out)?;
        }

        Ok(())
    }
}

fn format_value(value: Throughput, percent: bool) -> String {
    match value.value() {
        Some(value) if percent => format!("{value:.1}%"),
        _ => value.to_string(),
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn probe_started(&self, name: &str) {
        self.write(|out| {
            writeln!(out)?;
            writeln!(out, "Start {name} probe...")
        });
    }

    fn initializing(&self) {
        self.write(|out| writeln!(out, "Initializing..."));
    }

    fn progress_started(&self, total: usize) {
        self.write(|out| write!(out, "Measuring {total} cycle(s) "));
    }

    fn progress_tick(&self) {
        self.write(|out| write!(out, "."));
    }

    fn progress_completed(&self) {
        self.write(|out| writeln!(out, " done."));
    }

    fn matrix(&self, matrix: &PairMatrix) {
        self.write(|out| {
            writeln!(out)?;
            writeln!(out, "Operations per millisecond, by pair:")?;
            Self::write_matrix(out, matrix, false)?;

            writeln!(out)?;
            writeln!(out, "Percent of best pair:")?;
            Self::write_matrix(out, &matrix.to_percent_of_max(), true)?;

            let siblings = matrix.likely_siblings();

            writeln!(out)?;

            if siblings.is_empty() {
                writeln!(out, "No likely hyperthreading siblings.")
            } else {
                writeln!(
                    out,
                    "Likely hyperthreading siblings: {}",
                    siblings
                        .iter()
                        .map(|(a, b)| format!("{a}+{b}"))
                        .join(", ")
                )
            }
        });
    }

    fn vector(&self, vector: &CoreVector) {
        let percent = vector.to_percent_of_max();

        // The slower half is marked, ties resolved by position.
        let slower_half = vector
            .entries()
            .iter()
            .enumerate()
            .sorted_by(|(_, (_, a)), (_, (_, b))| {
                a.value()
                    .unwrap_or(f64::NEG_INFINITY)
                    .total_cmp(&b.value().unwrap_or(f64::NEG_INFINITY))
            })
            .take(vector.len() / 2)
            .map(|(index, _)| index)
            .collect_vec();

        self.write(|out| {
            writeln!(out)?;
            writeln!(out, "core | {:>CELL_WIDTH$} | {:>8}", "ops/ms", "percent")?;

            for (index, ((core, value), (_, percent))) in vector
                .entries()
                .iter()
                .zip(percent.entries())
                .enumerate()
            {
                let marker = if slower_half.contains(&index) { '<' } else { ' ' };

                writeln!(
                    out,
                    "{core:>4} | {:>CELL_WIDTH$} | {:>8}{marker}",
                    format_value(*value, false),
                    format_value(*percent, true)
                )?;
            }

            Ok(())
        });
    }

    fn probe_completed(&self) {
        self.write(|out| writeln!(out, "Done."));
    }
}
