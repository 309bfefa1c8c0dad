//! Normalization — restoring the doubly stochastic invariant.
//!
//! Two interchangeable strategies:
//!
//! - [`Sinkhorn`]: plain iterative row/column rescaling. Used after rule
//!   application and single-cell edits; it does not preserve any individual
//!   cell value.
//! - [`FixedCellFit`]: iterative proportional fitting around externally
//!   pinned cells. Pins survive the fit bit-for-bit; only non-fixed cells
//!   are rescaled.
//!
//! Both are bounded by `max_iterations`, so normalization always terminates.
//! Non-convergence is not an error: the result is still returned, flagged
//! through [`Convergence`] and a `warn!`.
//!
//! # Invariants
//!
//! - After a converged projection, every row sum and every column sum is
//!   within `tolerance` of 1.0 (square matrices with a feasible doubly
//!   stochastic completion).
//! - Non-negativity is preserved: scaling factors are non-negative.
//! - Matrix shapes never change.

use log::warn;

use crate::error::{Axis, EngineError, Result};
use crate::store::{MatrixStore, ProbabilityMatrix};

/// Row/column sums below this are treated as zero and left unscaled.
const ZERO_SUM_GUARD: f64 = 1e-12;

// ─── Convergence ────────────────────────────────────────────────────────────

/// Outcome report of an iterative normalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence {
    /// Whether the target criterion was met within `max_iterations`.
    ///
    /// For [`Sinkhorn`] this is the cell-change criterion; for
    /// [`FixedCellFit`] it is the post-fit marginal check. A `false` here is
    /// the recoverable non-convergence signal — the matrix is still usable.
    pub converged: bool,
    /// Iterations performed.
    pub iterations: u32,
    /// Deviation remaining when iteration stopped: the final maximum
    /// absolute cell change for [`Sinkhorn`], the worst row/column sum
    /// deviation from 1.0 for [`FixedCellFit`].
    pub residual: f64,
}

impl Convergence {
    /// The identity for [`Convergence::merge`]: converged, zero work.
    pub fn trivial() -> Self {
        Self {
            converged: true,
            iterations: 0,
            residual: 0.0,
        }
    }

    /// Combine reports from independent matrices: converged only if all
    /// converged, worst residual, most iterations.
    pub fn merge(self, other: Convergence) -> Convergence {
        Convergence {
            converged: self.converged && other.converged,
            iterations: self.iterations.max(other.iterations),
            residual: self.residual.max(other.residual),
        }
    }
}

// ─── Sinkhorn ───────────────────────────────────────────────────────────────

/// Simple iterative row/column rescaling toward a doubly stochastic matrix
/// (Sinkhorn–Knopp).
///
/// Each pass divides every row by its row sum, then every column by its
/// column sum; iteration stops early once the largest absolute cell change
/// between successive passes drops below `tolerance`. Rows or columns
/// summing to zero are left untouched.
#[derive(Clone, Copy, Debug)]
pub struct Sinkhorn {
    /// Early-stop threshold on the max absolute cell change (default 1e-6).
    pub tolerance: f64,
    /// Iteration cap (default 100).
    pub max_iterations: u32,
}

impl Default for Sinkhorn {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

impl Sinkhorn {
    /// A projector with explicit tolerance and iteration cap.
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Rescale one matrix in place.
    pub fn project(&self, m: &mut ProbabilityMatrix) -> Convergence {
        let mut residual = f64::INFINITY;
        for iter in 0..self.max_iterations {
            let prev = m.clone();

            for r in 0..m.rows() {
                let s = m.row_sum(r);
                if s > ZERO_SUM_GUARD {
                    let inv = 1.0 / s;
                    for c in 0..m.cols() {
                        m.set(r, c, m.get(r, c) * inv);
                    }
                }
            }

            for c in 0..m.cols() {
                let s = m.col_sum(c);
                if s > ZERO_SUM_GUARD {
                    let inv = 1.0 / s;
                    for r in 0..m.rows() {
                        m.set(r, c, m.get(r, c) * inv);
                    }
                }
            }

            residual = m.max_delta(&prev);
            if residual < self.tolerance {
                return Convergence {
                    converged: true,
                    iterations: iter + 1,
                    residual,
                };
            }
        }

        warn!(
            "sinkhorn projection stopped at {} iterations with residual {residual}",
            self.max_iterations
        );
        Convergence {
            converged: false,
            iterations: self.max_iterations,
            residual,
        }
    }

    /// Rescale every matrix in the store; reports the worst case.
    pub fn project_store(&self, store: &mut MatrixStore) -> Convergence {
        store
            .matrices_mut()
            .map(|m| self.project(m))
            .fold(Convergence::trivial(), Convergence::merge)
    }

    /// Set one cell of the `(cat_a, cat_b)`-oriented matrix, then rescale
    /// that matrix.
    ///
    /// Fails with [`EngineError::InvalidProbability`] for values outside
    /// `[0, 1]` before anything is written. The edited value itself is not
    /// preserved by the rescale — use [`FixedCellFit`] to pin cells.
    pub fn update_cell(
        &self,
        store: &mut MatrixStore,
        cat_a: &str,
        cat_b: &str,
        row: usize,
        col: usize,
        value: f64,
    ) -> Result<Convergence> {
        store.set_cell(cat_a, cat_b, row, col, value)?;
        let a = store.category_index(cat_a)?;
        let b = store.category_index(cat_b)?;
        Ok(self.project(store.matrix_mut(a, b)?))
    }
}

// ─── FixedCellFit ───────────────────────────────────────────────────────────

/// A cell pinned for the duration of one [`FixedCellFit::fit`] call.
///
/// Pins are not puzzle-wide state; callers re-declare them on every fit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedCell {
    /// Row coordinate.
    pub row: usize,
    /// Column coordinate.
    pub col: usize,
    /// Pinned probability in `[0, 1]`.
    pub value: f64,
}

impl FixedCell {
    /// Shorthand constructor.
    pub fn new(row: usize, col: usize, value: f64) -> Self {
        Self { row, col, value }
    }
}

/// Fixed-cell-aware iterative proportional fitting.
///
/// Writes every pin, verifies feasibility (no row or column of pins may sum
/// above 1), then alternately rescales the non-fixed cells of each row and
/// column so the full marginals approach 1. Rows or columns whose pins
/// already sum to 1 have their non-fixed cells zeroed.
#[derive(Clone, Copy, Debug)]
pub struct FixedCellFit {
    /// Convergence threshold for cell changes and the marginal check
    /// (default 1e-6).
    pub tolerance: f64,
    /// Iteration cap (default 100).
    pub max_iterations: u32,
}

impl Default for FixedCellFit {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

impl FixedCellFit {
    /// A fitter with explicit tolerance and iteration cap.
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Fit `m` around the pinned `cells`, in place.
    ///
    /// Fatal errors ([`EngineError::InvalidProbability`],
    /// [`EngineError::CellOutOfBounds`], [`EngineError::ConstraintInfeasible`])
    /// are raised before the first iteration runs. A fit that stops at the
    /// iteration cap with marginals still off is *not* an error: the matrix
    /// is returned as-is with `converged: false` and a `warn!`.
    pub fn fit(&self, m: &mut ProbabilityMatrix, cells: &[FixedCell]) -> Result<Convergence> {
        let (rows, cols) = (m.rows(), m.cols());

        let mut fixed = alloc::vec![false; rows * cols];
        for cell in cells {
            if cell.row >= rows || cell.col >= cols {
                return Err(EngineError::CellOutOfBounds {
                    row: cell.row,
                    col: cell.col,
                    rows,
                    cols,
                });
            }
            if !(0.0..=1.0).contains(&cell.value) {
                return Err(EngineError::InvalidProbability { value: cell.value });
            }
        }
        for cell in cells {
            m.set(cell.row, cell.col, cell.value);
            fixed[cell.row * cols + cell.col] = true;
        }

        // Fixed-cell marginals, checked for feasibility up front.
        let mut fixed_row_sums = alloc::vec![0.0_f64; rows];
        let mut fixed_col_sums = alloc::vec![0.0_f64; cols];
        for r in 0..rows {
            for c in 0..cols {
                if fixed[r * cols + c] {
                    fixed_row_sums[r] += m.get(r, c);
                    fixed_col_sums[c] += m.get(r, c);
                }
            }
        }
        for (r, &s) in fixed_row_sums.iter().enumerate() {
            if s > 1.0 + self.tolerance {
                return Err(EngineError::ConstraintInfeasible {
                    axis: Axis::Row,
                    index: r,
                    sum: s,
                });
            }
        }
        for (c, &s) in fixed_col_sums.iter().enumerate() {
            if s > 1.0 + self.tolerance {
                return Err(EngineError::ConstraintInfeasible {
                    axis: Axis::Column,
                    index: c,
                    sum: s,
                });
            }
        }

        let mut iterations = 0;
        for iter in 0..self.max_iterations {
            let prev = m.clone();

            for r in 0..rows {
                self.rescale_line(m, &fixed, fixed_row_sums[r], Line::Row(r));
            }
            for c in 0..cols {
                self.rescale_line(m, &fixed, fixed_col_sums[c], Line::Col(c));
            }

            iterations = iter + 1;
            if m.max_delta(&prev) < self.tolerance {
                break;
            }
        }

        // Post-fit marginal check. Some pin configurations only converge
        // approximately; that is reported, not raised.
        let mut worst = 0.0_f64;
        for r in 0..rows {
            worst = worst.max((m.row_sum(r) - 1.0).abs());
        }
        for c in 0..cols {
            worst = worst.max((m.col_sum(c) - 1.0).abs());
        }
        let converged = worst <= self.tolerance;
        if !converged {
            warn!("fixed-cell fit left marginals off by {worst} after {iterations} iterations");
        }
        Ok(Convergence {
            converged,
            iterations,
            residual: worst,
        })
    }

    /// Rescale the non-fixed cells of one row or column so the line sums
    /// to 1 alongside its pins. A line whose pins already sum to 1 has its
    /// non-fixed cells zeroed; a line whose non-fixed cells sum to zero is
    /// left alone.
    fn rescale_line(
        &self,
        m: &mut ProbabilityMatrix,
        fixed: &[bool],
        fixed_sum: f64,
        line: Line,
    ) {
        let cols = m.cols();
        let len = match line {
            Line::Row(_) => cols,
            Line::Col(_) => m.rows(),
        };
        let coords = |i: usize| match line {
            Line::Row(r) => (r, i),
            Line::Col(c) => (i, c),
        };

        if (fixed_sum - 1.0).abs() <= self.tolerance {
            for i in 0..len {
                let (r, c) = coords(i);
                if !fixed[r * cols + c] {
                    m.set(r, c, 0.0);
                }
            }
            return;
        }

        let free_sum: f64 = (0..len)
            .map(|i| {
                let (r, c) = coords(i);
                if fixed[r * cols + c] {
                    0.0
                } else {
                    m.get(r, c)
                }
            })
            .sum();
        if free_sum <= ZERO_SUM_GUARD {
            return;
        }

        let scale = (1.0 - fixed_sum) / free_sum;
        for i in 0..len {
            let (r, c) = coords(i);
            if !fixed[r * cols + c] {
                m.set(r, c, m.get(r, c) * scale);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Line {
    Row(usize),
    Col(usize),
}

// ─── Tests ──────────────────────────────────────────────────────────────────
