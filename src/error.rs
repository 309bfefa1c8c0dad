//! Engine error kinds.
//!
//! Two families exist. *Fatal* errors abort the operation that raised them:
//! out-of-range probabilities, out-of-bounds cells, infeasible fixed-cell
//! configurations, malformed puzzle declarations. *Recoverable* errors mean a
//! rule referenced something the store does not relate — the engine treats the
//! rule as "no applicable constraint", skips it, and continues
//! (see [`EngineError::is_recoverable`]).
//!
//! Non-convergence is deliberately not an error: iterative fits that stop at
//! their iteration cap still return a usable matrix, reported through
//! [`crate::normalize::Convergence`] and a `warn!`.

use alloc::string::String;
use core::fmt;

use thiserror::Error;

use crate::category::Item;

/// Convenience alias for engine results.
pub type Result<T> = core::result::Result<T, EngineError>;

/// Matrix axis named by feasibility errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// A matrix row.
    Row,
    /// A matrix column.
    Column,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => f.write_str("row"),
            Axis::Column => f.write_str("column"),
        }
    }
}

/// Everything that can go wrong inside the constraint engine.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    /// A probability outside `[0, 1]` was supplied to a cell update or a
    /// fixed-cell pin.
    #[error("probability {value} outside [0, 1]")]
    InvalidProbability {
        /// The offending value.
        value: f64,
    },

    /// Fixed cells in one row or column sum above 1, so no stochastic
    /// completion exists. Raised before any fitting iteration runs.
    #[error("fixed cells in {axis} {index} sum to {sum}, exceeding 1")]
    ConstraintInfeasible {
        /// Which axis is over-committed.
        axis: Axis,
        /// Index of the row or column.
        index: usize,
        /// The offending fixed-cell sum.
        sum: f64,
    },

    /// A cell coordinate outside the matrix shape.
    #[error("cell ({row}, {col}) outside a {rows}x{cols} matrix")]
    CellOutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Matrix row count.
        rows: usize,
        /// Matrix column count.
        cols: usize,
    },

    /// Row-major data of the wrong length for the declared shape.
    #[error("{len} cells cannot fill a {rows}x{cols} matrix")]
    ShapeMismatch {
        /// Declared row count.
        rows: usize,
        /// Declared column count.
        cols: usize,
        /// Supplied data length.
        len: usize,
    },

    /// No matrix relates the two categories. Recoverable: the rule that
    /// needed the relation is skipped.
    #[error("no matrix relates categories '{0}' and '{1}'")]
    MissingRelation(String, String),

    /// A rule referenced a category name the store does not declare.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// A rule referenced an item absent from the category it named.
    #[error("item '{item}' not found in category '{category}'")]
    UnknownItem {
        /// The missing item.
        item: Item,
        /// The category searched.
        category: String,
    },

    /// An order or difference rule referenced an item that no category other
    /// than the anchor contains, so its matrix cannot be located.
    #[error("item '{0}' does not belong to any category besides the anchor")]
    NoHomeCategory(Item),

    /// An exact-difference rule anchored on a category with textual items.
    #[error("category '{0}' is not numeric; exact-difference rules need numeric items")]
    NonNumericCategory(String),

    /// Two categories share a name in the same store.
    #[error("duplicate category '{0}'")]
    DuplicateCategory(String),

    /// An item appears twice within one category.
    #[error("duplicate item '{item}' in category '{category}'")]
    DuplicateItem {
        /// The repeated item.
        item: Item,
        /// The category declaring it twice.
        category: String,
    },

    /// A category was declared with no items.
    #[error("category '{0}' has no items")]
    EmptyCategory(String),
}

impl EngineError {
    /// `true` for errors that mean "this rule has no applicable constraint
    /// here" — the engine logs and skips the rule instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::MissingRelation(_, _)
                | EngineError::UnknownCategory(_)
                | EngineError::UnknownItem { .. }
                | EngineError::NoHomeCategory(_)
                | EngineError::NonNumericCategory(_)
        )
    }
}
