//! Serializable snapshot of a matrix store.
//!
//! Captures every category and every pairwise matrix as plain records so an
//! outer layer (display, persistence, an LLM orchestration loop) can carry
//! the belief state across a process boundary. No binary format is defined
//! here — the records serialize with whatever serde format the caller
//! chooses.
//!
//! Requires the `serde` feature.

use alloc::string::String;
use alloc::vec::Vec;

use crate::category::Item;
use crate::store::MatrixStore;

/// Snapshot schema version for forward compatibility.
pub const SNAPSHOT_VERSION: u16 = 1;

/// A full, serializable dump of a [`MatrixStore`].
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct StoreSnapshot {
    /// Schema version — always [`SNAPSHOT_VERSION`] for new snapshots.
    pub version: u16,
    /// All categories in declaration order.
    pub categories: Vec<CategoryRecord>,
    /// One record per stored matrix, in canonical orientation.
    pub matrices: Vec<MatrixRecord>,
}

/// Serializable category declaration.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct CategoryRecord {
    /// Category name.
    pub name: String,
    /// Ordered items.
    pub items: Vec<Item>,
}

/// One pairwise matrix with its axis names and row-major cells.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct MatrixRecord {
    /// Category on the row axis (canonical orientation).
    pub row_category: String,
    /// Category on the column axis.
    pub col_category: String,
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub cols: usize,
    /// Cells in row-major order.
    pub cells: Vec<f64>,
}

impl StoreSnapshot {
    /// Capture the current state of `store`.
    pub fn from_store(store: &MatrixStore) -> Self {
        let categories = store
            .categories()
            .iter()
            .map(|cat| CategoryRecord {
                name: String::from(cat.name()),
                items: cat.items().to_vec(),
            })
            .collect();

        let mut matrices = Vec::new();
        for (row_name, col_name) in store.pairs() {
            let Ok(view) = store.view(row_name, col_name) else {
                continue;
            };
            let mut cells = Vec::with_capacity(view.rows() * view.cols());
            for r in 0..view.rows() {
                for c in 0..view.cols() {
                    cells.push(view.get(r, c));
                }
            }
            matrices.push(MatrixRecord {
                row_category: String::from(row_name),
                col_category: String::from(col_name),
                rows: view.rows(),
                cols: view.cols(),
                cells,
            });
        }

        Self {
            version: SNAPSHOT_VERSION,
            categories,
            matrices,
        }
    }

    /// Number of matrix records.
    pub fn matrix_count(&self) -> usize {
        self.matrices.len()
    }

    /// Find the record relating two categories, in either name order.
    pub fn find_matrix(&self, cat_a: &str, cat_b: &str) -> Option<&MatrixRecord> {
        self.matrices.iter().find(|m| {
            (m.row_category == cat_a && m.col_category == cat_b)
                || (m.row_category == cat_b && m.col_category == cat_a)
        })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
