//! Pairwise probability matrices and the store that owns them.
//!
//! One [`ProbabilityMatrix`] exists per unordered pair of categories. The
//! canonical orientation is fixed at declaration: the first-declared category
//! of a pair is the row axis. [`MatrixStore`] is the single authority on
//! orientation — reads go through [`MatrixView`] (a transpose-aware view that
//! never copies the backing data), and every mutation path resolves the
//! canonical key before indexing, so no other component re-implements the
//! transpose-or-lookup branch.
//!
//! # Invariants
//!
//! - Matrix shapes are fixed at store creation and never change.
//! - Cell values stay in `[0, 1]`; rows and columns approach sum 1 after
//!   normalization (see [`crate::normalize`]).
//! - The store is exclusively owned by one solver session; parallel
//!   exploration works on `Clone`s.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::category::{Category, Item};
use crate::error::{EngineError, Result};

// ─── ProbabilityMatrix ──────────────────────────────────────────────────────

/// A row-major matrix of pairing probabilities between two categories.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl ProbabilityMatrix {
    /// A matrix with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// The uniform prior for a fresh category pair: every cell
    /// `1 / max(rows, cols)`.
    pub fn uniform(rows: usize, cols: usize) -> Self {
        let n = rows.max(cols).max(1);
        Self::filled(rows, cols, 1.0 / n as f64)
    }

    /// Build a matrix from row-major data. Fails when the data length does
    /// not match `rows * cols`.
    pub fn from_data(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(EngineError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Row count.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell value. Panics on out-of-bounds coordinates.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    /// Set a cell. Panics on out-of-bounds coordinates.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    /// Sum of one row.
    pub fn row_sum(&self, row: usize) -> f64 {
        self.data[row * self.cols..(row + 1) * self.cols].iter().sum()
    }

    /// Sum of one column.
    pub fn col_sum(&self, col: usize) -> f64 {
        (0..self.rows).map(|r| self.get(r, col)).sum()
    }

    /// The backing cells in row-major order.
    pub fn cells(&self) -> &[f64] {
        &self.data
    }

    /// Largest absolute cell difference against `other`.
    ///
    /// Both matrices must share a shape; used as the convergence criterion
    /// of the iterative normalizers.
    pub fn max_delta(&self, other: &ProbabilityMatrix) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max)
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

// ─── MatrixView ─────────────────────────────────────────────────────────────

/// Read-only view of a matrix in a requested orientation.
///
/// When the requested row category is not the canonical row axis, the view
/// transposes indices on access instead of copying the backing array.
/// Mutation never goes through a view — use the store's cell setters, which
/// resolve the canonical orientation themselves.
#[derive(Clone, Copy, Debug)]
pub struct MatrixView<'a> {
    matrix: &'a ProbabilityMatrix,
    transposed: bool,
}

impl<'a> MatrixView<'a> {
    /// Rows in the requested orientation.
    pub fn rows(&self) -> usize {
        if self.transposed {
            self.matrix.cols
        } else {
            self.matrix.rows
        }
    }

    /// Columns in the requested orientation.
    pub fn cols(&self) -> usize {
        if self.transposed {
            self.matrix.rows
        } else {
            self.matrix.cols
        }
    }

    /// Cell value in the requested orientation.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if self.transposed {
            self.matrix.get(col, row)
        } else {
            self.matrix.get(row, col)
        }
    }

    /// `true` when this view swaps indices relative to canonical storage.
    pub fn is_transposed(&self) -> bool {
        self.transposed
    }
}

// ─── MatrixStore ────────────────────────────────────────────────────────────

/// Owner of all pairwise probability matrices for one puzzle session.
#[derive(Clone, Debug)]
pub struct MatrixStore {
    categories: Vec<Category>,
    by_name: HashMap<String, usize>,
    matrices: HashMap<(usize, usize), ProbabilityMatrix>,
}

impl MatrixStore {
    /// Build a store from ordered `(name, items)` declarations, one uniform
    /// matrix per unordered category pair.
    ///
    /// Rejects duplicate category names, duplicate items within a category,
    /// and empty item lists.
    pub fn new(declarations: Vec<(String, Vec<Item>)>) -> Result<Self> {
        let mut categories = Vec::with_capacity(declarations.len());
        let mut by_name = HashMap::new();
        for (name, items) in declarations {
            if by_name.contains_key(&name) {
                return Err(EngineError::DuplicateCategory(name));
            }
            by_name.insert(name.clone(), categories.len());
            categories.push(Category::new(name, items)?);
        }

        let mut matrices = HashMap::new();
        for a in 0..categories.len() {
            for b in a + 1..categories.len() {
                matrices.insert(
                    (a, b),
                    ProbabilityMatrix::uniform(categories[a].len(), categories[b].len()),
                );
            }
        }

        Ok(Self {
            categories,
            by_name,
            matrices,
        })
    }

    // ── Category lookup ────────────────────────────────────────────────────

    /// Number of declared categories.
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// All categories in declaration order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.by_name.get(name).map(|&i| &self.categories[i])
    }

    /// Declaration index of a named category.
    pub fn category_index(&self, name: &str) -> Result<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownCategory(name.to_string()))
    }

    /// First declared category other than `exclude` that contains `item`.
    ///
    /// Rules name items like "Ece Suss" without saying which category owns
    /// them; this scan mirrors how clues are written.
    pub fn category_of_item(&self, item: &Item, exclude: usize) -> Option<usize> {
        self.categories
            .iter()
            .enumerate()
            .find(|(i, cat)| *i != exclude && cat.contains(item))
            .map(|(i, _)| i)
    }

    // ── Oriented access ────────────────────────────────────────────────────

    /// View the matrix for `(cat_a, cat_b)` with `cat_a` as the row axis.
    ///
    /// Fails with [`EngineError::UnknownCategory`] for undeclared names and
    /// [`EngineError::MissingRelation`] when no matrix exists for the pair.
    pub fn view(&self, cat_a: &str, cat_b: &str) -> Result<MatrixView<'_>> {
        let a = self.category_index(cat_a)?;
        let b = self.category_index(cat_b)?;
        let matrix = self
            .matrices
            .get(&canonical(a, b))
            .ok_or_else(|| self.missing(a, b))?;
        Ok(MatrixView {
            matrix,
            transposed: a > b,
        })
    }

    /// Lazily enumerate all related category pairs as `(row_name, col_name)`
    /// in canonical orientation and declaration order. Restartable: each call
    /// produces a fresh iterator.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        let n = self.categories.len();
        (0..n)
            .flat_map(move |a| (a + 1..n).map(move |b| (a, b)))
            .filter(move |key| self.matrices.contains_key(key))
            .map(move |(a, b)| (self.categories[a].name(), self.categories[b].name()))
    }

    /// Set one cell of the `(cat_a, cat_b)`-oriented matrix, resolving the
    /// canonical orientation first.
    ///
    /// `value` must lie in `[0, 1]`; coordinates are bounds-checked in the
    /// requested orientation.
    pub fn set_cell(
        &mut self,
        cat_a: &str,
        cat_b: &str,
        row: usize,
        col: usize,
        value: f64,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::InvalidProbability { value });
        }
        let a = self.category_index(cat_a)?;
        let b = self.category_index(cat_b)?;
        let (rows, cols) = (self.categories[a].len(), self.categories[b].len());
        if row >= rows || col >= cols {
            return Err(EngineError::CellOutOfBounds {
                row,
                col,
                rows,
                cols,
            });
        }
        self.set_by_index(a, b, row, col, value);
        Ok(())
    }

    // ── Crate-internal oriented primitives ─────────────────────────────────

    /// `true` when a matrix exists for the (unordered) index pair.
    pub(crate) fn relation_exists(&self, a: usize, b: usize) -> bool {
        self.matrices.contains_key(&canonical(a, b))
    }

    pub(crate) fn missing(&self, a: usize, b: usize) -> EngineError {
        EngineError::MissingRelation(
            self.categories[a].name().to_string(),
            self.categories[b].name().to_string(),
        )
    }

    /// Canonical matrix plus a flag telling whether the requested `(a, b)`
    /// orientation swaps indices relative to storage.
    pub(crate) fn oriented_mut(
        &mut self,
        a: usize,
        b: usize,
    ) -> Result<(&mut ProbabilityMatrix, bool)> {
        let err = self.missing(a, b);
        match self.matrices.get_mut(&canonical(a, b)) {
            Some(m) => Ok((m, a > b)),
            None => Err(err),
        }
    }

    /// Oriented read by category indices. Panics if the relation is absent;
    /// callers check [`MatrixStore::relation_exists`] first.
    pub(crate) fn cell(&self, a: usize, b: usize, row: usize, col: usize) -> f64 {
        let m = &self.matrices[&canonical(a, b)];
        if a > b {
            m.get(col, row)
        } else {
            m.get(row, col)
        }
    }

    /// Oriented write by category indices. Panics if the relation is absent.
    pub(crate) fn set_by_index(&mut self, a: usize, b: usize, row: usize, col: usize, value: f64) {
        let key = canonical(a, b);
        let transposed = a > b;
        let m = self.matrices.get_mut(&key).expect("relation exists");
        if transposed {
            m.set(col, row, value);
        } else {
            m.set(row, col, value);
        }
    }

    /// Canonical matrix for an index pair.
    pub(crate) fn matrix_mut(&mut self, a: usize, b: usize) -> Result<&mut ProbabilityMatrix> {
        let err = self.missing(a, b);
        self.matrices.get_mut(&canonical(a, b)).ok_or(err)
    }

    /// All matrices, for whole-store normalization.
    pub(crate) fn matrices_mut(&mut self) -> impl Iterator<Item = &mut ProbabilityMatrix> {
        self.matrices.values_mut()
    }

    /// Drop a relation so tests can exercise missing-matrix paths.
    #[cfg(test)]
    pub(crate) fn remove_relation(&mut self, cat_a: &str, cat_b: &str) {
        let a = self.category_index(cat_a).unwrap();
        let b = self.category_index(cat_b).unwrap();
        self.matrices.remove(&canonical(a, b));
    }
}

fn canonical(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn wine_store() -> MatrixStore {
        MatrixStore::new(vec![
            (
                "Vintage".to_string(),
                vec![Item::from(1984), Item::from(1988), Item::from(1992), Item::from(1996)],
            ),
            (
                "Wine".to_string(),
                vec![
                    Item::from("Annata Branco"),
                    Item::from("Bianca Flaux"),
                    Item::from("Ece Suss"),
                    Item::from("Vendemmia"),
                ],
            ),
            (
                "Type".to_string(),
                vec![
                    Item::from("gewurztraminer"),
                    Item::from("merlot"),
                    Item::from("pinot noir"),
                    Item::from("riesling"),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_uniform_initialization() {
        let store = wine_store();
        let v = store.view("Vintage", "Wine").unwrap();
        assert_eq!(v.rows(), 4);
        assert_eq!(v.cols(), 4);
        for r in 0..4 {
            for c in 0..4 {
                assert!((v.get(r, c) - 0.25).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_one_matrix_per_unordered_pair() {
        let store = wine_store();
        assert_eq!(store.pairs().count(), 3);
        // Restartable
        assert_eq!(store.pairs().count(), 3);
    }

    #[test]
    fn test_transposed_view_reads_same_storage() {
        let mut store = wine_store();
        store.set_cell("Vintage", "Wine", 1, 2, 0.9).unwrap();
        let forward = store.view("Vintage", "Wine").unwrap();
        let backward = store.view("Wine", "Vintage").unwrap();
        assert!(!forward.is_transposed());
        assert!(backward.is_transposed());
        assert!((forward.get(1, 2) - 0.9).abs() < 1e-12);
        assert!((backward.get(2, 1) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_set_cell_resolves_orientation() {
        let mut store = wine_store();
        // Write through the non-canonical orientation.
        store.set_cell("Wine", "Vintage", 3, 0, 0.7).unwrap();
        let v = store.view("Vintage", "Wine").unwrap();
        assert!((v.get(0, 3) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_set_cell_rejects_out_of_range_probability() {
        let mut store = wine_store();
        let err = store.set_cell("Vintage", "Wine", 0, 0, 1.5).unwrap_err();
        assert_eq!(err, EngineError::InvalidProbability { value: 1.5 });
        let err = store.set_cell("Vintage", "Wine", 0, 0, -0.1).unwrap_err();
        assert_eq!(err, EngineError::InvalidProbability { value: -0.1 });
    }

    #[test]
    fn test_set_cell_rejects_out_of_bounds() {
        let mut store = wine_store();
        let err = store.set_cell("Vintage", "Wine", 4, 0, 0.5).unwrap_err();
        assert!(matches!(err, EngineError::CellOutOfBounds { .. }));
    }

    #[test]
    fn test_unknown_category_and_missing_relation() {
        let mut store = wine_store();
        let err = store.view("Vintage", "Color").unwrap_err();
        assert_eq!(err, EngineError::UnknownCategory("Color".to_string()));

        // Drop a relation to exercise the missing-relation path.
        store.matrices.remove(&(0, 1));
        let err = store.view("Vintage", "Wine").unwrap_err();
        assert!(matches!(err, EngineError::MissingRelation(_, _)));
        assert!(err.is_recoverable());
        assert_eq!(store.pairs().count(), 2);
    }

    #[test]
    fn test_category_of_item_scan() {
        let store = wine_store();
        assert_eq!(store.category_of_item(&Item::from("merlot"), 0), Some(2));
        assert_eq!(store.category_of_item(&Item::from(1984), 1), Some(0));
        // Excluded category is skipped even though it contains the item.
        assert_eq!(store.category_of_item(&Item::from(1984), 0), None);
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let err = MatrixStore::new(vec![
            ("A".to_string(), vec![Item::from(1)]),
            ("A".to_string(), vec![Item::from(2)]),
        ])
        .unwrap_err();
        assert_eq!(err, EngineError::DuplicateCategory("A".to_string()));
    }

    #[test]
    fn test_rectangular_pair() {
        let store = MatrixStore::new(vec![
            ("Big".to_string(), vec![Item::from(1), Item::from(2), Item::from(3)]),
            ("Small".to_string(), vec![Item::from("x"), Item::from("y")]),
        ])
        .unwrap();
        let v = store.view("Big", "Small").unwrap();
        assert_eq!((v.rows(), v.cols()), (3, 2));
        // Uniform prior uses the larger dimension.
        assert!((v.get(0, 0) - 1.0 / 3.0).abs() < 1e-12);
    }
}
