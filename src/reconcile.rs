//! Cross-matrix consistency over category triples.
//!
//! Pairwise matrices evolve independently under rule application, so the
//! beliefs `A↔B`, `A↔C`, `B↔C` can drift apart. For every category triple
//! `A<B<C` and every item combination, the geometric mean
//! `cbrt(p_AB · p_AC · p_BC)` estimates how jointly plausible the
//! combination is. Every cell touched by any triple is replaced by the
//! arithmetic mean of all estimates contributed for it — across *all*
//! triples sharing the cell, which pulls the whole store toward one global
//! belief state without materializing a joint tensor.
//!
//! Triples missing any of their three pairwise matrices are skipped.
//! Dimensions are never altered.

use hashbrown::HashMap;

use crate::store::MatrixStore;

/// Enforces approximate agreement across every triple of categories.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reconciler;

impl Reconciler {
    /// A reconciler. Stateless; exists for parity with the other operators.
    pub fn new() -> Self {
        Self
    }

    /// Blend every stored matrix toward triple-consistency, in place.
    pub fn reconcile(&self, store: &mut MatrixStore) {
        let n = store.category_count();
        // (canonical pair, row, col) -> running mean state.
        let mut estimates: HashMap<((usize, usize), usize, usize), (f64, u32)> = HashMap::new();

        for a in 0..n {
            for b in a + 1..n {
                for c in b + 1..n {
                    if !(store.relation_exists(a, b)
                        && store.relation_exists(a, c)
                        && store.relation_exists(b, c))
                    {
                        continue;
                    }
                    let (la, lb, lc) = (
                        store.categories()[a].len(),
                        store.categories()[b].len(),
                        store.categories()[c].len(),
                    );
                    for i in 0..la {
                        for j in 0..lb {
                            for k in 0..lc {
                                let joint = store.cell(a, b, i, j)
                                    * store.cell(a, c, i, k)
                                    * store.cell(b, c, j, k);
                                let estimate = cbrt(joint);
                                accumulate(&mut estimates, ((a, b), i, j), estimate);
                                accumulate(&mut estimates, ((a, c), i, k), estimate);
                                accumulate(&mut estimates, ((b, c), j, k), estimate);
                            }
                        }
                    }
                }
            }
        }

        for (((a, b), row, col), (sum, count)) in estimates {
            store.set_by_index(a, b, row, col, sum / count as f64);
        }
    }
}

fn accumulate(
    estimates: &mut HashMap<((usize, usize), usize, usize), (f64, u32)>,
    key: ((usize, usize), usize, usize),
    estimate: f64,
) {
    let entry = estimates.entry(key).or_insert((0.0, 0));
    entry.0 += estimate;
    entry.1 += 1;
}

/// no_std cube root via Newton–Raphson, for probability products in `[0, 1]`.
///
/// Quadratic convergence once near the root; the geometric shrink from the
/// seed covers the tiny-product range (down to `1e-18` for three floored
/// probabilities) well inside the iteration cap.
fn cbrt(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let mut y = if x > 0.125 { x } else { 0.5 };
    for _ in 0..96 {
        let next = (2.0 * y + x / (y * y)) / 3.0;
        if (next - y).abs() < 1e-15 {
            return next;
        }
        y = next;
    }
    y
}

// ─── Tests ──────────────────────────────────────────────────────────────────
