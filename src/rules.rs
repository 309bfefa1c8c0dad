//! Typed constraint rules and the engine that applies them.
//!
//! Each rule is one deduced clue, already parsed by the orchestration layer
//! into a closed [`Rule`] variant — adding a rule kind is a compile-checked
//! exhaustiveness change, not a string match. Applying a rule nudges cell
//! probabilities multiplicatively; only [`Rule::DirectAssignment`] writes
//! raw probabilities. Every adjustment clamps to `[0, 1]`, and the factors
//! live in [`RuleWeights`] rather than being baked into the handlers.
//!
//! Rules referencing categories, items, or relations the store does not know
//! are *skipped*, not fatal: absence of a relation means absence of an
//! applicable constraint.

use alloc::string::String;
use alloc::vec::Vec;

use log::warn;

use crate::category::Item;
use crate::error::{EngineError, Result};
use crate::store::{MatrixStore, ProbabilityMatrix};

// ─── Rule vocabulary ────────────────────────────────────────────────────────

/// Order relation used by [`Rule::Order`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    /// `item1`'s anchor value is greater than `item2`'s.
    Greater,
    /// `item1`'s anchor value is less than `item2`'s.
    Less,
    /// Both items share the same anchor value.
    Equal,
}

impl Relation {
    /// Whether the relation holds between two anchor values.
    pub fn holds(&self, a: &Item, b: &Item) -> bool {
        match self {
            Relation::Greater => a > b,
            Relation::Less => a < b,
            Relation::Equal => a == b,
        }
    }
}

/// A typed constraint derived from one puzzle clue.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rule {
    /// `item1` of `cat1` is definitely paired with `item2` of `cat2`.
    ///
    /// The only hard-commit rule: the target cell becomes 1.0 and the rest
    /// of its row drops to a small floor (not zero, so later rounds can
    /// still move mass).
    DirectAssignment {
        /// Category owning `item1`.
        cat1: String,
        /// The assigned item.
        item1: Item,
        /// Category owning `item2`.
        cat2: String,
        /// The item it is assigned to.
        item2: Item,
    },
    /// `item1` and `item2` (from two categories other than `cat`) relate by
    /// `relation` along `cat`'s own value order — e.g. "Ece Suss was bottled
    /// after Annata Branco" anchored on `Vintage`.
    Order {
        /// The anchor category whose values are compared.
        cat: String,
        /// Item on the left of the relation.
        item1: Item,
        /// Item on the right of the relation.
        item2: Item,
        /// The required relation between their anchor values.
        relation: Relation,
    },
    /// `item2`'s anchor value exceeds `item1`'s by exactly `diff` —
    /// e.g. "Vendemmia was bottled 4 years after Bianca Flaux".
    /// Requires a numeric anchor category.
    ExactDifference {
        /// The numeric anchor category.
        cat: String,
        /// Item at the lower anchor value.
        item1: Item,
        /// Item exactly `diff` above it.
        item2: Item,
        /// The exact anchor-value difference.
        diff: i64,
    },
    /// `item2` of `cat2` pairs with one of `items1` from `cat1` and nothing
    /// else — e.g. "the merlot is either Annata Branco or Bianca Flaux".
    ExclusiveOr {
        /// Category owning the candidate items.
        cat1: String,
        /// The candidate set.
        items1: Vec<Item>,
        /// Category owning the constrained item.
        cat2: String,
        /// The constrained item.
        item2: Item,
    },
}

// ─── RuleWeights ────────────────────────────────────────────────────────────

/// Multiplicative factors applied by the rule handlers.
///
/// The defaults come from the source heuristics; none of them has a
/// principled probabilistic derivation, so they are plain configuration.
/// Penalties compound across solver rounds — re-applying a rule keeps
/// sharpening it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuleWeights {
    /// Raw value written to the non-target row cells of a direct
    /// assignment. A small positive floor, never zero, so normalization
    /// keeps every pairing reachable.
    pub assignment_floor: f64,
    /// Factor for cells violating an order relation.
    pub order_penalty: f64,
    /// Factor for anchor values consistent with an exact difference.
    pub difference_boost: f64,
    /// Factor for anchor values with no in-range partner.
    pub difference_penalty: f64,
    /// Factor for cells inside an exclusive-or candidate set.
    pub xor_boost: f64,
    /// Factor for cells outside an exclusive-or candidate set.
    pub xor_penalty: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            assignment_floor: 0.01,
            order_penalty: 0.5,
            difference_boost: 2.0,
            difference_penalty: 0.5,
            xor_boost: 2.0,
            xor_penalty: 0.1,
        }
    }
}

// ─── RuleEngine ─────────────────────────────────────────────────────────────

/// Applies typed rules to a [`MatrixStore`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleEngine {
    /// Adjustment factors used by the handlers.
    pub weights: RuleWeights,
}

impl RuleEngine {
    /// An engine with explicit weights.
    pub fn new(weights: RuleWeights) -> Self {
        Self { weights }
    }

    /// Apply every rule once, skipping rules whose references the store
    /// cannot resolve. Returns the number of rules actually applied.
    pub fn apply_all(&self, store: &mut MatrixStore, rules: &[Rule]) -> Result<usize> {
        let mut applied = 0;
        for rule in rules {
            match self.apply(store, rule) {
                Ok(()) => applied += 1,
                Err(e) if e.is_recoverable() => {
                    warn!("skipping rule {rule:?}: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(applied)
    }

    /// Apply one rule. Recoverable errors mean the rule does not apply to
    /// this store; [`RuleEngine::apply_all`] turns them into skips.
    pub fn apply(&self, store: &mut MatrixStore, rule: &Rule) -> Result<()> {
        match rule {
            Rule::DirectAssignment {
                cat1,
                item1,
                cat2,
                item2,
            } => self.direct_assignment(store, cat1, item1, cat2, item2),
            Rule::Order {
                cat,
                item1,
                item2,
                relation,
            } => self.order(store, cat, item1, item2, *relation),
            Rule::ExactDifference {
                cat,
                item1,
                item2,
                diff,
            } => self.exact_difference(store, cat, item1, item2, *diff),
            Rule::ExclusiveOr {
                cat1,
                items1,
                cat2,
                item2,
            } => self.exclusive_or(store, cat1, items1, cat2, item2),
        }
    }

    // ── Handlers ───────────────────────────────────────────────────────────

    fn direct_assignment(
        &self,
        store: &mut MatrixStore,
        cat1: &str,
        item1: &Item,
        cat2: &str,
        item2: &Item,
    ) -> Result<()> {
        let a = store.category_index(cat1)?;
        let b = store.category_index(cat2)?;
        let i = index_in(store, a, item1)?;
        let j = index_in(store, b, item2)?;

        let floor = self.weights.assignment_floor;
        let (m, transposed) = store.oriented_mut(a, b)?;
        if transposed {
            // `item1`'s oriented row is a stored column.
            for r in 0..m.rows() {
                m.set(r, i, floor);
            }
            m.set(j, i, 1.0);
        } else {
            for c in 0..m.cols() {
                m.set(i, c, floor);
            }
            m.set(i, j, 1.0);
        }
        Ok(())
    }

    fn order(
        &self,
        store: &mut MatrixStore,
        cat: &str,
        item1: &Item,
        item2: &Item,
        relation: Relation,
    ) -> Result<()> {
        let anchor = store.category_index(cat)?;
        let (c1, idx1) = home_of(store, item1, anchor)?;
        let (c2, idx2) = home_of(store, item2, anchor)?;
        if !store.relation_exists(anchor, c1) {
            return Err(store.missing(anchor, c1));
        }
        if !store.relation_exists(anchor, c2) {
            return Err(store.missing(anchor, c2));
        }

        // Every anchor-value pairing that violates the relation penalizes
        // both implicated cells, once per violation.
        let values = store.categories()[anchor].items().to_vec();
        let mut violations = Vec::new();
        for (i, v1) in values.iter().enumerate() {
            for (j, v2) in values.iter().enumerate() {
                if !relation.holds(v1, v2) {
                    violations.push((i, j));
                }
            }
        }

        let penalty = self.weights.order_penalty;
        {
            let (m, t) = store.oriented_mut(anchor, c1)?;
            for &(i, _) in &violations {
                scale_oriented(m, t, i, idx1, penalty);
            }
        }
        {
            let (m, t) = store.oriented_mut(anchor, c2)?;
            for &(_, j) in &violations {
                scale_oriented(m, t, j, idx2, penalty);
            }
        }
        Ok(())
    }

    fn exact_difference(
        &self,
        store: &mut MatrixStore,
        cat: &str,
        item1: &Item,
        item2: &Item,
        diff: i64,
    ) -> Result<()> {
        let anchor = store.category_index(cat)?;
        if store.categories()[anchor].items().iter().any(|v| !v.is_num()) {
            return Err(EngineError::NonNumericCategory(
                String::from(cat),
            ));
        }
        let (c1, idx1) = home_of(store, item1, anchor)?;
        let (c2, idx2) = home_of(store, item2, anchor)?;
        if !store.relation_exists(anchor, c1) {
            return Err(store.missing(anchor, c1));
        }
        if !store.relation_exists(anchor, c2) {
            return Err(store.missing(anchor, c2));
        }

        // Anchor values with an in-range partner boost both pairings;
        // values without one penalize item1's pairing only.
        let values = store.categories()[anchor].items().to_vec();
        let mut boosts = Vec::new();
        let mut penalties = Vec::new();
        for (i, v) in values.iter().enumerate() {
            match v
                .offset(diff)
                .and_then(|partner| values.iter().position(|w| *w == partner))
            {
                Some(j) => boosts.push((i, j)),
                None => penalties.push(i),
            }
        }

        {
            let (m, t) = store.oriented_mut(anchor, c1)?;
            for &(i, _) in &boosts {
                scale_oriented(m, t, i, idx1, self.weights.difference_boost);
            }
            for &i in &penalties {
                scale_oriented(m, t, i, idx1, self.weights.difference_penalty);
            }
        }
        {
            let (m, t) = store.oriented_mut(anchor, c2)?;
            for &(_, j) in &boosts {
                scale_oriented(m, t, j, idx2, self.weights.difference_boost);
            }
        }
        Ok(())
    }

    fn exclusive_or(
        &self,
        store: &mut MatrixStore,
        cat1: &str,
        items1: &[Item],
        cat2: &str,
        item2: &Item,
    ) -> Result<()> {
        let a = store.category_index(cat1)?;
        let b = store.category_index(cat2)?;
        let j2 = index_in(store, b, item2)?;
        let mut members = alloc::vec![false; store.categories()[a].len()];
        for item in items1 {
            members[index_in(store, a, item)?] = true;
        }

        let (boost, penalty) = (self.weights.xor_boost, self.weights.xor_penalty);
        let (m, t) = store.oriented_mut(a, b)?;
        for (i, &is_member) in members.iter().enumerate() {
            let factor = if is_member { boost } else { penalty };
            scale_oriented(m, t, i, j2, factor);
        }
        Ok(())
    }
}

/// Home category of `item` (excluding the anchor) plus the item's index
/// within it.
fn home_of(store: &MatrixStore, item: &Item, exclude: usize) -> Result<(usize, usize)> {
    store
        .categories()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != exclude)
        .find_map(|(i, cat)| cat.index_of(item).map(|j| (i, j)))
        .ok_or_else(|| EngineError::NoHomeCategory(item.clone()))
}

/// Index of `item` within the category at `idx`, as an engine error.
fn index_in(store: &MatrixStore, idx: usize, item: &Item) -> Result<usize> {
    let cat = &store.categories()[idx];
    cat.index_of(item).ok_or_else(|| EngineError::UnknownItem {
        item: item.clone(),
        category: String::from(cat.name()),
    })
}

/// Multiply one oriented cell by `factor`, clamped to `[0, 1]`.
fn scale_oriented(m: &mut ProbabilityMatrix, transposed: bool, row: usize, col: usize, factor: f64) {
    let (r, c) = if transposed { (col, row) } else { (row, col) };
    let v = (m.get(r, c) * factor).clamp(0.0, 1.0);
    m.set(r, c, v);
}

// ─── Tests ──────────────────────────────────────────────────────────────────
