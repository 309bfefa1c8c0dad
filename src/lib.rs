//! # zebra-core
//!
//! Probability-matrix constraint engine for logic-grid ("zebra") puzzles.
//!
//! Uncertain assignments between puzzle categories are held as pairwise
//! probability matrices. Typed rules — deduced clues supplied by an outer
//! orchestration layer — nudge cell probabilities; triple reconciliation
//! pulls the independently evolving matrices toward one globally consistent
//! belief state; iterative normalization restores the doubly stochastic
//! invariant after every update. A converged store yields the most likely
//! item pairings by row-wise argmax.
//!
//! ## The pipeline
//!
//! ```text
//! Rules → RuleEngine → Reconciler → Sinkhorn   (one round, repeated)
//!               ↓           ↓          ↓
//!                     MatrixStore ──────────→ Assignments
//!                          ↑
//!                    FixedCellFit  (pinned-cell updates)
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`category`] | [`Category`], [`Item`] | Puzzle vocabulary: named axes of ordered items |
//! | [`store`] | [`MatrixStore`], [`ProbabilityMatrix`], [`MatrixView`] | One matrix per category pair; canonical-orientation authority |
//! | [`normalize`] | [`Sinkhorn`], [`FixedCellFit`], [`Convergence`] | Doubly stochastic rescaling, with or without pinned cells |
//! | [`rules`] | [`Rule`], [`RuleEngine`], [`RuleWeights`] | Typed clue constraints as multiplicative adjustments |
//! | [`reconcile`] | [`Reconciler`] | Cross-matrix agreement over category triples |
//! | [`solver`] | [`Solver`] | Fixed-round convergence loop |
//! | [`assignment`] | [`Assignments`] | Row-argmax extraction of the most likely pairings |
//! | [`error`] | [`EngineError`] | Fatal vs. recoverable ("skip this rule") error kinds |
//! | [`snapshot`] | `StoreSnapshot` | Serializable store dump (requires the `serde` feature) |
//!
//! ## Example
//!
//! ```
//! use zebra_core::{Assignments, Item, MatrixStore, Rule, Solver};
//!
//! let mut store = MatrixStore::new(vec![
//!     ("Vintage".to_string(), vec![Item::from(1984), Item::from(1988)]),
//!     ("Wine".to_string(), vec![Item::from("Ece Suss"), Item::from("Vendemmia")]),
//! ])
//! .unwrap();
//!
//! let rules = vec![Rule::DirectAssignment {
//!     cat1: "Vintage".to_string(),
//!     item1: Item::from(1988),
//!     cat2: "Wine".to_string(),
//!     item2: Item::from("Ece Suss"),
//! }];
//!
//! Solver::default().solve(&mut store, &rules).unwrap();
//! let table = Assignments::extract(&store);
//! assert_eq!(table.best(&Item::from(1988), "Wine"), Some(&Item::from("Ece Suss")));
//! ```
//!
//! ## Scope
//!
//! The engine is single-threaded and synchronous: no I/O, no suspension
//! points, no interior locking. A [`MatrixStore`] belongs to one solver
//! session; parallel exploration of alternative rule orderings works on
//! independent `Clone`s. Clue interpretation, prompt construction, and
//! presentation live in outer layers that feed [`Rule`] values in and read
//! matrices and [`Assignments`] back out.
//!
//! ## `no_std`
//!
//! The crate is `#![no_std]` with `alloc`. Logging goes through the `log`
//! facade; no logger is installed here.

#![no_std]
#![deny(unsafe_code)]
#![deny(missing_docs)]

extern crate alloc;

pub mod assignment;
pub mod category;
pub mod error;
pub mod normalize;
pub mod reconcile;
pub mod rules;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod solver;
pub mod store;

pub use assignment::Assignments;
pub use category::{Category, Item};
pub use error::{Axis, EngineError, Result};
pub use normalize::{Convergence, FixedCell, FixedCellFit, Sinkhorn};
pub use reconcile::Reconciler;
pub use rules::{Relation, Rule, RuleEngine, RuleWeights};
pub use solver::Solver;
pub use store::{MatrixStore, MatrixView, ProbabilityMatrix};
