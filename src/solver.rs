//! The convergence loop: rules → reconcile → normalize, for a fixed number
//! of rounds.
//!
//! The round count is deliberately fixed — no adaptive stopping. Rules are
//! safe to re-apply every round; their multiplicative penalties compound,
//! which sharpens the belief state. The final probabilities are therefore
//! sensitive to the round count, which is why it is plain configuration.
//!
//! The phase order within a round (rules, then reconciliation, then
//! normalization) matches the source behavior; it is a tunable convention,
//! not a hard contract — callers wanting a different order can drive
//! [`RuleEngine`], [`Reconciler`], and [`Sinkhorn`] themselves.

use log::debug;

use crate::error::Result;
use crate::normalize::{Convergence, Sinkhorn};
use crate::reconcile::Reconciler;
use crate::rules::{Rule, RuleEngine};
use crate::store::MatrixStore;

/// Drives repeated rule application, reconciliation, and normalization.
#[derive(Clone, Copy, Debug)]
pub struct Solver {
    /// Number of rounds to run (default 20). No early exit.
    pub rounds: u32,
    /// Rule applicator.
    pub engine: RuleEngine,
    /// Triple-consistency reconciler.
    pub reconciler: Reconciler,
    /// Whole-store normalizer used at the end of each round.
    pub sinkhorn: Sinkhorn,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            rounds: 20,
            engine: RuleEngine::default(),
            reconciler: Reconciler::new(),
            sinkhorn: Sinkhorn::default(),
        }
    }
}

impl Solver {
    /// A solver with an explicit round count and default operators.
    pub fn with_rounds(rounds: u32) -> Self {
        Self {
            rounds,
            ..Self::default()
        }
    }

    /// Run the full convergence loop over `store`.
    ///
    /// Returns the final round's normalization report ([`Convergence::trivial`]
    /// when `rounds` is 0). Unresolvable rules are skipped every round; only
    /// fatal errors abort.
    pub fn solve(&self, store: &mut MatrixStore, rules: &[Rule]) -> Result<Convergence> {
        let mut last = Convergence::trivial();
        for round in 1..=self.rounds {
            let applied = self.engine.apply_all(store, rules)?;
            self.reconciler.reconcile(store);
            last = self.sinkhorn.project_store(store);
            debug!(
                "round {round}/{}: {applied}/{} rules applied, residual {}",
                self.rounds,
                rules.len(),
                last.residual
            );
        }
        Ok(last)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
