//! UCB1 with a round-robin cold start.
//!
//! While unrewarded arms remain (`n == 1`) and the choose counter lands in
//! their slot range, arms are cycled deterministically by `choose_count mod
//! k`; afterwards the upper (or lower, when minimizing) confidence bound
//! decides.

use std::collections::BTreeMap;

use bandit_core::types::ArmState;

use crate::entropy::EntropySource;

use super::{AlgorithmPolicy, PolicyContext};

#[derive(Debug, Clone, Copy)]
pub struct Ucb1 {
    pub exploration_mult: f64,
}

impl Ucb1 {
    fn unrewarded<'a>(&self, ctx: &'a PolicyContext<'_>) -> Vec<&'a str> {
        ctx.arms
            .iter()
            .filter(|(_, s)| s.n == 1)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Round-robin slot into the unrewarded arms, when the cold-start rule
    /// applies. With every arm unrewarded this cycles the whole set.
    fn cold_start_slot(&self, ctx: &PolicyContext<'_>, unrewarded_count: usize) -> Option<usize> {
        if unrewarded_count == 0 {
            return None;
        }
        let slot = (ctx.choose_count % ctx.k() as u64) as usize;
        (slot < unrewarded_count).then_some(slot)
    }

    fn confidence_bound(&self, ctx: &PolicyContext<'_>, total_pulls: u64, state: &ArmState) -> f64 {
        let bonus = self.exploration_mult
            * (2.0 * (total_pulls as f64).ln() / state.n as f64).sqrt();
        if ctx.maximize {
            state.mean_reward + bonus
        } else {
            state.mean_reward - bonus
        }
    }
}

impl AlgorithmPolicy for Ucb1 {
    fn choose(&self, ctx: &PolicyContext<'_>, _entropy: &dyn EntropySource) -> Option<String> {
        if ctx.arms.is_empty() {
            return None;
        }
        let unrewarded = self.unrewarded(ctx);
        if let Some(slot) = self.cold_start_slot(ctx, unrewarded.len()) {
            return unrewarded.get(slot).map(|name| name.to_string());
        }
        let total = ctx.total_pulls();
        ctx.optimum_by(|s| self.confidence_bound(ctx, total, s))
            .map(str::to_owned)
    }

    fn selection_probabilities(&self, ctx: &PolicyContext<'_>) -> BTreeMap<String, f64> {
        if ctx.arms.is_empty() {
            return BTreeMap::new();
        }
        let unrewarded = self.unrewarded(ctx);
        if self.cold_start_slot(ctx, unrewarded.len()).is_some() {
            let uniform = 1.0 / ctx.k() as f64;
            return ctx.arms.keys().map(|name| (name.clone(), uniform)).collect();
        }
        let total = ctx.total_pulls();
        let best = ctx
            .optimum_by(|s| self.confidence_bound(ctx, total, s))
            .map(str::to_owned);
        ctx.arms
            .keys()
            .map(|name| {
                let p = if Some(name) == best.as_ref() { 1.0 } else { 0.0 };
                (name.clone(), p)
            })
            .collect()
    }
}
