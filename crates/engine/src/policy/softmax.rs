//! Boltzmann selection with linear temperature decay.
//!
//! Temperature starts at `starting_temperature` and cools by
//! `temp_decay_per_step` for every pull absorbed across the experiment,
//! floored at `min_temperature`. Minimization negates the means before the
//! exponential (the weights of a distribution over `−mean/T`), which keeps
//! the result a proper distribution.

use std::collections::BTreeMap;

use crate::entropy::EntropySource;
use crate::probability;

use super::{AlgorithmPolicy, PolicyContext};

#[derive(Debug, Clone, Copy)]
pub struct Softmax {
    pub starting_temperature: f64,
    pub temp_decay_per_step: f64,
    pub min_temperature: f64,
}

impl Softmax {
    fn temperature(&self, ctx: &PolicyContext<'_>) -> f64 {
        let steps = ctx.total_pulls() as f64;
        (self.starting_temperature - self.temp_decay_per_step * steps).max(self.min_temperature)
    }
}

impl AlgorithmPolicy for Softmax {
    fn choose(&self, ctx: &PolicyContext<'_>, entropy: &dyn EntropySource) -> Option<String> {
        let probs = self.selection_probabilities(ctx);
        probability::sample_weighted(&probs, entropy.next_f64()).map(str::to_owned)
    }

    fn selection_probabilities(&self, ctx: &PolicyContext<'_>) -> BTreeMap<String, f64> {
        if ctx.arms.is_empty() {
            return BTreeMap::new();
        }
        let sign = if ctx.maximize { 1.0 } else { -1.0 };
        let scores: BTreeMap<String, f64> = ctx
            .arms
            .iter()
            .map(|(name, state)| (name.clone(), sign * state.mean_reward))
            .collect();
        probability::softmax(&scores, self.temperature(ctx))
    }
}
