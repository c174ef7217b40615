//! Uniform random selection. A control policy: it learns nothing, so
//! rewards are not accumulated for it.

use std::collections::BTreeMap;

use crate::entropy::EntropySource;

use super::{AlgorithmPolicy, PolicyContext};

#[derive(Debug, Clone, Copy)]
pub struct Random;

impl AlgorithmPolicy for Random {
    fn choose(&self, ctx: &PolicyContext<'_>, entropy: &dyn EntropySource) -> Option<String> {
        if ctx.arms.is_empty() {
            return None;
        }
        ctx.arms.keys().nth(entropy.next_index(ctx.k())).cloned()
    }

    fn selection_probabilities(&self, ctx: &PolicyContext<'_>) -> BTreeMap<String, f64> {
        if ctx.arms.is_empty() {
            return BTreeMap::new();
        }
        let uniform = 1.0 / ctx.k() as f64;
        ctx.arms.keys().map(|name| (name.clone(), uniform)).collect()
    }

    fn accumulates_rewards(&self) -> bool {
        false
    }
}
