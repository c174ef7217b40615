//! ε-greedy: exploit the empirically best arm with probability `1 − ε`,
//! otherwise pick uniformly. The incumbent stays eligible during
//! exploration, so its total mass is `1 − ε + ε/k`.

use std::collections::BTreeMap;

use crate::entropy::EntropySource;

use super::{AlgorithmPolicy, PolicyContext};

#[derive(Debug, Clone, Copy)]
pub struct EpsilonGreedy {
    pub epsilon: f64,
}

impl AlgorithmPolicy for EpsilonGreedy {
    fn choose(&self, ctx: &PolicyContext<'_>, entropy: &dyn EntropySource) -> Option<String> {
        if ctx.arms.is_empty() {
            return None;
        }
        if entropy.next_f64() < self.epsilon {
            let idx = entropy.next_index(ctx.k());
            return ctx.arms.keys().nth(idx).cloned();
        }
        ctx.optimum_by(|s| s.mean_reward).map(str::to_owned)
    }

    fn selection_probabilities(&self, ctx: &PolicyContext<'_>) -> BTreeMap<String, f64> {
        if ctx.arms.is_empty() {
            return BTreeMap::new();
        }
        let explore = self.epsilon / ctx.k() as f64;
        let best = ctx.optimum_by(|s| s.mean_reward).map(str::to_owned);
        ctx.arms
            .keys()
            .map(|name| {
                let p = if Some(name) == best.as_ref() {
                    1.0 - self.epsilon + explore
                } else {
                    explore
                };
                (name.clone(), p)
            })
            .collect()
    }
}
