//! Selection policies, one per algorithm variant.
//!
//! A policy is pure: it decides from a read-only [`PolicyContext`] snapshot
//! and an entropy source, and never touches storage. The engine façade
//! resolves the policy from the experiment's tagged algorithm field.

use std::collections::BTreeMap;

use bandit_core::types::{Algorithm, ArmState};

use crate::entropy::EntropySource;

mod epsilon_greedy;
mod random;
mod softmax;
mod ucb1;

pub use epsilon_greedy::EpsilonGreedy;
pub use random::Random;
pub use softmax::Softmax;
pub use ucb1::Ucb1;

/// Read-only view a policy decides from: live arms in name order, the
/// optimization direction, and the pre-increment choose counter (the
/// sequence of `choose` calls observes counter values 0, 1, 2, …).
pub struct PolicyContext<'a> {
    pub arms: &'a BTreeMap<String, ArmState>,
    pub maximize: bool,
    pub choose_count: u64,
}

impl PolicyContext<'_> {
    pub(crate) fn k(&self) -> usize {
        self.arms.len()
    }

    /// Total pull count across live arms.
    pub(crate) fn total_pulls(&self) -> u64 {
        self.arms.values().map(|s| s.n).sum()
    }

    /// Arm optimizing `score`: argmax when maximizing, argmin otherwise.
    /// Ties break to the first arm in name order.
    pub(crate) fn optimum_by<F>(&self, score: F) -> Option<&str>
    where
        F: Fn(&ArmState) -> f64,
    {
        let mut best: Option<(&str, f64)> = None;
        for (name, state) in self.arms {
            let s = score(state);
            let better = match best {
                None => true,
                Some((_, b)) => {
                    if self.maximize {
                        s > b
                    } else {
                        s < b
                    }
                }
            };
            if better {
                best = Some((name, s));
            }
        }
        best.map(|(name, _)| name)
    }
}

/// One selection algorithm.
pub trait AlgorithmPolicy: Send + Sync {
    /// Pick a live arm, or `None` when the context has no arms.
    fn choose(&self, ctx: &PolicyContext<'_>, entropy: &dyn EntropySource) -> Option<String>;

    /// The distribution `choose` would sample right now. Empty map for an
    /// empty context; otherwise sums to 1.
    fn selection_probabilities(&self, ctx: &PolicyContext<'_>) -> BTreeMap<String, f64>;

    /// Whether rewards accumulate arm state (false only for uniform
    /// random, which learns nothing).
    fn accumulates_rewards(&self) -> bool {
        true
    }
}

/// Resolve the policy for an algorithm tag.
pub fn policy_for(algo: &Algorithm) -> Box<dyn AlgorithmPolicy> {
    match algo {
        Algorithm::EpsilonGreedy { epsilon } => Box::new(EpsilonGreedy { epsilon: *epsilon }),
        Algorithm::Ucb1 { exploration_mult } => Box::new(Ucb1 {
            exploration_mult: *exploration_mult,
        }),
        Algorithm::Softmax {
            starting_temperature,
            temp_decay_per_step,
            min_temperature,
        } => Box::new(Softmax {
            starting_temperature: *starting_temperature,
            temp_decay_per_step: *temp_decay_per_step,
            min_temperature: *min_temperature,
        }),
        Algorithm::Random => Box::new(Random),
    }
}
