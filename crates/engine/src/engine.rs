//! The learner façade: validates caller input, resolves the policy from the
//! experiment's algorithm tag, and orchestrates the storage backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bandit_core::types::{
    self, ArmState, BulkReward, ExperimentSnapshot, LearnerParams, Reward,
};
use bandit_core::{keys, BanditError, BanditResult};
use bandit_storage::StorageBackend;
use tracing::debug;

use crate::entropy::{EntropySource, ThreadEntropy};
use crate::policy::{self, PolicyContext};

/// Multi-armed bandit learner over a storage backend.
///
/// Thread-safe and cheap to share: callers on any number of threads may
/// interleave `choose` and `reward` calls. A `choose` decides from a
/// snapshot of arm state that may already be stale when the matching reward
/// arrives; the backend's atomic reward transactions make that safe.
pub struct BanditEngine {
    backend: Arc<dyn StorageBackend>,
    entropy: Arc<dyn EntropySource>,
}

impl BanditEngine {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_entropy(backend, Arc::new(ThreadEntropy))
    }

    /// Same engine with an injected entropy source (deterministic tests).
    pub fn with_entropy(backend: Arc<dyn StorageBackend>, entropy: Arc<dyn EntropySource>) -> Self {
        Self { backend, entropy }
    }

    /// Create an experiment. Validates the full learner schema first;
    /// a no-op when the experiment already exists.
    pub async fn init(
        &self,
        experiment: &str,
        params: &LearnerParams,
        arm_names: &[String],
    ) -> BanditResult<()> {
        keys::validate_name(experiment)?;
        params.validate()?;
        types::validate_arm_names(arm_names)?;
        self.backend
            .init_experiment(experiment, params, arm_names)
            .await
    }

    /// Select an arm, or `None` when the experiment has no live arms.
    /// Advances the choose counter; the policy observes the pre-increment
    /// value, so successive calls see 0, 1, 2, …
    pub async fn choose(&self, experiment: &str) -> BanditResult<Option<String>> {
        keys::validate_name(experiment)?;
        let arms = self.backend.arm_states(experiment).await?;
        if arms.is_empty() {
            return Ok(None);
        }
        let params = self.require_params(experiment).await?;
        let count = self.backend.incr_choose_count(experiment).await?;
        let ctx = PolicyContext {
            arms: &arms,
            maximize: params.maximize,
            choose_count: count.saturating_sub(1),
        };
        let chosen = policy::policy_for(&params.algo).choose(&ctx, self.entropy.as_ref());
        metrics::counter!("bandit.choose").increment(1);
        Ok(chosen)
    }

    /// Absorb a single reward. Rewards for unknown or hard-deleted arms
    /// are silently dropped (delayed feedback for removed arms is
    /// expected); the random policy accumulates nothing.
    pub async fn reward(&self, experiment: &str, reward: &Reward) -> BanditResult<()> {
        keys::validate_name(experiment)?;
        reward.validate()?;
        let Some(params) = self.backend.params(experiment).await? else {
            debug!(experiment, "reward for unknown experiment ignored");
            return Ok(());
        };
        if !policy::policy_for(&params.algo).accumulates_rewards() {
            return Ok(());
        }
        self.backend
            .record_reward(
                experiment,
                &reward.arm_name,
                params.reward_lower_bound,
                reward.reward_value,
            )
            .await?;
        metrics::counter!("bandit.reward").increment(1);
        Ok(())
    }

    /// Absorb a pre-aggregated reward batch. Same ignore policy as
    /// [`BanditEngine::reward`].
    pub async fn bulk_reward(&self, experiment: &str, bulk: &BulkReward) -> BanditResult<()> {
        keys::validate_name(experiment)?;
        bulk.validate()?;
        let Some(params) = self.backend.params(experiment).await? else {
            debug!(experiment, "bulk reward for unknown experiment ignored");
            return Ok(());
        };
        if !policy::policy_for(&params.algo).accumulates_rewards() {
            return Ok(());
        }
        self.backend
            .record_bulk_reward(experiment, &bulk.arm_name, params.reward_lower_bound, bulk)
            .await?;
        metrics::counter!("bandit.reward").increment(1);
        Ok(())
    }

    /// Add an arm mid-experiment, or restore a soft-deleted one.
    pub async fn create_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        keys::validate_name(experiment)?;
        keys::validate_name(arm)?;
        self.backend.create_arm(experiment, arm).await
    }

    /// Hide an arm from selection while keeping its accumulated state.
    pub async fn soft_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        keys::validate_name(experiment)?;
        keys::validate_name(arm)?;
        self.backend.soft_delete_arm(experiment, arm).await
    }

    /// Remove an arm permanently; later rewards for it are dropped.
    pub async fn hard_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        keys::validate_name(experiment)?;
        keys::validate_name(arm)?;
        self.backend.hard_delete_arm(experiment, arm).await
    }

    /// The distribution the policy would sample on the next `choose`,
    /// over live arms. Read-only: does not advance the choose counter.
    pub async fn arm_selection_probabilities(
        &self,
        experiment: &str,
    ) -> BanditResult<BTreeMap<String, f64>> {
        keys::validate_name(experiment)?;
        let arms = self.backend.arm_states(experiment).await?;
        if arms.is_empty() {
            return Ok(BTreeMap::new());
        }
        let params = self.require_params(experiment).await?;
        let count = self.backend.choose_count(experiment).await?;
        let ctx = PolicyContext {
            arms: &arms,
            maximize: params.maximize,
            choose_count: count,
        };
        Ok(policy::policy_for(&params.algo).selection_probabilities(&ctx))
    }

    /// Live arm states.
    pub async fn arm_states(&self, experiment: &str) -> BanditResult<BTreeMap<String, ArmState>> {
        keys::validate_name(experiment)?;
        self.backend.arm_states(experiment).await
    }

    /// Live arm names.
    pub async fn arm_names(&self, experiment: &str) -> BanditResult<BTreeSet<String>> {
        keys::validate_name(experiment)?;
        self.backend.arm_names(experiment).await
    }

    /// One read-only report: live arm states, next-choose distribution,
    /// and the experiment-scoped scalars. `None` for unknown experiments.
    pub async fn snapshot(&self, experiment: &str) -> BanditResult<Option<ExperimentSnapshot>> {
        keys::validate_name(experiment)?;
        let Some(params) = self.backend.params(experiment).await? else {
            return Ok(None);
        };
        let arms = self.backend.arm_states(experiment).await?;
        let choose_count = self.backend.choose_count(experiment).await?;
        let max_reward = self.backend.max_reward(experiment).await?;
        let ctx = PolicyContext {
            arms: &arms,
            maximize: params.maximize,
            choose_count,
        };
        let selection_probabilities = if arms.is_empty() {
            BTreeMap::new()
        } else {
            policy::policy_for(&params.algo).selection_probabilities(&ctx)
        };
        Ok(Some(ExperimentSnapshot {
            experiment: experiment.to_string(),
            params,
            choose_count,
            max_reward,
            arms,
            selection_probabilities,
        }))
    }

    /// Clear every experiment owned by the backend.
    pub async fn reset(&self) -> BanditResult<()> {
        self.backend.reset().await
    }

    async fn require_params(&self, experiment: &str) -> BanditResult<LearnerParams> {
        self.backend.params(experiment).await?.ok_or_else(|| {
            BanditError::Storage(format!(
                "experiment {experiment:?} has arms but no parameter record"
            ))
        })
    }
}
