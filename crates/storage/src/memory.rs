//! In-process backend backed by DashMap.
//!
//! One map entry per experiment; every mutation holds the entry's exclusive
//! guard, which serializes read-compute-write transitions per experiment
//! without contending across unrelated experiments (beyond shard locks).

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bandit_core::reward;
use bandit_core::types::{ArmState, BulkReward, LearnerParams};
use bandit_core::{keys, BanditError, BanditResult};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::StorageBackend;

#[derive(Debug, Clone)]
struct ExperimentData {
    params: LearnerParams,
    /// Full arm map, soft-deleted arms included.
    arms: BTreeMap<String, ArmState>,
    max_reward: f64,
    choose_count: u64,
}

/// Single-process storage for bandit experiments.
#[derive(Default)]
pub struct MemoryBackend {
    experiments: DashMap<String, ExperimentData>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            experiments: DashMap::new(),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn exists_experiment(&self, experiment: &str) -> BanditResult<bool> {
        Ok(self.experiments.contains_key(experiment))
    }

    async fn init_experiment(
        &self,
        experiment: &str,
        params: &LearnerParams,
        arm_names: &[String],
    ) -> BanditResult<()> {
        keys::validate_name(experiment)?;
        // entry() holds the shard write lock, so concurrent inits converge
        // on the first writer's state.
        self.experiments
            .entry(experiment.to_string())
            .or_insert_with(|| {
                info!(
                    experiment,
                    algo = params.algo.name(),
                    arms = arm_names.len(),
                    "experiment initialized"
                );
                ExperimentData {
                    params: params.clone(),
                    arms: arm_names
                        .iter()
                        .map(|a| (a.clone(), ArmState::default()))
                        .collect(),
                    max_reward: 1.0,
                    choose_count: 0,
                }
            });
        Ok(())
    }

    async fn params(&self, experiment: &str) -> BanditResult<Option<LearnerParams>> {
        Ok(self.experiments.get(experiment).map(|e| e.params.clone()))
    }

    async fn arm_states(&self, experiment: &str) -> BanditResult<BTreeMap<String, ArmState>> {
        Ok(self
            .experiments
            .get(experiment)
            .map(|e| {
                e.arms
                    .iter()
                    .filter(|(_, s)| !s.deleted)
                    .map(|(name, s)| (name.clone(), *s))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn arm_names(&self, experiment: &str) -> BanditResult<BTreeSet<String>> {
        Ok(self
            .experiments
            .get(experiment)
            .map(|e| {
                e.arms
                    .iter()
                    .filter(|(_, s)| !s.deleted)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        keys::validate_name(arm)?;
        if let Some(mut entry) = self.experiments.get_mut(experiment) {
            entry
                .arms
                .entry(arm.to_string())
                .and_modify(|s| s.deleted = false)
                .or_default();
        }
        Ok(())
    }

    async fn soft_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        if let Some(mut entry) = self.experiments.get_mut(experiment) {
            if let Some(state) = entry.arms.get_mut(arm) {
                state.deleted = true;
            }
        }
        Ok(())
    }

    async fn hard_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        if let Some(mut entry) = self.experiments.get_mut(experiment) {
            entry.arms.remove(arm);
        }
        Ok(())
    }

    async fn record_reward(
        &self,
        experiment: &str,
        arm: &str,
        lower_bound: f64,
        reward_value: f64,
    ) -> BanditResult<()> {
        let Some(mut entry) = self.experiments.get_mut(experiment) else {
            debug!(experiment, arm, "reward for unknown experiment ignored");
            return Ok(());
        };
        let exp = entry.value_mut();
        let Some(state) = exp.arms.get(arm).copied() else {
            debug!(experiment, arm, "reward for unknown arm ignored");
            metrics::counter!("bandit.reward.ignored").increment(1);
            return Ok(());
        };
        let up = reward::apply_single(
            state.n,
            state.mean_reward,
            exp.max_reward,
            lower_bound,
            reward_value,
        );
        exp.max_reward = up.max_reward;
        if let Some(s) = exp.arms.get_mut(arm) {
            s.n = up.n;
            s.mean_reward = up.mean_reward;
        }
        Ok(())
    }

    async fn record_bulk_reward(
        &self,
        experiment: &str,
        arm: &str,
        lower_bound: f64,
        bulk: &BulkReward,
    ) -> BanditResult<()> {
        let Some(mut entry) = self.experiments.get_mut(experiment) else {
            debug!(experiment, arm, "bulk reward for unknown experiment ignored");
            return Ok(());
        };
        let exp = entry.value_mut();
        let Some(state) = exp.arms.get(arm).copied() else {
            debug!(experiment, arm, "bulk reward for unknown arm ignored");
            metrics::counter!("bandit.reward.ignored").increment(1);
            return Ok(());
        };
        let up = reward::apply_bulk(
            state.n,
            state.mean_reward,
            exp.max_reward,
            lower_bound,
            bulk.mean,
            bulk.max,
            bulk.count,
        );
        exp.max_reward = up.max_reward;
        if let Some(s) = exp.arms.get_mut(arm) {
            s.n = up.n;
            s.mean_reward = up.mean_reward;
        }
        Ok(())
    }

    async fn incr_choose_count(&self, experiment: &str) -> BanditResult<u64> {
        let mut entry = self.experiments.get_mut(experiment).ok_or_else(|| {
            BanditError::Storage(format!("experiment {experiment:?} not initialized"))
        })?;
        entry.choose_count += 1;
        Ok(entry.choose_count)
    }

    async fn choose_count(&self, experiment: &str) -> BanditResult<u64> {
        Ok(self
            .experiments
            .get(experiment)
            .map(|e| e.choose_count)
            .unwrap_or(0))
    }

    async fn max_reward(&self, experiment: &str) -> BanditResult<f64> {
        Ok(self
            .experiments
            .get(experiment)
            .map(|e| e.max_reward)
            .unwrap_or(1.0))
    }

    async fn reset(&self) -> BanditResult<()> {
        let removed = self.experiments.len();
        self.experiments.clear();
        info!(removed, "memory backend reset");
        Ok(())
    }
}
