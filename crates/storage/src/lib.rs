//! Storage backends for bandit experiment state.
//!
//! Two interchangeable implementations of [`StorageBackend`]:
//! [`MemoryBackend`] for single-process use and [`RedisBackend`] for a
//! shared store, where every multi-key write runs as one server-side
//! script. Both apply the same reward arithmetic and must yield identical
//! choice sequences for identical seeded traces.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bandit_core::types::{ArmState, BulkReward, LearnerParams};
use bandit_core::BanditResult;

mod memory;
mod redis_backend;
mod scripts;

pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;

/// Capability set every backend provides. All operations are serializable
/// with respect to a single experiment; the reward operations are full
/// read-compute-write transactions (no caller can observe a half-applied
/// update).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists_experiment(&self, experiment: &str) -> BanditResult<bool>;

    /// Create the experiment if absent: parameters, initial arm states,
    /// `max_reward = 1.0`, `choose_count = 0`. No-op when it already
    /// exists (first writer wins under concurrency).
    async fn init_experiment(
        &self,
        experiment: &str,
        params: &LearnerParams,
        arm_names: &[String],
    ) -> BanditResult<()>;

    async fn params(&self, experiment: &str) -> BanditResult<Option<LearnerParams>>;

    /// Live arm states (soft-deleted arms removed), keyed by arm name.
    async fn arm_states(&self, experiment: &str) -> BanditResult<BTreeMap<String, ArmState>>;

    /// Live arm names.
    async fn arm_names(&self, experiment: &str) -> BanditResult<BTreeSet<String>>;

    /// Add an arm with the default state, or clear its soft-delete flag
    /// (restoring prior state). No-op on an unknown experiment.
    async fn create_arm(&self, experiment: &str, arm: &str) -> BanditResult<()>;

    /// Flag an arm deleted while retaining its state. No-op on unknown arms.
    async fn soft_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()>;

    /// Remove an arm and its state permanently.
    async fn hard_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()>;

    /// Atomically apply a single reward observation. Rewards for arms
    /// outside the arm-name set (never created, or hard-deleted) are
    /// silently ignored; soft-deleted arms still accumulate.
    async fn record_reward(
        &self,
        experiment: &str,
        arm: &str,
        lower_bound: f64,
        reward: f64,
    ) -> BanditResult<()>;

    /// Atomically merge a pre-aggregated reward batch. Same ignore policy
    /// as [`StorageBackend::record_reward`].
    async fn record_bulk_reward(
        &self,
        experiment: &str,
        arm: &str,
        lower_bound: f64,
        bulk: &BulkReward,
    ) -> BanditResult<()>;

    /// Atomically increment the choose counter, returning the new value.
    async fn incr_choose_count(&self, experiment: &str) -> BanditResult<u64>;

    async fn choose_count(&self, experiment: &str) -> BanditResult<u64>;

    /// The running normalization maximum (1.0 until a larger reward lands).
    async fn max_reward(&self, experiment: &str) -> BanditResult<f64>;

    /// Remove every experiment owned by this backend.
    async fn reset(&self) -> BanditResult<()>;
}
