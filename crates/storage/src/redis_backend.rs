//! Redis-backed storage for bandit experiment state.
//!
//! Layout per experiment (names validated colon-free by the key formatter):
//!
//! ```text
//! bandit:experiment:{name}:params            hash (stringified fields)
//! bandit:experiment:{name}:arm-names         set
//! bandit:experiment:{name}:arm-states:{arm}  hash: n, mean-reward, deleted
//! bandit:experiment:{name}:max-reward        scalar
//! bandit:experiment:{name}:choose-count      integer counter
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use bandit_core::config::RedisConfig;
use bandit_core::types::{Algorithm, ArmState, BulkReward, LearnerParams};
use bandit_core::{keys, BanditError, BanditResult};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::{scripts, StorageBackend};

/// Shared-store backend; all multi-key writes run as server-side scripts.
pub struct RedisBackend {
    conn: ConnectionManager,
    init_experiment: redis::Script,
    create_arm: redis::Script,
    soft_delete_arm: redis::Script,
    hard_delete_arm: redis::Script,
    record_reward: redis::Script,
    bulk_reward: redis::Script,
}

impl RedisBackend {
    /// Connect to Redis and verify the connection with a PING.
    pub async fn connect(config: &RedisConfig) -> BanditResult<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis bandit store");

        let client = redis::Client::open(url.as_str()).map_err(storage_err)?;
        let mut conn = ConnectionManager::new(client).await.map_err(storage_err)?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(storage_err)?;
        debug!(response = %pong, "Redis connection established");

        Ok(Self {
            conn,
            init_experiment: redis::Script::new(scripts::INIT_EXPERIMENT),
            create_arm: redis::Script::new(scripts::CREATE_ARM),
            soft_delete_arm: redis::Script::new(scripts::SOFT_DELETE_ARM),
            hard_delete_arm: redis::Script::new(scripts::HARD_DELETE_ARM),
            record_reward: redis::Script::new(scripts::RECORD_REWARD),
            bulk_reward: redis::Script::new(scripts::BULK_REWARD),
        })
    }

    // ConnectionManager clones share one multiplexed connection.
    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

fn storage_err(err: redis::RedisError) -> BanditError {
    BanditError::Storage(err.to_string())
}

// ─── Params hash codec ─────────────────────────────────────────────────────

fn encode_params(params: &LearnerParams) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("algo", params.algo.name().to_string()),
        ("maximize", if params.maximize { "1" } else { "0" }.into()),
        (
            "reward-lower-bound",
            params.reward_lower_bound.to_string(),
        ),
    ];
    match &params.algo {
        Algorithm::EpsilonGreedy { epsilon } => {
            fields.push(("epsilon", epsilon.to_string()));
        }
        Algorithm::Ucb1 { exploration_mult } => {
            fields.push(("exploration-mult", exploration_mult.to_string()));
        }
        Algorithm::Softmax {
            starting_temperature,
            temp_decay_per_step,
            min_temperature,
        } => {
            fields.push(("starting-temperature", starting_temperature.to_string()));
            fields.push(("temp-decay-per-step", temp_decay_per_step.to_string()));
            fields.push(("min-temperature", min_temperature.to_string()));
        }
        Algorithm::Random => {}
    }
    fields
}

fn hash_field<'a>(map: &'a HashMap<String, String>, field: &str) -> BanditResult<&'a str> {
    map.get(field)
        .map(String::as_str)
        .ok_or_else(|| BanditError::Storage(format!("params hash missing field {field:?}")))
}

fn hash_f64(map: &HashMap<String, String>, field: &str) -> BanditResult<f64> {
    hash_field(map, field)?
        .parse::<f64>()
        .map_err(|err| BanditError::Storage(format!("params field {field:?}: {err}")))
}

fn decode_params(map: &HashMap<String, String>) -> BanditResult<LearnerParams> {
    let algo = match hash_field(map, "algo")? {
        "epsilon_greedy" => Algorithm::EpsilonGreedy {
            epsilon: hash_f64(map, "epsilon")?,
        },
        "ucb1" => Algorithm::Ucb1 {
            exploration_mult: hash_f64(map, "exploration-mult")?,
        },
        "softmax" => Algorithm::Softmax {
            starting_temperature: hash_f64(map, "starting-temperature")?,
            temp_decay_per_step: hash_f64(map, "temp-decay-per-step")?,
            min_temperature: hash_f64(map, "min-temperature")?,
        },
        "random" => Algorithm::Random,
        other => {
            return Err(BanditError::Storage(format!(
                "unknown algorithm {other:?} in params hash"
            )))
        }
    };
    Ok(LearnerParams {
        algo,
        maximize: hash_field(map, "maximize")? == "1",
        reward_lower_bound: hash_f64(map, "reward-lower-bound")?,
    })
}

fn decode_arm_state(map: &HashMap<String, String>) -> BanditResult<ArmState> {
    let n = hash_field(map, "n")?
        .parse::<u64>()
        .map_err(|err| BanditError::Storage(format!("arm state field \"n\": {err}")))?;
    Ok(ArmState {
        n,
        mean_reward: hash_f64(map, "mean-reward")?,
        deleted: hash_field(map, "deleted")? == "1",
    })
}

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn exists_experiment(&self, experiment: &str) -> BanditResult<bool> {
        let mut conn = self.conn();
        conn.exists(keys::params_key(experiment)?)
            .await
            .map_err(storage_err)
    }

    async fn init_experiment(
        &self,
        experiment: &str,
        params: &LearnerParams,
        arm_names: &[String],
    ) -> BanditResult<()> {
        let mut invocation = self.init_experiment.prepare_invoke();
        invocation
            .key(keys::params_key(experiment)?)
            .key(keys::arm_names_key(experiment)?)
            .key(keys::max_reward_key(experiment)?)
            .key(keys::choose_count_key(experiment)?);
        for arm in arm_names {
            invocation.key(keys::arm_state_key(experiment, arm)?);
        }
        let fields = encode_params(params);
        invocation.arg(fields.len());
        for (field, value) in &fields {
            invocation.arg(*field).arg(value.as_str());
        }
        for arm in arm_names {
            invocation.arg(arm.as_str());
        }

        let mut conn = self.conn();
        let created: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        if created == 1 {
            info!(
                experiment,
                algo = params.algo.name(),
                arms = arm_names.len(),
                "experiment initialized"
            );
        }
        Ok(())
    }

    async fn params(&self, experiment: &str) -> BanditResult<Option<LearnerParams>> {
        let mut conn = self.conn();
        let map: HashMap<String, String> = conn
            .hgetall(keys::params_key(experiment)?)
            .await
            .map_err(storage_err)?;
        if map.is_empty() {
            return Ok(None);
        }
        decode_params(&map).map(Some)
    }

    async fn arm_states(&self, experiment: &str) -> BanditResult<BTreeMap<String, ArmState>> {
        let mut conn = self.conn();
        let names: Vec<String> = conn
            .smembers(keys::arm_names_key(experiment)?)
            .await
            .map_err(storage_err)?;

        let mut states = BTreeMap::new();
        for arm in names {
            let map: HashMap<String, String> = conn
                .hgetall(keys::arm_state_key(experiment, &arm)?)
                .await
                .map_err(storage_err)?;
            if map.is_empty() {
                // Raced a hard delete between SMEMBERS and HGETALL.
                continue;
            }
            let state = decode_arm_state(&map)?;
            if !state.deleted {
                states.insert(arm, state);
            }
        }
        Ok(states)
    }

    async fn arm_names(&self, experiment: &str) -> BanditResult<BTreeSet<String>> {
        Ok(self.arm_states(experiment).await?.into_keys().collect())
    }

    async fn create_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        let mut conn = self.conn();
        let _created: i64 = self
            .create_arm
            .prepare_invoke()
            .key(keys::params_key(experiment)?)
            .key(keys::arm_names_key(experiment)?)
            .key(keys::arm_state_key(experiment, arm)?)
            .arg(arm)
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn soft_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        let mut conn = self.conn();
        let _flagged: i64 = self
            .soft_delete_arm
            .prepare_invoke()
            .key(keys::arm_names_key(experiment)?)
            .key(keys::arm_state_key(experiment, arm)?)
            .arg(arm)
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn hard_delete_arm(&self, experiment: &str, arm: &str) -> BanditResult<()> {
        let mut conn = self.conn();
        let _removed: i64 = self
            .hard_delete_arm
            .prepare_invoke()
            .key(keys::arm_names_key(experiment)?)
            .key(keys::arm_state_key(experiment, arm)?)
            .arg(arm)
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn record_reward(
        &self,
        experiment: &str,
        arm: &str,
        lower_bound: f64,
        reward: f64,
    ) -> BanditResult<()> {
        let mut conn = self.conn();
        let applied: i64 = self
            .record_reward
            .prepare_invoke()
            .key(keys::arm_names_key(experiment)?)
            .key(keys::arm_state_key(experiment, arm)?)
            .key(keys::max_reward_key(experiment)?)
            .arg(arm)
            .arg(lower_bound.to_string())
            .arg(reward.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        if applied == 0 {
            debug!(experiment, arm, "reward for unknown arm ignored");
            metrics::counter!("bandit.reward.ignored").increment(1);
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
        let mut conn = self.conn();
        let applied: i64 = self
            .bulk_reward
            .prepare_invoke()
            .key(keys::arm_names_key(experiment)?)
            .key(keys::arm_state_key(experiment, arm)?)
            .key(keys::max_reward_key(experiment)?)
            .arg(arm)
            .arg(lower_bound.to_string())
            .arg(bulk.mean.to_string())
            .arg(bulk.max.to_string())
            .arg(bulk.count)
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        if applied == 0 {
            debug!(experiment, arm, "bulk reward for unknown arm ignored");
            metrics::counter!("bandit.reward.ignored").increment(1);
        }
        Ok(())
    }

    async fn incr_choose_count(&self, experiment: &str) -> BanditResult<u64> {
        let mut conn = self.conn();
        let count: i64 = conn
            .incr(keys::choose_count_key(experiment)?, 1)
            .await
            .map_err(storage_err)?;
        Ok(count.max(0) as u64)
    }

    async fn choose_count(&self, experiment: &str) -> BanditResult<u64> {
        let mut conn = self.conn();
        let count: Option<i64> = conn
            .get(keys::choose_count_key(experiment)?)
            .await
            .map_err(storage_err)?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    async fn max_reward(&self, experiment: &str) -> BanditResult<f64> {
        let mut conn = self.conn();
        let max: Option<f64> = conn
            .get(keys::max_reward_key(experiment)?)
            .await
            .map_err(storage_err)?;
        Ok(max.unwrap_or(1.0))
    }

    async fn reset(&self) -> BanditResult<()> {
        let mut conn = self.conn();
        let mut owned: Vec<String> = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = conn
                .scan_match(keys::EXPERIMENT_KEY_PATTERN)
                .await
                .map_err(storage_err)?;
            while let Some(key) = iter.next_item().await {
                owned.push(key);
            }
        }
        if !owned.is_empty() {
            let mut conn = self.conn();
            conn.del::<_, ()>(owned.clone()).await.map_err(storage_err)?;
        }
        info!(removed = owned.len(), "redis backend reset");
        Ok(())
    }
}
