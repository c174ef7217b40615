//! Public schema types: algorithms, learner parameters, arm state, and
//! reward payloads. Validation happens here, before any storage is touched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{BanditError, BanditResult};
use crate::keys;

/// Selection algorithm, carrying its per-algorithm parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algo", rename_all = "snake_case")]
pub enum Algorithm {
    EpsilonGreedy {
        epsilon: f64,
    },
    Ucb1 {
        #[serde(default = "default_exploration_mult")]
        exploration_mult: f64,
    },
    Softmax {
        starting_temperature: f64,
        temp_decay_per_step: f64,
        min_temperature: f64,
    },
    Random,
}

fn default_exploration_mult() -> f64 {
    1.0
}

impl Algorithm {
    /// Stable wire name of the algorithm (matches the serde tag).
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::EpsilonGreedy { .. } => "epsilon_greedy",
            Algorithm::Ucb1 { .. } => "ucb1",
            Algorithm::Softmax { .. } => "softmax",
            Algorithm::Random => "random",
        }
    }

    fn validate(&self) -> BanditResult<()> {
        match self {
            Algorithm::EpsilonGreedy { epsilon } => {
                if !epsilon.is_finite() || *epsilon <= 0.0 || *epsilon >= 1.0 {
                    return Err(BanditError::Validation(format!(
                        "epsilon must lie in (0, 1), got {epsilon}"
                    )));
                }
            }
            Algorithm::Ucb1 { exploration_mult } => {
                if !exploration_mult.is_finite() || *exploration_mult <= 0.0 {
                    return Err(BanditError::Validation(format!(
                        "exploration_mult must be positive, got {exploration_mult}"
                    )));
                }
            }
            Algorithm::Softmax {
                starting_temperature,
                temp_decay_per_step,
                min_temperature,
            } => {
                for (field, value) in [
                    ("starting_temperature", starting_temperature),
                    ("temp_decay_per_step", temp_decay_per_step),
                    ("min_temperature", min_temperature),
                ] {
                    if !value.is_finite() || *value <= 0.0 {
                        return Err(BanditError::Validation(format!(
                            "{field} must be positive, got {value}"
                        )));
                    }
                }
            }
            Algorithm::Random => {}
        }
        Ok(())
    }
}

/// Per-experiment learner parameters, written once by `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerParams {
    #[serde(flatten)]
    pub algo: Algorithm,
    pub maximize: bool,
    #[serde(default)]
    pub reward_lower_bound: f64,
}

impl LearnerParams {
    pub fn validate(&self) -> BanditResult<()> {
        if !self.reward_lower_bound.is_finite() {
            return Err(BanditError::Validation(format!(
                "reward_lower_bound must be finite, got {}",
                self.reward_lower_bound
            )));
        }
        self.algo.validate()
    }
}

/// Online state of a single arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmState {
    /// Reward count plus one; starts at 1 so exploration terms never
    /// divide by zero.
    pub n: u64,
    /// Normalized mean reward, in [0, 1] once rewards have arrived.
    pub mean_reward: f64,
    /// Soft-delete flag; the arm keeps its state while set.
    pub deleted: bool,
}

impl Default for ArmState {
    fn default() -> Self {
        Self {
            n: 1,
            mean_reward: 0.0,
            deleted: false,
        }
    }
}

/// A single reward observation attributed to one arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub arm_name: String,
    pub reward_value: f64,
}

impl Reward {
    pub fn validate(&self) -> BanditResult<()> {
        keys::validate_name(&self.arm_name)?;
        if !self.reward_value.is_finite() {
            return Err(BanditError::Validation(format!(
                "reward_value must be finite, got {}",
                self.reward_value
            )));
        }
        Ok(())
    }
}

/// A pre-aggregated batch of rewards for one arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkReward {
    pub arm_name: String,
    pub mean: f64,
    pub max: f64,
    pub count: u64,
}

impl BulkReward {
    pub fn validate(&self) -> BanditResult<()> {
        keys::validate_name(&self.arm_name)?;
        if self.count == 0 {
            return Err(BanditError::Validation("count must be at least 1".into()));
        }
        if !self.mean.is_finite() || !self.max.is_finite() {
            return Err(BanditError::Validation(format!(
                "mean and max must be finite, got mean={} max={}",
                self.mean, self.max
            )));
        }
        if self.mean > self.max {
            return Err(BanditError::Validation(format!(
                "mean {} exceeds max {}",
                self.mean, self.max
            )));
        }
        Ok(())
    }
}

/// Read-only report over one experiment: live arm states, the distribution
/// the policy would sample next, and the experiment-scoped scalars.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSnapshot {
    pub experiment: String,
    pub params: LearnerParams,
    pub choose_count: u64,
    pub max_reward: f64,
    pub arms: BTreeMap<String, ArmState>,
    pub selection_probabilities: BTreeMap<String, f64>,
}

/// Validate an `init` arm list: non-empty, every name legal, no duplicates.
pub fn validate_arm_names(arm_names: &[String]) -> BanditResult<()> {
    if arm_names.is_empty() {
        return Err(BanditError::Validation(
            "arm_names must be non-empty".into(),
        ));
    }
    let mut seen = BTreeSet::new();
    for name in arm_names {
        keys::validate_name(name)?;
        if !seen.insert(name.as_str()) {
            return Err(BanditError::Validation(format!(
                "duplicate arm name {name:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ucb1_params() -> LearnerParams {
        LearnerParams {
            algo: Algorithm::Ucb1 {
                exploration_mult: 1.0,
            },
            maximize: true,
            reward_lower_bound: 0.0,
        }
    }

    #[test]
    fn epsilon_domain_is_open_interval() {
        for epsilon in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let params = LearnerParams {
                algo: Algorithm::EpsilonGreedy { epsilon },
                maximize: true,
                reward_lower_bound: 0.0,
            };
            assert!(params.validate().is_err(), "epsilon={epsilon}");
        }
        let params = LearnerParams {
            algo: Algorithm::EpsilonGreedy { epsilon: 0.3 },
            maximize: false,
            reward_lower_bound: -1.0,
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn softmax_requires_positive_temperatures() {
        let params = LearnerParams {
            algo: Algorithm::Softmax {
                starting_temperature: 1.0,
                temp_decay_per_step: 0.0,
                min_temperature: 0.01,
            },
            maximize: true,
            reward_lower_bound: 0.0,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn lower_bound_must_be_finite() {
        let mut params = ucb1_params();
        params.reward_lower_bound = f64::INFINITY;
        assert!(params.validate().is_err());
    }

    #[test]
    fn arm_name_lists_must_be_distinct_and_legal() {
        let ok = vec!["a".to_string(), "b".to_string()];
        assert!(validate_arm_names(&ok).is_ok());
        assert!(validate_arm_names(&[]).is_err());
        assert!(validate_arm_names(&["a".to_string(), "a".to_string()]).is_err());
        assert!(validate_arm_names(&["a:b".to_string()]).is_err());
        assert!(validate_arm_names(&[String::new()]).is_err());
    }

    #[test]
    fn bulk_reward_precondition_mean_le_max() {
        let bulk = BulkReward {
            arm_name: "a".into(),
            mean: 2.0,
            max: 1.0,
            count: 3,
        };
        assert!(bulk.validate().is_err());
        let bulk = BulkReward {
            arm_name: "a".into(),
            mean: 0.5,
            max: 1.0,
            count: 0,
        };
        assert!(bulk.validate().is_err());
    }

    #[test]
    fn algorithm_serde_tags_are_snake_case() {
        let json = serde_json::to_value(&ucb1_params()).unwrap();
        assert_eq!(json["algo"], "ucb1");
        assert_eq!(json["exploration_mult"], 1.0);

        let parsed: LearnerParams = serde_json::from_str(
            r#"{"algo":"epsilon_greedy","epsilon":0.1,"maximize":true}"#,
        )
        .unwrap();
        assert_eq!(parsed.algo, Algorithm::EpsilonGreedy { epsilon: 0.1 });
        assert_eq!(parsed.reward_lower_bound, 0.0);
    }
}
