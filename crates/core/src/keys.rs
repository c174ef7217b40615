//! Hierarchical storage keys under the `bandit:experiment:` namespace.
//!
//! Experiment and arm names become path segments of the remote key layout,
//! so the reserved separator is rejected here before any key is built.

use crate::error::{BanditError, BanditResult};

/// Reserved key separator. Experiment and arm names must not contain it.
pub const SEPARATOR: char = ':';

/// Match pattern covering every key owned by this library.
pub const EXPERIMENT_KEY_PATTERN: &str = "bandit:experiment:*";

const ROOT: &str = "bandit:experiment";

/// Reject empty names and names containing the reserved separator.
pub fn validate_name(name: &str) -> BanditResult<()> {
    if name.is_empty() {
        return Err(BanditError::Validation("name must be non-empty".into()));
    }
    if name.contains(SEPARATOR) {
        return Err(BanditError::Validation(format!(
            "name {name:?} contains reserved separator {SEPARATOR:?}"
        )));
    }
    Ok(())
}

/// `bandit:experiment:{name}:params`
pub fn params_key(experiment: &str) -> BanditResult<String> {
    validate_name(experiment)?;
    Ok(format!("{ROOT}:{experiment}:params"))
}

/// `bandit:experiment:{name}:arm-names`
pub fn arm_names_key(experiment: &str) -> BanditResult<String> {
    validate_name(experiment)?;
    Ok(format!("{ROOT}:{experiment}:arm-names"))
}

/// `bandit:experiment:{name}:arm-states:{arm}`
pub fn arm_state_key(experiment: &str, arm: &str) -> BanditResult<String> {
    validate_name(experiment)?;
    validate_name(arm)?;
    Ok(format!("{ROOT}:{experiment}:arm-states:{arm}"))
}

/// `bandit:experiment:{name}:max-reward`
pub fn max_reward_key(experiment: &str) -> BanditResult<String> {
    validate_name(experiment)?;
    Ok(format!("{ROOT}:{experiment}:max-reward"))
}

/// `bandit:experiment:{name}:choose-count`
pub fn choose_count_key(experiment: &str) -> BanditResult<String> {
    validate_name(experiment)?;
    Ok(format!("{ROOT}:{experiment}:choose-count"))
}
