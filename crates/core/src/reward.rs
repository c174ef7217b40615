//! Scale-and-update reward arithmetic shared by every backend.
//!
//! Raw rewards are normalized into [0, 1] against a running experiment-wide
//! maximum so that exploration terms operate on a bounded mean. The running
//! max only ratchets upward; early means drift slightly optimistic until it
//! stabilizes, which is why the single and bulk paths agree approximately
//! rather than exactly when large rewards arrive mid-stream.
//!
//! The in-process backend calls these functions directly; the Redis backend
//! evaluates the identical arithmetic server-side in Lua.

/// Result of applying a reward: the arm's next `{n, mean}` and the
/// experiment's next running max.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardUpdate {
    pub n: u64,
    pub mean_reward: f64,
    pub max_reward: f64,
}

/// Apply one reward observation to an arm.
pub fn apply_single(
    n: u64,
    mean_reward: f64,
    max_reward: f64,
    lower_bound: f64,
    reward: f64,
) -> RewardUpdate {
    let clamped = reward.max(lower_bound);
    let max = max_reward.max(clamped);
    let scaled = normalize(clamped, max, lower_bound);
    let next_n = n + 1;
    RewardUpdate {
        n: next_n,
        mean_reward: mean_reward + (scaled - mean_reward) / next_n as f64,
        max_reward: max,
    }
}

/// Merge a pre-aggregated batch `{mean, max, count}` into an arm
/// (parallel mean merge weighted by the batch size).
pub fn apply_bulk(
    n: u64,
    mean_reward: f64,
    max_reward: f64,
    lower_bound: f64,
    batch_mean: f64,
    batch_max: f64,
    count: u64,
) -> RewardUpdate {
    let mean_clamped = batch_mean.max(lower_bound);
    let max_clamped = batch_max.max(lower_bound);
    let max = max_reward.max(max_clamped);
    let scaled = normalize(mean_clamped, max, lower_bound);
    let next_n = n + count;
    RewardUpdate {
        n: next_n,
        mean_reward: mean_reward + (scaled - mean_reward) * (count as f64 / next_n as f64),
        max_reward: max,
    }
}

// When the running max has not risen above the lower bound the scale
// collapses; the bound itself is produced instead of dividing by zero.
fn normalize(value: f64, max: f64, lower_bound: f64) -> f64 {
    if max == lower_bound {
        lower_bound
    } else {
        (value - lower_bound) / (max - lower_bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_lower_bound_scaling() {
        // lower bound -1, reward -0.5 against the default state:
        // scaled = (-0.5 - (-1)) / (1 - (-1)) = 0.25, mean = 0.25 / 2.
        let up = apply_single(1, 0.0, 1.0, -1.0, -0.5);
        assert_eq!(up.n, 2);
        assert!((up.mean_reward - 0.125).abs() < 1e-12);
        assert_eq!(up.max_reward, 1.0);
    }

    #[test]
    fn rewards_below_the_bound_are_clamped() {
        let up = apply_single(1, 0.0, 1.0, 0.0, -5.0);
        assert_eq!(up.n, 2);
        assert_eq!(up.mean_reward, 0.0);
        assert_eq!(up.max_reward, 1.0);
    }

    #[test]
    fn max_ratchets_and_rescales() {
        let up = apply_single(1, 0.0, 1.0, 0.0, 4.0);
        assert_eq!(up.max_reward, 4.0);
        assert!((up.mean_reward - 0.5).abs() < 1e-12);
    }

    #[test]
    fn degenerate_scale_produces_the_bound() {
        // max == lower bound: the scale has collapsed to a point.
        let up = apply_single(1, 0.5, 1.0, 1.0, 1.0);
        assert_eq!(up.max_reward, 1.0);
        assert!((up.mean_reward - 0.75).abs() < 1e-12);
    }

    #[test]
    fn bulk_tracks_sequential_singles() {
        let rewards = [1.0, 0.5, 0.2, 0.7, 0.3, 1.0, 0.3, 0.7, 0.9, 0.14];

        let mut n = 1u64;
        let mut mean = 0.0;
        let mut max = 1.0;
        for r in rewards {
            let up = apply_single(n, mean, max, 0.0, r);
            n = up.n;
            mean = up.mean_reward;
            max = up.max_reward;
        }

        let batch_mean = rewards.iter().sum::<f64>() / rewards.len() as f64;
        let batch_max = rewards.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bulk = apply_bulk(1, 0.0, 1.0, 0.0, batch_mean, batch_max, rewards.len() as u64);

        assert_eq!(n, 11);
        assert_eq!(bulk.n, 11);
        assert!(
            (mean - bulk.mean_reward).abs() < 5e-4,
            "single={mean} bulk={}",
            bulk.mean_reward
        );
    }

    #[test]
    fn bulk_of_one_matches_single() {
        let single = apply_single(4, 0.3, 2.0, 0.0, 1.2);
        let bulk = apply_bulk(4, 0.3, 2.0, 0.0, 1.2, 1.2, 1);
        assert_eq!(single, bulk);
    }

    proptest! {
        // Mean stays in [0, 1] for any reward sequence respecting the bound
        // (bounds above 1.0 break normalization by construction; the
        // parameter schema keeps real configurations well below that).
        #[test]
        fn mean_stays_in_unit_interval(
            lower_bound in -10.0f64..=1.0,
            offsets in prop::collection::vec(0.0f64..100.0, 1..40),
        ) {
            let mut n = 1u64;
            let mut mean = 0.0;
            let mut max = 1.0;
            for off in &offsets {
                let up = apply_single(n, mean, max, lower_bound, lower_bound + off);
                n = up.n;
                mean = up.mean_reward;
                max = up.max_reward;
                prop_assert!(n >= 1);
                prop_assert!((0.0..=1.0).contains(&mean), "mean={mean}");
                prop_assert!(max >= lower_bound);
            }
        }

        #[test]
        fn bulk_mean_stays_in_unit_interval(
            lower_bound in -10.0f64..=1.0,
            batches in prop::collection::vec((0.0f64..50.0, 0.0f64..50.0, 1u64..200), 1..20),
        ) {
            let mut n = 1u64;
            let mut mean = 0.0;
            let mut max = 1.0;
            for (mean_off, extra, count) in &batches {
                let batch_mean = lower_bound + mean_off;
                let batch_max = batch_mean + extra;
                let up = apply_bulk(n, mean, max, lower_bound, batch_mean, batch_max, *count);
                n = up.n;
                mean = up.mean_reward;
                max = up.max_reward;
                prop_assert!((0.0..=1.0).contains(&mean), "mean={mean}");
            }
        }
    }
}
