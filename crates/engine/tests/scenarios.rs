//! End-to-end scenarios: cold start, exploration bias, reward scaling,
//! bulk-vs-single agreement, and regret ordering on a synthetic problem.

use std::sync::Arc;

use bandit_core::types::{Algorithm, BulkReward, LearnerParams, Reward};
use bandit_engine::{BanditEngine, SeededEntropy};
use bandit_storage::MemoryBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn engine(seed: u64) -> BanditEngine {
    BanditEngine::with_entropy(
        Arc::new(MemoryBackend::new()),
        Arc::new(SeededEntropy::new(seed)),
    )
}

fn params(algo: Algorithm, maximize: bool, reward_lower_bound: f64) -> LearnerParams {
    LearnerParams {
        algo,
        maximize,
        reward_lower_bound,
    }
}

fn ucb1(maximize: bool) -> LearnerParams {
    params(
        Algorithm::Ucb1 {
            exploration_mult: 1.0,
        },
        maximize,
        0.0,
    )
}

fn arms(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn single(arm: &str, value: f64) -> Reward {
    Reward {
        arm_name: arm.to_string(),
        reward_value: value,
    }
}

#[tokio::test]
async fn ucb1_cold_start_round_robins_in_name_order() {
    let engine = engine(20);
    engine
        .init("exp", &ucb1(true), &arms(&["a", "b", "c"]))
        .await
        .unwrap();

    let mut picks = Vec::new();
    for _ in 0..4 {
        picks.push(engine.choose("exp").await.unwrap().unwrap());
    }
    assert_eq!(picks, ["a", "b", "c", "a"]);
}

#[tokio::test]
async fn ucb1_exploration_term_dominates_in_both_directions() {
    for maximize in [true, false] {
        let engine = engine(21);
        engine
            .init(
                "exp",
                &ucb1(maximize),
                &arms(&["highly_explored", "rarely_explored"]),
            )
            .await
            .unwrap();

        // Build the arm histories with one pre-aggregated batch each:
        // a million observations at mean 0.1 versus ten at mean 0.5.
        engine
            .bulk_reward(
                "exp",
                &BulkReward {
                    arm_name: "highly_explored".into(),
                    mean: 0.1,
                    max: 1.0,
                    count: 999_999,
                },
            )
            .await
            .unwrap();
        engine
            .bulk_reward(
                "exp",
                &BulkReward {
                    arm_name: "rarely_explored".into(),
                    mean: 0.5,
                    max: 1.0,
                    count: 9,
                },
            )
            .await
            .unwrap();

        let chosen = engine.choose("exp").await.unwrap().unwrap();
        assert_eq!(chosen, "rarely_explored", "maximize={maximize}");
    }
}

#[tokio::test]
async fn epsilon_greedy_distribution_matches_the_closed_form() {
    let engine = engine(22);
    engine
        .init(
            "exp",
            &params(Algorithm::EpsilonGreedy { epsilon: 0.3 }, true, 0.0),
            &arms(&["a", "b", "c"]),
        )
        .await
        .unwrap();
    engine.reward("exp", &single("a", 0.9)).await.unwrap();
    engine.reward("exp", &single("b", 0.2)).await.unwrap();
    engine.reward("exp", &single("c", 0.1)).await.unwrap();

    let probs = engine.arm_selection_probabilities("exp").await.unwrap();
    assert!((probs["a"] - 0.8).abs() < 1e-9);
    assert!((probs["b"] - 0.1).abs() < 1e-9);
    assert!((probs["c"] - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn reward_scaling_with_negative_lower_bound() {
    let engine = engine(23);
    engine
        .init(
            "exp",
            &params(
                Algorithm::Ucb1 {
                    exploration_mult: 1.0,
                },
                true,
                -1.0,
            ),
            &arms(&["arm1", "arm2"]),
        )
        .await
        .unwrap();

    engine.reward("exp", &single("arm1", -0.5)).await.unwrap();

    // scaled = (-0.5 - (-1)) / (1 - (-1)) = 0.25; mean = 0.25 / 2.
    let state = engine.arm_states("exp").await.unwrap()["arm1"];
    assert_eq!(state.n, 2);
    assert!((state.mean_reward - 0.125).abs() < 1e-12);

    let snap = engine.snapshot("exp").await.unwrap().unwrap();
    assert_eq!(snap.max_reward, 1.0);
}

#[tokio::test]
async fn bulk_reward_approximates_sequential_singles() {
    let rewards = [1.0, 0.5, 0.2, 0.7, 0.3, 1.0, 0.3, 0.7, 0.9, 0.14];
    let engine = engine(24);

    engine
        .init("one-by-one", &ucb1(true), &arms(&["arm1"]))
        .await
        .unwrap();
    for value in rewards {
        engine.reward("one-by-one", &single("arm1", value)).await.unwrap();
    }

    engine.init("batched", &ucb1(true), &arms(&["arm1"])).await.unwrap();
    let mean = rewards.iter().sum::<f64>() / rewards.len() as f64;
    let max = rewards.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    engine
        .bulk_reward(
            "batched",
            &BulkReward {
                arm_name: "arm1".into(),
                mean,
                max,
                count: rewards.len() as u64,
            },
        )
        .await
        .unwrap();

    let sequential = engine.arm_states("one-by-one").await.unwrap()["arm1"];
    let batched = engine.arm_states("batched").await.unwrap()["arm1"];
    assert_eq!(sequential.n, 11);
    assert_eq!(batched.n, 11);
    assert!(
        (sequential.mean_reward - batched.mean_reward).abs() < 0.0005,
        "sequential={} batched={}",
        sequential.mean_reward,
        batched.mean_reward
    );
}

// ─── Regret ordering on a stationary three-armed Gaussian problem ─────────

const ARM_MEANS: [(&str, f64, f64); 3] = [
    ("alpha", 200.7, 2.0),
    ("beta", 15.1, 1.3),
    ("gamma", 1.3, 2.0),
];
const STEPS: usize = 100_000;

/// Run one policy on the Gaussian problem; returns (total_reward, regret),
/// with regret measured against the per-direction optimal true mean.
async fn run_problem(algo: Algorithm, maximize: bool, seed: u64) -> (f64, f64) {
    let engine = engine(seed);
    let names: Vec<String> = ARM_MEANS.iter().map(|(n, _, _)| n.to_string()).collect();
    engine
        .init("problem", &params(algo, maximize, 0.0), &names)
        .await
        .unwrap();

    let mut reward_rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    let distributions: Vec<(String, f64, Normal<f64>)> = ARM_MEANS
        .iter()
        .map(|(name, mean, stddev)| {
            (name.to_string(), *mean, Normal::new(*mean, *stddev).unwrap())
        })
        .collect();
    let optimal = distributions
        .iter()
        .map(|(_, mean, _)| *mean)
        .fold(if maximize { f64::NEG_INFINITY } else { f64::INFINITY }, |acc, m| {
            if maximize {
                acc.max(m)
            } else {
                acc.min(m)
            }
        });

    let mut total_reward = 0.0;
    let mut regret = 0.0;
    for _ in 0..STEPS {
        let chosen = engine.choose("problem").await.unwrap().unwrap();
        let (_, true_mean, dist) = distributions
            .iter()
            .find(|(name, _, _)| *name == chosen)
            .unwrap();
        let observed = dist.sample(&mut reward_rng);
        total_reward += observed;
        regret += if maximize {
            optimal - true_mean
        } else {
            true_mean - optimal
        };
        engine.reward("problem", &single(&chosen, observed)).await.unwrap();
    }
    (total_reward, regret)
}

fn softmax_algo() -> Algorithm {
    Algorithm::Softmax {
        starting_temperature: 1.0,
        temp_decay_per_step: 1.0 / STEPS as f64,
        min_temperature: 0.01,
    }
}

#[tokio::test]
async fn regret_ordering_when_maximizing() {
    let (_, ucb1_regret) = run_problem(
        Algorithm::Ucb1 {
            exploration_mult: 1.0,
        },
        true,
        31,
    )
    .await;
    let (_, eps_regret) =
        run_problem(Algorithm::EpsilonGreedy { epsilon: 0.1 }, true, 32).await;
    let (_, softmax_regret) = run_problem(softmax_algo(), true, 33).await;
    let (_, random_regret) = run_problem(Algorithm::Random, true, 34).await;

    assert!(
        ucb1_regret < eps_regret && eps_regret < random_regret,
        "ucb1={ucb1_regret} eps={eps_regret} random={random_regret}"
    );
    assert!(
        softmax_regret < random_regret,
        "softmax={softmax_regret} random={random_regret}"
    );
}

#[tokio::test]
async fn total_cost_ordering_when_minimizing() {
    let (ucb1_total, _) = run_problem(
        Algorithm::Ucb1 {
            exploration_mult: 1.0,
        },
        false,
        41,
    )
    .await;
    let (eps_total, _) =
        run_problem(Algorithm::EpsilonGreedy { epsilon: 0.1 }, false, 42).await;
    let (random_total, _) = run_problem(Algorithm::Random, false, 43).await;

    assert!(
        ucb1_total < eps_total && eps_total < random_total,
        "ucb1={ucb1_total} eps={eps_total} random={random_total}"
    );
}
