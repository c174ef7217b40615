//! Multi-armed bandit learner engine: selection policies (ε-greedy, UCB1,
//! softmax, uniform random), an injectable entropy source, and the
//! [`BanditEngine`] façade that ties policies to a storage backend.

pub mod engine;
pub mod entropy;
pub mod policy;
pub mod probability;

pub use engine::BanditEngine;
pub use entropy::{EntropySource, SeededEntropy, ThreadEntropy};
