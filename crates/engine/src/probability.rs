//! Deterministic probability helpers: stable softmax over a score map and
//! cumulative weighted sampling.

use std::collections::BTreeMap;

/// Softmax distribution over a name→score map.
///
/// Uses the standard max-subtraction trick for numerical stability and
/// falls back to uniform when the weights degenerate (all-zero or
/// non-finite denominators). Returns an empty map for empty input.
pub fn softmax(scores: &BTreeMap<String, f64>, temperature: f64) -> BTreeMap<String, f64> {
    if scores.is_empty() {
        return BTreeMap::new();
    }
    let t = if temperature.is_finite() && temperature > 0.0 {
        temperature
    } else {
        1.0
    };

    let max_score = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut denom = 0.0;
    for (name, &score) in scores {
        let w = ((score - max_score) / t).exp();
        denom += w;
        weights.insert(name.clone(), w);
    }
    if denom <= 0.0 || !denom.is_finite() {
        let uniform = 1.0 / scores.len() as f64;
        return scores.keys().map(|k| (k.clone(), uniform)).collect();
    }

    for w in weights.values_mut() {
        *w /= denom;
    }
    weights
}

/// Sample from a distribution by cumulative mass and a uniform draw in
/// `[0, 1)`. Rounding shortfall falls through to the last entry, so a draw
/// near 1.0 can never miss.
pub fn sample_weighted(probs: &BTreeMap<String, f64>, draw: f64) -> Option<&str> {
    let mut cumulative = 0.0;
    let mut last = None;
    for (name, p) in probs {
        cumulative += p;
        last = Some(name.as_str());
        if draw < cumulative {
            return last;
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&scores(&[("a", 0.0), ("b", 1.0), ("c", -2.0)]), 1.0);
        let sum: f64 = p.values().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum={sum}");
        assert!(p["b"] > p["a"] && p["a"] > p["c"]);
    }

    #[test]
    fn low_temperature_sharpens() {
        let hot = softmax(&scores(&[("a", 0.2), ("b", 0.8)]), 10.0);
        let cold = softmax(&scores(&[("a", 0.2), ("b", 0.8)]), 0.01);
        assert!(cold["b"] > hot["b"]);
        assert!(cold["b"] > 0.999);
    }

    #[test]
    fn equal_scores_are_uniform() {
        let p = softmax(&scores(&[("a", 0.5), ("b", 0.5), ("c", 0.5)]), 0.3);
        for v in p.values() {
            assert!((v - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    proptest::proptest! {
        #[test]
        fn softmax_always_sums_to_one(
            values in proptest::collection::vec(-50.0f64..50.0, 1..12),
            temperature in 0.01f64..10.0,
        ) {
            let scores: BTreeMap<String, f64> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("arm-{i}"), *v))
                .collect();
            let p = softmax(&scores, temperature);
            let sum: f64 = p.values().sum();
            proptest::prop_assert!((sum - 1.0).abs() < 1e-9, "sum={}", sum);
            proptest::prop_assert!(p.values().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn sample_weighted_walks_the_cdf() {
        let p = scores(&[("a", 0.2), ("b", 0.5), ("c", 0.3)]);
        assert_eq!(sample_weighted(&p, 0.0), Some("a"));
        assert_eq!(sample_weighted(&p, 0.19), Some("a"));
        assert_eq!(sample_weighted(&p, 0.2), Some("b"));
        assert_eq!(sample_weighted(&p, 0.69), Some("b"));
        assert_eq!(sample_weighted(&p, 0.7), Some("c"));
        // Rounding shortfall falls through to the last entry.
        assert_eq!(sample_weighted(&p, 0.999999999), Some("c"));
        assert_eq!(sample_weighted(&BTreeMap::new(), 0.5), None);
    }
}
