//! Composite score and sub-score computation. Pure arithmetic over
//! already-normalized values; no error paths.

use super::domain::{Metric, NormalizedMetrics, SubScores, WeightMapping};
use super::normalize::fallback;

/// Weighted sum of the normalized metrics on a 0-100 scale, rounded to two
/// decimals. Metrics without a weight contribute nothing.
pub fn composite_score(metrics: &NormalizedMetrics, weights: &WeightMapping) -> f64 {
    let total: f64 = metrics
        .iter()
        .map(|(metric, value)| value * weights.get(metric).copied().unwrap_or(0.0))
        .sum();

    round_to(total * 100.0, 2)
}

/// Sub-scores for the response surface, each on a 0-100 scale rounded to
/// whole numbers. Computed from normalized values, independent of the
/// weighting tables.
pub fn sub_scores(metrics: &NormalizedMetrics) -> SubScores {
    let get = |metric: Metric| metrics.get(&metric).copied().unwrap_or_else(|| fallback(metric));

    let travel_risk = (1.0 - get(Metric::TravelAdvisoryScore)) * 100.0;
    let health_infra = (get(Metric::LifeExpectancy) + get(Metric::GdpPerCapita)) / 2.0 * 100.0;
    let env_stability =
        (get(Metric::Pm25) + get(Metric::Pm10) + get(Metric::Temperature)) / 3.0 * 100.0;

    SubScores {
        travel_risk: round_to(travel_risk, 0),
        health_infra: round_to(health_infra, 0),
        env_stability: round_to(env_stability, 0),
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::normalize::normalize_all;
    use crate::analysis::weights::weights_for;
    use crate::analysis::{RawMetrics, RiskTolerance, StayDuration};
    use std::collections::BTreeMap;

    #[test]
    fn empty_metrics_score_zero() {
        let weights = weights_for(RiskTolerance::Moderate, StayDuration::LongTerm);
        assert_eq!(composite_score(&BTreeMap::new(), &weights), 0.0);
    }

    #[test]
    fn unweighted_metrics_contribute_nothing() {
        let mut metrics = BTreeMap::new();
        metrics.insert(Metric::Pm10, 1.0);
        assert_eq!(composite_score(&metrics, &BTreeMap::new()), 0.0);

        let weights = weights_for(RiskTolerance::Moderate, StayDuration::ShortTerm);
        // pm10 has no weight in any table.
        assert_eq!(composite_score(&metrics, &weights), 0.0);
    }

    #[test]
    fn perfect_metrics_score_one_hundred() {
        let metrics: NormalizedMetrics = Metric::ALL.iter().map(|&m| (m, 1.0)).collect();
        let weights = weights_for(RiskTolerance::High, StayDuration::LongTerm);
        assert_eq!(composite_score(&metrics, &weights), 100.0);
    }

    #[test]
    fn composite_rounds_to_two_decimals() {
        let mut metrics = BTreeMap::new();
        metrics.insert(Metric::LifeExpectancy, 1.0 / 3.0);
        let mut weights = BTreeMap::new();
        weights.insert(Metric::LifeExpectancy, 1.0);
        assert_eq!(composite_score(&metrics, &weights), 33.33);
    }

    #[test]
    fn sub_scores_from_pure_fallbacks() {
        let normalized = normalize_all(&RawMetrics::new());
        let scores = sub_scores(&normalized);
        // Advisory falls back to 0.2, so implied risk is 80.
        assert_eq!(scores.travel_risk, 80.0);
        assert_eq!(scores.health_infra, 50.0);
        assert_eq!(scores.env_stability, 50.0);
    }

    #[test]
    fn sub_scores_track_their_inputs() {
        let mut raw = RawMetrics::new();
        raw.insert(Metric::LifeExpectancy, 85.0);
        raw.insert(Metric::GdpPerCapita, 80_000.0);
        raw.insert(Metric::TravelAdvisoryScore, 25.0);
        let scores = sub_scores(&normalize_all(&raw));
        assert_eq!(scores.health_infra, 100.0);
        assert_eq!(scores.travel_risk, 25.0);
    }
}
