//! Per-metric weight derivation from risk tolerance and stay duration.
//!
//! The tolerance tables and duration multipliers are hand-calibrated
//! constants. pm10 deliberately carries no weight of its own; it only feeds
//! the environmental-stability sub-score.

use super::domain::{Metric, RiskTolerance, StayDuration, WeightMapping};

const MODERATE: [(Metric, f64); 7] = [
    (Metric::LifeExpectancy, 0.20),
    (Metric::GdpPerCapita, 0.20),
    (Metric::Population, 0.10),
    (Metric::Pm25, 0.15),
    (Metric::TravelAdvisoryScore, 0.25),
    (Metric::Temperature, 0.10),
    (Metric::Humidity, 0.10),
];

const LOW: [(Metric, f64); 7] = [
    (Metric::LifeExpectancy, 0.20),
    (Metric::GdpPerCapita, 0.15),
    (Metric::Population, 0.05),
    (Metric::Pm25, 0.20),
    (Metric::TravelAdvisoryScore, 0.35),
    (Metric::Temperature, 0.15),
    (Metric::Humidity, 0.00),
];

const HIGH: [(Metric, f64); 7] = [
    (Metric::LifeExpectancy, 0.20),
    (Metric::GdpPerCapita, 0.30),
    (Metric::Population, 0.15),
    (Metric::Pm25, 0.10),
    (Metric::TravelAdvisoryScore, 0.10),
    (Metric::Temperature, 0.15),
    (Metric::Humidity, 0.00),
];

/// Derive the weight mapping for a (tolerance, duration) pair.
///
/// Starts from the tolerance table, applies the duration multipliers, then
/// renormalizes so the weights sum to 1.0. Renormalization is skipped if the
/// sum is zero, which no reachable table produces.
pub fn weights_for(tolerance: RiskTolerance, duration: StayDuration) -> WeightMapping {
    let table = match tolerance {
        RiskTolerance::Low => &LOW,
        RiskTolerance::Moderate => &MODERATE,
        RiskTolerance::High => &HIGH,
    };
    let mut weights: WeightMapping = table.iter().copied().collect();

    for (metric, weight) in weights.iter_mut() {
        *weight *= duration_multiplier(*metric, duration);
    }

    let total: f64 = weights.values().sum();
    if total > 0.0 {
        for weight in weights.values_mut() {
            *weight /= total;
        }
    }

    weights
}

fn duration_multiplier(metric: Metric, duration: StayDuration) -> f64 {
    match duration {
        StayDuration::ShortTerm => match metric {
            Metric::Temperature => 1.2,
            Metric::Humidity => 1.1,
            Metric::Pm25 => 1.2,
            Metric::TravelAdvisoryScore => 1.2,
            Metric::LifeExpectancy => 0.8,
            Metric::Population => 0.8,
            _ => 1.0,
        },
        StayDuration::LongTerm => match metric {
            Metric::Temperature => 0.8,
            Metric::Humidity => 0.9,
            Metric::Pm25 => 0.9,
            Metric::TravelAdvisoryScore => 0.9,
            Metric::LifeExpectancy => 1.2,
            Metric::Population => 1.2,
            Metric::GdpPerCapita => 1.2,
            _ => 1.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCES: [RiskTolerance; 3] = [
        RiskTolerance::Low,
        RiskTolerance::Moderate,
        RiskTolerance::High,
    ];
    const DURATIONS: [StayDuration; 2] = [StayDuration::ShortTerm, StayDuration::LongTerm];

    #[test]
    fn every_pair_sums_to_one() {
        for tolerance in TOLERANCES {
            for duration in DURATIONS {
                let weights = weights_for(tolerance, duration);
                let total: f64 = weights.values().sum();
                assert!(
                    (total - 1.0).abs() < 1e-9,
                    "{tolerance}/{duration} sums to {total}"
                );
            }
        }
    }

    #[test]
    fn weights_are_non_negative_and_exclude_pm10() {
        for tolerance in TOLERANCES {
            for duration in DURATIONS {
                let weights = weights_for(tolerance, duration);
                assert!(!weights.contains_key(&Metric::Pm10));
                assert!(weights.values().all(|w| *w >= 0.0));
            }
        }
    }

    #[test]
    fn low_tolerance_leans_on_the_advisory() {
        // Low/short-term pre-normalization: advisory 0.35*1.2 = 0.42 out of 1.19.
        let weights = weights_for(RiskTolerance::Low, StayDuration::ShortTerm);
        let advisory = weights[&Metric::TravelAdvisoryScore];
        assert!((advisory - 0.42 / 1.19).abs() < 1e-9);
        assert_eq!(weights[&Metric::Humidity], 0.0);
    }

    #[test]
    fn long_term_shifts_weight_toward_structural_metrics() {
        let short = weights_for(RiskTolerance::Moderate, StayDuration::ShortTerm);
        let long = weights_for(RiskTolerance::Moderate, StayDuration::LongTerm);
        assert!(long[&Metric::LifeExpectancy] > short[&Metric::LifeExpectancy]);
        assert!(long[&Metric::Temperature] < short[&Metric::Temperature]);
    }

    #[test]
    fn high_tolerance_discounts_safety() {
        let low = weights_for(RiskTolerance::Low, StayDuration::LongTerm);
        let high = weights_for(RiskTolerance::High, StayDuration::LongTerm);
        assert!(high[&Metric::TravelAdvisoryScore] < low[&Metric::TravelAdvisoryScore]);
        assert!(high[&Metric::GdpPerCapita] > low[&Metric::GdpPerCapita]);
    }
}
