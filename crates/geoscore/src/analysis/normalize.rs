//! Normalization of raw provider measurements onto a common `[0, 1]`
//! favorability scale.
//!
//! Every function here is total: a missing raw value maps to a fixed
//! per-metric fallback, never an error. The constants are calibration
//! decisions and are relied on by the weighting tables; change them together
//! or not at all.

use super::domain::{Metric, NormalizedMetrics, RawMetrics};

/// Fallback when a metric has no data. Most metrics assume an indifferent
/// midpoint; missing safety data is treated as riskier than unknown.
pub fn fallback(metric: Metric) -> f64 {
    match metric {
        Metric::TravelAdvisoryScore => 0.2,
        _ => 0.5,
    }
}

/// Map one raw value to `[0, 1]`, falling back when absent.
pub fn normalize(metric: Metric, value: Option<f64>) -> f64 {
    let Some(v) = value else {
        return fallback(metric);
    };

    match metric {
        Metric::LifeExpectancy => ((v - 50.0) / 35.0).clamp(0.0, 1.0),
        Metric::GdpPerCapita => (v / 80_000.0).min(1.0),
        Metric::Population => 1.0 - (v / 1_500_000_000.0).min(1.0),
        Metric::Pm25 | Metric::Pm10 => 1.0 - (v / 100.0).min(1.0),
        // Advisory scores arrive on a 0-100 scale, 100 being the most severe.
        Metric::TravelAdvisoryScore => 1.0 - v / 100.0,
        Metric::Temperature => normalize_temperature(v),
        // No upstream currently supplies humidity.
        Metric::Humidity => 0.5,
    }
}

/// Comfort band 15-28 C scores 1.0; outside it the score decays linearly,
/// reaching zero at 0 C on the cold side and 40 C on the hot side.
fn normalize_temperature(v: f64) -> f64 {
    if (15.0..=28.0).contains(&v) {
        1.0
    } else if v < 15.0 {
        (1.0 - (15.0 - v) / 15.0).max(0.0)
    } else {
        (1.0 - (v - 28.0) / 12.0).max(0.0)
    }
}

/// Normalize every metric in the fixed set, substituting fallbacks for
/// anything absent from `raw`.
pub fn normalize_all(raw: &RawMetrics) -> NormalizedMetrics {
    Metric::ALL
        .iter()
        .map(|&metric| (metric, normalize(metric, raw.get(&metric).copied())))
        .collect()
}
