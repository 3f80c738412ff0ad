use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed set of metrics feeding the composite score.
///
/// Every provider response is reduced to entries of this set; nothing outside
/// it participates in normalization or weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    LifeExpectancy,
    GdpPerCapita,
    Population,
    Pm25,
    Pm10,
    TravelAdvisoryScore,
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::LifeExpectancy,
        Metric::GdpPerCapita,
        Metric::Population,
        Metric::Pm25,
        Metric::Pm10,
        Metric::TravelAdvisoryScore,
        Metric::Temperature,
        Metric::Humidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::LifeExpectancy => "life_expectancy",
            Metric::GdpPerCapita => "gdp_per_capita",
            Metric::Population => "population",
            Metric::Pm25 => "pm25",
            Metric::Pm10 => "pm10",
            Metric::TravelAdvisoryScore => "travel_advisory_score",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw metric values as fetched; a missing metric is an absent key.
pub type RawMetrics = BTreeMap<Metric, f64>;

/// Metric values rescaled to `[0, 1]`, 1.0 meaning most favorable. Every
/// metric in [`Metric::ALL`] is present.
pub type NormalizedMetrics = BTreeMap<Metric, f64>;

/// Per-metric weights; sums to 1.0 after renormalization.
pub type WeightMapping = BTreeMap<Metric, f64>;

/// How much upstream risk the requester is willing to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Moderate,
    High,
}

impl RiskTolerance {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Planned length of stay; shifts weight between climate comfort and
/// structural indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StayDuration {
    #[serde(rename = "short-term")]
    ShortTerm,
    #[serde(rename = "long-term")]
    LongTerm,
}

impl StayDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            StayDuration::ShortTerm => "short-term",
            StayDuration::LongTerm => "long-term",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "short-term" => Some(Self::ShortTerm),
            "long-term" => Some(Self::LongTerm),
            _ => None,
        }
    }
}

impl fmt::Display for StayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache and in-flight key. Identical triples must share one cache entry and
/// at most one underlying fetch.
pub fn request_key(country_code: &str, tolerance: RiskTolerance, duration: StayDuration) -> String {
    format!("{}_{}_{}", country_code, tolerance, duration)
}

/// Sub-scores on a 0-100 scale, rounded to whole numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub travel_risk: f64,
    pub health_infra: f64,
    pub env_stability: f64,
}

/// Auxiliary payload attached when the request asks for debug output. Never
/// read by the scoring path itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugBreakdown {
    pub weights_used: WeightMapping,
    pub raw_metrics: BTreeMap<Metric, Option<f64>>,
    pub normalized_metrics: NormalizedMetrics,
}

/// Immutable per-country analysis result. Rank is assigned by the boundary
/// after the full result set is sorted, so it is not part of this entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub country_code: String,
    pub country_name: String,
    pub overall_score: f64,
    pub sub_scores: SubScores,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugBreakdown>,
}

/// What one `analyze` call produced. `report` is `None` when the country's
/// identity data could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub report: Option<AnalysisReport>,
    pub cache_hit: bool,
    pub missing: Vec<String>,
}

impl AnalysisOutcome {
    pub(crate) fn failed(marker: &str) -> Self {
        Self {
            report: None,
            cache_hit: false,
            missing: vec![marker.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_joins_the_identity_triple() {
        let key = request_key("FRA", RiskTolerance::Low, StayDuration::ShortTerm);
        assert_eq!(key, "FRA_low_short-term");
    }

    #[test]
    fn metric_serde_names_are_snake_case() {
        let json = serde_json::to_string(&Metric::TravelAdvisoryScore).expect("serializes");
        assert_eq!(json, "\"travel_advisory_score\"");
    }

    #[test]
    fn duration_round_trips_kebab_case() {
        let parsed: StayDuration = serde_json::from_str("\"short-term\"").expect("parses");
        assert_eq!(parsed, StayDuration::ShortTerm);
        assert_eq!(StayDuration::parse("LONG-TERM"), Some(StayDuration::LongTerm));
    }
}
