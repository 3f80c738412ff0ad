//! Orchestration of one country analysis: cache lookup, in-flight
//! deduplication, concurrent provider fan-out, normalization, weighting, and
//! scoring.
//!
//! Per key the request moves Absent -> InFlight -> Cached. The owning fetch
//! runs on a detached task, so a caller that stops waiting does not cancel
//! the computation and the cache still gets populated for later callers.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::CacheConfig;
use crate::providers::{
    AirQualitySample, CountryProviders, EconomicHealth, ProviderError, TravelAdvisory,
    WeatherSample,
};

use super::cache::ResultCache;
use super::domain::{
    request_key, AnalysisOutcome, AnalysisReport, DebugBreakdown, Metric, RawMetrics,
    RiskTolerance, StayDuration, SubScores,
};
use super::inflight::{await_outcome, FetchOutcome, Flight, InFlightRegistry};
use super::normalize::normalize_all;
use super::score::{composite_score, sub_scores};
use super::weights::weights_for;

/// Marker recorded when the identity provider fails outright.
pub const PROFILE_MARKER: &str = "country_profile";
/// Marker recorded when the profile arrives without an ISO2 code.
pub const ISO2_MARKER: &str = "iso2_code";

/// Explicitly constructed analysis service, cloned by handle into every
/// request handler. Lives for the process lifetime; nothing here persists
/// across restarts.
pub struct Aggregator<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for Aggregator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P> {
    providers: Arc<P>,
    cache: ResultCache,
    inflight: InFlightRegistry<AnalysisReport>,
}

impl<P: CountryProviders + 'static> Aggregator<P> {
    pub fn new(providers: Arc<P>, cache_config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                providers,
                cache: ResultCache::from_config(cache_config),
                inflight: InFlightRegistry::default(),
            }),
        }
    }

    /// Analyze one country for the given scoring parameters.
    ///
    /// Cache hits return immediately. A key already being fetched is awaited
    /// rather than refetched. Otherwise this caller owns the fetch pipeline.
    pub async fn analyze(
        &self,
        country_code: &str,
        tolerance: RiskTolerance,
        duration: StayDuration,
        debug_mode: bool,
    ) -> AnalysisOutcome {
        let key = request_key(country_code, tolerance, duration);

        if let Some(report) = self.inner.cache.get(&key) {
            debug!(%key, "cache hit");
            return AnalysisOutcome {
                report: Some(report),
                cache_hit: true,
                missing: Vec::new(),
            };
        }

        match self.inner.inflight.join_or_begin(&key) {
            Flight::Waiter(rx) => match await_outcome(rx).await {
                Some(outcome) => AnalysisOutcome {
                    report: outcome.value,
                    cache_hit: false,
                    missing: outcome.missing,
                },
                None => {
                    error!(%key, "in-flight computation abandoned");
                    AnalysisOutcome::failed(PROFILE_MARKER)
                }
            },
            Flight::Owner(guard) => {
                let task = tokio::spawn({
                    let inner = Arc::clone(&self.inner);
                    let code = country_code.to_string();
                    let key = key.clone();
                    async move {
                        let outcome = inner
                            .fetch_and_build(&code, tolerance, duration, debug_mode)
                            .await;
                        if let Some(report) = &outcome.value {
                            inner.cache.put(key, report.clone());
                        }
                        guard.publish(outcome.clone());
                        outcome
                    }
                });

                match task.await {
                    Ok(outcome) => AnalysisOutcome {
                        report: outcome.value,
                        cache_hit: false,
                        missing: outcome.missing,
                    },
                    Err(join_error) => {
                        // Total-function scoring should make this unreachable;
                        // report the key as failed rather than crash.
                        error!(%key, %join_error, "analysis task panicked");
                        AnalysisOutcome::failed(PROFILE_MARKER)
                    }
                }
            }
        }
    }
}

impl<P: CountryProviders + 'static> Inner<P> {
    /// The fetch pipeline: identity first, then four independent concurrent
    /// fetches, then the pure normalize/weight/score stages.
    async fn fetch_and_build(
        &self,
        country_code: &str,
        tolerance: RiskTolerance,
        duration: StayDuration,
        debug_mode: bool,
    ) -> FetchOutcome<AnalysisReport> {
        let profile = match self.providers.country_profile(country_code).await {
            Ok(profile) => profile,
            Err(err) => {
                error!(%country_code, %err, "country profile fetch failed");
                return FetchOutcome {
                    value: None,
                    missing: vec![PROFILE_MARKER.to_string()],
                };
            }
        };

        if profile.iso2.is_none() {
            error!(%country_code, "country profile has no ISO2 code");
            return FetchOutcome {
                value: None,
                missing: vec![ISO2_MARKER.to_string()],
            };
        }

        // Each fetch is isolated: a failure contributes absent metrics and
        // never cancels its siblings.
        let (econ, advisory, weather, air) = tokio::join!(
            self.providers.economic_health(country_code),
            self.providers.travel_advisory(&profile.country_name),
            self.providers.weather(profile.lat, profile.lon),
            self.providers.air_quality(profile.lat, profile.lon),
        );

        let econ = unwrap_provider(econ, country_code, "economic indicators");
        let advisory = unwrap_provider(advisory, country_code, "travel advisory");
        let weather = unwrap_provider(weather, country_code, "weather");
        let air = unwrap_provider(air, country_code, "air quality");

        let raw = assemble_raw_metrics(profile.population, &econ, &advisory, &weather, &air);
        let missing: Vec<String> = Metric::ALL
            .iter()
            .filter(|metric| !raw.contains_key(metric))
            .map(|metric| metric.to_string())
            .collect();

        let normalized = normalize_all(&raw);
        let weights = weights_for(tolerance, duration);
        let overall_score = composite_score(&normalized, &weights);
        let scores = sub_scores(&normalized);
        let explanation = explanation(overall_score, &scores, tolerance, duration);

        let debug = debug_mode.then(|| DebugBreakdown {
            weights_used: weights,
            raw_metrics: Metric::ALL
                .iter()
                .map(|&metric| (metric, raw.get(&metric).copied()))
                .collect(),
            normalized_metrics: normalized,
        });

        FetchOutcome {
            value: Some(AnalysisReport {
                country_code: country_code.to_string(),
                country_name: profile.country_name,
                overall_score,
                sub_scores: scores,
                explanation,
                debug,
            }),
            missing,
        }
    }
}

fn unwrap_provider<T: Default>(result: Result<T, ProviderError>, code: &str, source: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(country_code = %code, %source, %err, "provider fetch failed, degrading");
            T::default()
        }
    }
}

/// Fold the provider responses into the fixed metric set. The AQI sample
/// feeds both particulate metrics; humidity has no source and stays absent.
fn assemble_raw_metrics(
    population: Option<f64>,
    econ: &EconomicHealth,
    advisory: &TravelAdvisory,
    weather: &WeatherSample,
    air: &AirQualitySample,
) -> RawMetrics {
    let mut raw = RawMetrics::new();
    let mut record = |metric: Metric, value: Option<f64>| {
        if let Some(v) = value {
            raw.insert(metric, v);
        }
    };

    record(Metric::LifeExpectancy, econ.life_expectancy);
    record(Metric::GdpPerCapita, econ.gdp_per_capita);
    record(Metric::Population, population);
    record(Metric::Pm25, air.aqi);
    record(Metric::Pm10, air.aqi);
    record(Metric::TravelAdvisoryScore, advisory.advisory_score);
    record(Metric::Temperature, weather.temperature);
    record(Metric::Humidity, None);

    raw
}

fn explanation(
    overall: f64,
    scores: &SubScores,
    tolerance: RiskTolerance,
    duration: StayDuration,
) -> String {
    format!(
        "Overall score of {overall:.2} based on risk tolerance '{tolerance}' and duration '{duration}'. \
         Travel risk: {travel:.0}, Health infrastructure: {health:.0}, Environmental stability: {env:.0}.",
        travel = scores.travel_risk,
        health = scores.health_infra,
        env = scores.env_stability,
    )
}
