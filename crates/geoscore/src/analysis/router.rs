//! HTTP surface for the analysis pipeline: request validation, concurrent
//! fan-out across the requested countries, ranking, and response metadata
//! assembly. Ranks depend on the full sorted result set, so they are assigned
//! here and never inside the per-country pipeline.

use std::collections::BTreeSet;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;
use crate::providers::CountryProviders;

use super::aggregator::{Aggregator, PROFILE_MARKER};
use super::domain::{AnalysisReport, RiskTolerance, StayDuration, SubScores};

const MIN_COUNTRIES: usize = 3;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub countries: Vec<String>,
    pub risk_tolerance: RiskTolerance,
    pub duration: StayDuration,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Serialize)]
pub struct RankedResult {
    pub rank: usize,
    #[serde(flatten)]
    pub report: AnalysisReport,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeMetadata {
    pub cache_hits: Vec<String>,
    pub cache_misses: Vec<String>,
    pub missing_metrics: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub results: Vec<RankedResult>,
    pub metadata: AnalyzeMetadata,
}

/// Router builder exposing the analysis endpoint.
pub fn analyze_router<P: CountryProviders + 'static>(aggregator: Aggregator<P>) -> Router {
    Router::new()
        .route("/api/v1/analyze", post(analyze_handler::<P>))
        .with_state(aggregator)
}

pub(crate) async fn analyze_handler<P: CountryProviders + 'static>(
    State(aggregator): State<Aggregator<P>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let countries = validate_countries(request.countries)?;
    let response = run_analysis(
        &aggregator,
        &countries,
        request.risk_tolerance,
        request.duration,
        request.debug,
    )
    .await;
    Ok(Json(response))
}

/// ISO3 codes: exactly three ASCII letters, uppercased; at least three
/// countries so the ranking is meaningful.
pub fn validate_countries(raw: Vec<String>) -> Result<Vec<String>, AppError> {
    if raw.len() < MIN_COUNTRIES {
        return Err(AppError::InvalidRequest(format!(
            "at least {MIN_COUNTRIES} countries required"
        )));
    }

    raw.into_iter()
        .map(|code| {
            let trimmed = code.trim();
            if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
                Ok(trimmed.to_ascii_uppercase())
            } else {
                Err(AppError::InvalidRequest(format!(
                    "'{code}' is not an ISO3 country code (e.g. FRA, JPN)"
                )))
            }
        })
        .collect()
}

/// Fan the analysis out across all requested countries, then rank survivors
/// by overall score descending. Identity failures are dropped from the
/// results but listed in the missing-metrics metadata by country code.
pub async fn run_analysis<P: CountryProviders + 'static>(
    aggregator: &Aggregator<P>,
    countries: &[String],
    tolerance: RiskTolerance,
    duration: StayDuration,
    debug: bool,
) -> AnalyzeResponse {
    let tasks: Vec<_> = countries
        .iter()
        .map(|code| {
            let aggregator = aggregator.clone();
            let code = code.clone();
            tokio::spawn(async move {
                let outcome = aggregator.analyze(&code, tolerance, duration, debug).await;
                (code, outcome)
            })
        })
        .collect();

    let mut reports = Vec::new();
    let mut cache_hits = Vec::new();
    let mut cache_misses = Vec::new();
    let mut missing: BTreeSet<String> = BTreeSet::new();

    for task in tasks {
        let (code, outcome) = match task.await {
            Ok(entry) => entry,
            Err(join_error) => {
                warn!(%join_error, "country analysis task failed");
                missing.insert(PROFILE_MARKER.to_string());
                continue;
            }
        };

        missing.extend(outcome.missing);

        let Some(report) = outcome.report else {
            missing.insert(code);
            continue;
        };

        if outcome.cache_hit {
            cache_hits.push(code);
        } else {
            cache_misses.push(code);
        }
        reports.push(report);
    }

    reports.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));

    let results: Vec<RankedResult> = reports
        .into_iter()
        .enumerate()
        .map(|(index, report)| RankedResult {
            rank: index + 1,
            report,
        })
        .collect();

    info!(
        ranked = results.len(),
        cache_hits = cache_hits.len(),
        "analysis complete"
    );

    AnalyzeResponse {
        results,
        metadata: AnalyzeMetadata {
            cache_hits,
            cache_misses,
            missing_metrics: missing.into_iter().collect(),
        },
    }
}

/// Render one ranked result as a single console line for the CLI surface.
pub fn format_ranked_line(result: &RankedResult) -> String {
    let SubScores {
        travel_risk,
        health_infra,
        env_stability,
    } = result.report.sub_scores;
    format!(
        "{:>2}. {} ({}) score {:.2} | risk {:.0} health {:.0} environment {:.0}",
        result.rank,
        result.report.country_name,
        result.report.country_code,
        result.report.overall_score,
        travel_risk,
        health_infra,
        env_stability,
    )
}
