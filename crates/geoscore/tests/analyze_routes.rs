use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use geoscore::analysis::{analyze_router, Aggregator};
use geoscore::config::CacheConfig;
use geoscore::providers::{
    AirQualitySample, CountryProfile, CountryProviders, EconomicHealth, ProviderError,
    TravelAdvisory, WeatherSample,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Providers that differentiate countries by GDP so the ranking is
/// deterministic, and fail identity lookups for unknown codes.
struct RankedStub {
    gdp_by_code: HashMap<&'static str, f64>,
}

impl RankedStub {
    fn new() -> Self {
        let mut gdp_by_code = HashMap::new();
        gdp_by_code.insert("AAA", 20_000.0);
        gdp_by_code.insert("BBB", 80_000.0);
        gdp_by_code.insert("CCC", 0.0);
        Self { gdp_by_code }
    }
}

#[async_trait]
impl CountryProviders for RankedStub {
    async fn country_profile(&self, iso3: &str) -> Result<CountryProfile, ProviderError> {
        if !self.gdp_by_code.contains_key(iso3) {
            return Err(ProviderError::NotFound {
                code: iso3.to_string(),
            });
        }
        Ok(CountryProfile {
            country_name: format!("Country {iso3}"),
            iso2: Some(iso3[..2].to_string()),
            lat: 10.0,
            lon: 20.0,
            population: Some(50_000_000.0),
        })
    }

    async fn economic_health(&self, iso3: &str) -> Result<EconomicHealth, ProviderError> {
        Ok(EconomicHealth {
            life_expectancy: Some(78.0),
            gdp_per_capita: self.gdp_by_code.get(iso3).copied(),
        })
    }

    async fn travel_advisory(&self, _name: &str) -> Result<TravelAdvisory, ProviderError> {
        Ok(TravelAdvisory {
            advisory_score: Some(50.0),
        })
    }

    async fn weather(&self, _lat: f64, _lon: f64) -> Result<WeatherSample, ProviderError> {
        Ok(WeatherSample {
            temperature: Some(20.0),
        })
    }

    async fn air_quality(&self, _lat: f64, _lon: f64) -> Result<AirQualitySample, ProviderError> {
        Ok(AirQualitySample { aqi: Some(40.0) })
    }
}

fn app() -> axum::Router {
    let aggregator = Aggregator::new(Arc::new(RankedStub::new()), &CacheConfig::default());
    analyze_router(aggregator)
}

fn analyze_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

#[tokio::test]
async fn analyze_ranks_countries_by_score_descending() {
    let response = app()
        .oneshot(analyze_request(json!({
            "countries": ["aaa", "bbb", "ccc"],
            "risk_tolerance": "moderate",
            "duration": "long-term"
        })))
        .await
        .expect("handler responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let results = body["results"].as_array().expect("results array");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["country_code"], "BBB");
    assert_eq!(results[1]["country_code"], "AAA");
    assert_eq!(results[2]["country_code"], "CCC");
    for (index, result) in results.iter().enumerate() {
        assert_eq!(result["rank"], (index + 1) as u64);
    }

    let scores: Vec<f64> = results
        .iter()
        .map(|r| r["overall_score"].as_f64().expect("score"))
        .collect();
    assert!(scores[0] > scores[1] && scores[1] > scores[2]);

    // Humidity never has a source.
    let missing = body["metadata"]["missing_metrics"]
        .as_array()
        .expect("missing metrics");
    assert_eq!(missing, &vec![json!("humidity")]);
    assert_eq!(
        body["metadata"]["cache_misses"].as_array().expect("misses").len(),
        3
    );
    assert!(body["metadata"]["cache_hits"]
        .as_array()
        .expect("hits")
        .is_empty());
}

#[tokio::test]
async fn repeated_requests_partition_into_cache_hits() {
    let app = app();
    let request = || {
        analyze_request(json!({
            "countries": ["AAA", "BBB", "CCC"],
            "risk_tolerance": "low",
            "duration": "short-term"
        }))
    };

    let first = app.clone().oneshot(request()).await.expect("first call");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(request()).await.expect("second call");
    let body = body_json(second).await;
    assert_eq!(
        body["metadata"]["cache_hits"].as_array().expect("hits").len(),
        3
    );
    assert!(body["metadata"]["cache_misses"]
        .as_array()
        .expect("misses")
        .is_empty());
}

#[tokio::test]
async fn identity_failures_are_listed_but_not_ranked() {
    let response = app()
        .oneshot(analyze_request(json!({
            "countries": ["AAA", "BBB", "ZZZ"],
            "risk_tolerance": "high",
            "duration": "short-term"
        })))
        .await
        .expect("handler responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["results"].as_array().expect("results").len(), 2);
    let missing = body["metadata"]["missing_metrics"]
        .as_array()
        .expect("missing metrics");
    assert!(missing.contains(&json!("ZZZ")));
    assert!(missing.contains(&json!("country_profile")));
}

#[tokio::test]
async fn validation_rejects_malformed_country_lists() {
    let too_few = app()
        .oneshot(analyze_request(json!({
            "countries": ["AAA", "BBB"],
            "risk_tolerance": "moderate",
            "duration": "short-term"
        })))
        .await
        .expect("handler responds");
    assert_eq!(too_few.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let bad_code = app()
        .oneshot(analyze_request(json!({
            "countries": ["AAA", "BBB", "C3PO"],
            "risk_tolerance": "moderate",
            "duration": "short-term"
        })))
        .await
        .expect("handler responds");
    assert_eq!(bad_code.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(bad_code).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("ISO3"));
}

#[tokio::test]
async fn debug_flag_surfaces_the_breakdown_in_the_response() {
    let response = app()
        .oneshot(analyze_request(json!({
            "countries": ["AAA", "BBB", "CCC"],
            "risk_tolerance": "moderate",
            "duration": "long-term",
            "debug": true
        })))
        .await
        .expect("handler responds");

    let body = body_json(response).await;
    let first = &body["results"][0];
    assert!(first["debug"]["weights_used"].is_object());
    assert!(first["debug"]["normalized_metrics"]["temperature"].is_number());
}
