//! External data providers the aggregation pipeline consumes.
//!
//! Each provider is independent and unreliable; the trait methods return
//! per-call `Result`s so the aggregator can degrade one source at a time.
//! `Option` fields inside successful responses mean the upstream answered but
//! had no data for that indicator.

mod http;

pub use http::HttpProviders;

use async_trait::async_trait;

/// Identity and location data for a country, keyed by ISO3 code.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryProfile {
    pub country_name: String,
    pub iso2: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub population: Option<f64>,
}

/// Health and economic indicators from the statistics provider.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EconomicHealth {
    pub life_expectancy: Option<f64>,
    pub gdp_per_capita: Option<f64>,
}

/// Advisory severity on a 0-100 scale, 100 being the most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TravelAdvisory {
    pub advisory_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeatherSample {
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AirQualitySample {
    pub aqi: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned status {status}")]
    Status { status: u16 },
    #[error("no data for country '{code}'")]
    NotFound { code: String },
    #[error("malformed payload: {0}")]
    Decode(String),
    #[error("advisory feed unreadable: {0}")]
    Feed(#[from] rss::Error),
}

/// The five upstream fetches the aggregator fans out over.
#[async_trait]
pub trait CountryProviders: Send + Sync {
    /// Country identity and coordinates. Required before any other fetch;
    /// its failure aborts the country's analysis.
    async fn country_profile(&self, iso3: &str) -> Result<CountryProfile, ProviderError>;

    async fn economic_health(&self, iso3: &str) -> Result<EconomicHealth, ProviderError>;

    async fn travel_advisory(&self, country_name: &str) -> Result<TravelAdvisory, ProviderError>;

    async fn weather(&self, lat: f64, lon: f64) -> Result<WeatherSample, ProviderError>;

    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirQualitySample, ProviderError>;
}
