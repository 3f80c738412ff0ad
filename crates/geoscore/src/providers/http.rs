//! HTTP implementation of [`CountryProviders`] against the real upstreams:
//! REST Countries for identity, the World Bank for indicators, the US State
//! Department RSS feed for advisories, and Open-Meteo for weather and air
//! quality.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProvidersConfig;

use super::{
    AirQualitySample, CountryProfile, CountryProviders, EconomicHealth, ProviderError,
    TravelAdvisory, WeatherSample,
};

const LIFE_EXPECTANCY_INDICATOR: &str = "SP.DYN.LE00.IN";
const GDP_PER_CAPITA_INDICATOR: &str = "NY.GDP.PCAP.CD";

/// Shared reqwest client over all five upstreams. No retries anywhere; a
/// timeout or error surfaces as a per-provider failure.
#[derive(Debug, Clone)]
pub struct HttpProviders {
    client: reqwest::Client,
    config: ProvidersConfig,
}

impl HttpProviders {
    pub fn new(config: ProvidersConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(%url, "provider request");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// First non-null observation of a World Bank indicator series, newest
    /// first, or `None` if the country has no data for it.
    async fn world_bank_indicator(
        &self,
        iso3: &str,
        indicator: &str,
    ) -> Result<Option<f64>, ProviderError> {
        let url = format!(
            "{}/{}/indicator/{}?format=json",
            self.config.world_bank_url, iso3, indicator
        );
        // The payload is a two-element array: pagination metadata, then the
        // observation list (null when the indicator is unknown).
        let payload: Vec<serde_json::Value> = self.get_json(&url).await?;
        let Some(series) = payload.get(1) else {
            return Ok(None);
        };
        let entries: Vec<WorldBankEntry> = match serde_json::from_value(series.clone()) {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };

        Ok(entries.into_iter().find_map(|entry| entry.value))
    }
}

#[derive(Debug, Deserialize)]
struct WorldBankEntry {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RestCountry {
    name: RestCountryName,
    #[serde(default)]
    cca2: Option<String>,
    #[serde(default)]
    latlng: Vec<f64>,
    #[serde(default)]
    population: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RestCountryName {
    common: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    #[serde(default)]
    hourly: Option<AirQualityHourly>,
}

#[derive(Debug, Deserialize)]
struct AirQualityHourly {
    #[serde(default)]
    us_aqi: Vec<Option<f64>>,
}

#[async_trait]
impl CountryProviders for HttpProviders {
    async fn country_profile(&self, iso3: &str) -> Result<CountryProfile, ProviderError> {
        let url = format!("{}/{}", self.config.rest_countries_url, iso3);
        let matches: Vec<RestCountry> = self.get_json(&url).await?;
        let country = matches.into_iter().next().ok_or_else(|| ProviderError::NotFound {
            code: iso3.to_string(),
        })?;

        Ok(CountryProfile {
            country_name: country.name.common,
            iso2: country.cca2,
            lat: country.latlng.first().copied().unwrap_or(0.0),
            lon: country.latlng.get(1).copied().unwrap_or(0.0),
            population: country.population,
        })
    }

    async fn economic_health(&self, iso3: &str) -> Result<EconomicHealth, ProviderError> {
        let life_expectancy = self
            .world_bank_indicator(iso3, LIFE_EXPECTANCY_INDICATOR)
            .await?;
        let gdp_per_capita = self
            .world_bank_indicator(iso3, GDP_PER_CAPITA_INDICATOR)
            .await?;

        if life_expectancy.is_none() {
            warn!(%iso3, "no life expectancy observations");
        }
        if gdp_per_capita.is_none() {
            warn!(%iso3, "no GDP per capita observations");
        }

        Ok(EconomicHealth {
            life_expectancy,
            gdp_per_capita,
        })
    }

    async fn travel_advisory(&self, country_name: &str) -> Result<TravelAdvisory, ProviderError> {
        debug!(url = %self.config.travel_advisory_url, "advisory feed request");
        let response = self
            .client
            .get(&self.config.travel_advisory_url)
            .timeout(self.config.feed_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let channel = rss::Channel::read_from(&body[..])?;

        let needle = country_name.to_lowercase();
        for item in channel.items() {
            let title_matches = item
                .title()
                .map(|title| title.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !title_matches {
                continue;
            }

            for category in item.categories() {
                if category.domain() != Some("Threat-Level") {
                    continue;
                }
                if let Some(level) = parse_threat_level(category.name()) {
                    return Ok(TravelAdvisory {
                        advisory_score: Some(level / 4.0 * 100.0),
                    });
                }
            }
        }

        warn!(%country_name, "no advisory entry in feed");
        Ok(TravelAdvisory::default())
    }

    async fn weather(&self, lat: f64, lon: f64) -> Result<WeatherSample, ProviderError> {
        let url = format!(
            "{}?latitude={}&longitude={}&current_weather=true",
            self.config.weather_url, lat, lon
        );
        let forecast: ForecastResponse = self.get_json(&url).await?;
        Ok(WeatherSample {
            temperature: forecast.current_weather.and_then(|w| w.temperature),
        })
    }

    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirQualitySample, ProviderError> {
        let url = format!(
            "{}?latitude={}&longitude={}&hourly=us_aqi",
            self.config.air_quality_url, lat, lon
        );
        let payload: AirQualityResponse = self.get_json(&url).await?;
        let aqi = payload
            .hourly
            .map(|hourly| hourly.us_aqi)
            .unwrap_or_default()
            .into_iter()
            .rev()
            .flatten()
            .next();
        Ok(AirQualitySample { aqi })
    }
}

/// Extract the numeric level from a "Level N: ..." threat category.
fn parse_threat_level(text: &str) -> Option<f64> {
    let prefix = text.split(':').next()?.trim();
    let mut parts = prefix.split_whitespace();
    if !parts.next()?.eq_ignore_ascii_case("level") {
        return None;
    }
    parts.next()?.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_level_parses_the_feed_format() {
        assert_eq!(
            parse_threat_level("Level 2: Exercise Increased Caution"),
            Some(2.0)
        );
        assert_eq!(parse_threat_level("Level 4: Do Not Travel"), Some(4.0));
        assert_eq!(parse_threat_level("Advisory"), None);
        assert_eq!(parse_threat_level("Level allclear"), None);
    }

    #[test]
    fn rest_country_payload_deserializes() {
        let raw = r#"[{
            "name": {"common": "France", "official": "French Republic"},
            "cca2": "FR",
            "latlng": [46.0, 2.0],
            "population": 67391582
        }]"#;
        let matches: Vec<RestCountry> = serde_json::from_str(raw).expect("payload parses");
        assert_eq!(matches[0].name.common, "France");
        assert_eq!(matches[0].cca2.as_deref(), Some("FR"));
        assert_eq!(matches[0].latlng, vec![46.0, 2.0]);
    }

    #[test]
    fn world_bank_series_skips_null_observations() {
        let raw = r#"[{"value": null}, {"value": null}, {"value": 82.5}]"#;
        let entries: Vec<WorldBankEntry> = serde_json::from_str(raw).expect("series parses");
        let first = entries.into_iter().find_map(|entry| entry.value);
        assert_eq!(first, Some(82.5));
    }

    #[test]
    fn air_quality_takes_the_latest_non_null_sample() {
        let raw = r#"{"hourly": {"us_aqi": [30.0, 42.0, null]}}"#;
        let payload: AirQualityResponse = serde_json::from_str(raw).expect("payload parses");
        let aqi = payload
            .hourly
            .map(|hourly| hourly.us_aqi)
            .unwrap_or_default()
            .into_iter()
            .rev()
            .flatten()
            .next();
        assert_eq!(aqi, Some(42.0));
    }
}
