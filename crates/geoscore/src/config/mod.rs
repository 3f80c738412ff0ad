use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub cache: CacheConfig,
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cache = CacheConfig {
            capacity: parse_env("APP_CACHE_CAPACITY", CacheConfig::DEFAULT_CAPACITY)?,
            ttl: Duration::from_secs(parse_env(
                "APP_CACHE_TTL_SECS",
                CacheConfig::DEFAULT_TTL_SECS,
            )?),
        };

        let providers = ProvidersConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            cache,
            providers,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bounds for the in-memory analysis result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl CacheConfig {
    pub const DEFAULT_CAPACITY: usize = 100;
    pub const DEFAULT_TTL_SECS: u64 = 3600;
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            ttl: Duration::from_secs(Self::DEFAULT_TTL_SECS),
        }
    }
}

/// Upstream endpoints and timeouts for the external data providers.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub rest_countries_url: String,
    pub world_bank_url: String,
    pub weather_url: String,
    pub air_quality_url: String,
    pub travel_advisory_url: String,
    /// Timeout for profile and indicator calls.
    pub request_timeout: Duration,
    /// Timeout for the advisory RSS feed, which is slower than the JSON APIs.
    pub feed_timeout: Duration,
}

impl ProvidersConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rest_countries_url: env::var("APP_REST_COUNTRIES_URL")
                .unwrap_or_else(|_| "https://restcountries.com/v3.1/alpha".to_string()),
            world_bank_url: env::var("APP_WORLD_BANK_URL")
                .unwrap_or_else(|_| "https://api.worldbank.org/v2/country".to_string()),
            weather_url: env::var("APP_WEATHER_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            air_quality_url: env::var("APP_AIR_QUALITY_URL").unwrap_or_else(|_| {
                "https://air-quality-api.open-meteo.com/v1/air-quality".to_string()
            }),
            travel_advisory_url: env::var("APP_TRAVEL_ADVISORY_URL")
                .unwrap_or_else(|_| "https://travel.state.gov/_res/rss/TAsTWs.xml".to_string()),
            request_timeout: Duration::from_secs(parse_env("APP_PROVIDER_TIMEOUT_SECS", 10)?),
            feed_timeout: Duration::from_secs(parse_env("APP_FEED_TIMEOUT_SECS", 20)?),
        })
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self::from_env().expect("default provider configuration is valid")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_addr_accepts_localhost_alias() {
        let server = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
        };
        let addr = server.socket_addr().expect("localhost resolves");
        assert_eq!(addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn socket_addr_rejects_hostnames() {
        let server = ServerConfig {
            host: "not-an-ip".to_string(),
            port: 8080,
        };
        assert!(server.socket_addr().is_err());
    }

    #[test]
    fn cache_defaults_match_documented_bounds() {
        let cache = CacheConfig::default();
        assert_eq!(cache.capacity, 100);
        assert_eq!(cache.ttl, Duration::from_secs(3600));
    }
}
