use crate::onboarding::validators::AgeBounds;
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
    pub onboarding: OnboardingConfig,
    pub geocoder: GeocoderConfig,
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

        let minimum_age = numeric_var("ONBOARDING_MINIMUM_AGE", 18)?;
        let maximum_age = numeric_var("ONBOARDING_MAXIMUM_AGE", 118)?;
        if minimum_age > maximum_age {
            return Err(ConfigError::InvalidAgeRange {
                minimum: minimum_age,
                maximum: maximum_age,
            });
        }
        let auto_advance_ms = numeric_var("ONBOARDING_AUTO_ADVANCE_MS", 300)?;

        let base_url = env::var("GEOCODER_BASE_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());
        let debounce_ms = numeric_var("GEOCODER_DEBOUNCE_MS", 300)?;
        let result_limit = numeric_var("GEOCODER_RESULT_LIMIT", 5)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            onboarding: OnboardingConfig {
                minimum_age,
                maximum_age,
                auto_advance_delay: Duration::from_millis(auto_advance_ms as u64),
            },
            geocoder: GeocoderConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                debounce: Duration::from_millis(debounce_ms as u64),
                result_limit,
            },
        })
    }
}

fn numeric_var(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Wizard tuning shared by every onboarding flow.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    pub minimum_age: u32,
    pub maximum_age: u32,
    pub auto_advance_delay: Duration,
}

impl OnboardingConfig {
    pub fn age_bounds(&self) -> AgeBounds {
        AgeBounds {
            minimum: self.minimum_age,
            maximum: self.maximum_age,
        }
    }
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            minimum_age: 18,
            maximum_age: 118,
            auto_advance_delay: Duration::from_millis(300),
        }
    }
}

/// Location suggestion provider settings.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub debounce: Duration,
    pub result_limit: u32,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidAgeRange { minimum: u32, maximum: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer (got '{value}')")
            }
            ConfigError::InvalidAgeRange { minimum, maximum } => write!(
                f,
                "ONBOARDING_MINIMUM_AGE ({minimum}) must not exceed ONBOARDING_MAXIMUM_AGE ({maximum})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidAgeRange { .. } => None,
        }
    }
}
