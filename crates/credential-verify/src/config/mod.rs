use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::verification::upload::DEFAULT_MAX_UPLOAD_BYTES;

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
    pub verification: VerificationConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            verification: VerificationConfig::from_env()?,
        })
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

/// Knobs for the verification pipeline: upload limits, OCR engine, and reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationConfig {
    pub max_upload_bytes: u64,
    pub tesseract_cmd: String,
    pub ocr_language: String,
    pub ocr_mode: String,
    pub ocr_timeout: Duration,
    pub status_history_limit: usize,
    pub default_specialization: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            tesseract_cmd: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
            ocr_mode: "--oem 3 --psm 6".to_string(),
            ocr_timeout: Duration::from_secs(30),
            status_history_limit: 5,
            default_specialization: "General Practice".to_string(),
        }
    }
}

impl VerificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_upload_bytes = parse_var("APP_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;
        let ocr_timeout_secs = parse_var("APP_OCR_TIMEOUT_SECS", defaults.ocr_timeout.as_secs())?;
        let status_history_limit =
            parse_var("APP_STATUS_HISTORY_LIMIT", defaults.status_history_limit)?;

        Ok(Self {
            max_upload_bytes,
            tesseract_cmd: env::var("APP_TESSERACT_CMD").unwrap_or(defaults.tesseract_cmd),
            ocr_language: env::var("APP_OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            ocr_mode: env::var("APP_OCR_MODE").unwrap_or(defaults.ocr_mode),
            ocr_timeout: Duration::from_secs(ocr_timeout_secs),
            status_history_limit,
            default_specialization: env::var("APP_DEFAULT_SPECIALIZATION")
                .unwrap_or(defaults.default_specialization),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative integer (found '{value}')")
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
