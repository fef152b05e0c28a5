use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::review::{
    parse_webhook_url, ReviewSettings, TransitionPolicy, UnknownStatusPolicy,
};

const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_AUDIT_FEED_LIMIT: usize = 200;

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

/// Top-level configuration for the review desk service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub review: ReviewConfig,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            review: ReviewConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Review desk knobs: rejection webhook delivery, audit feed size, and status handling.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub fallback_webhook_url: Option<String>,
    pub webhook_timeout: Duration,
    pub audit_feed_limit: usize,
    pub unknown_status: UnknownStatusPolicy,
    pub forward_only: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            fallback_webhook_url: None,
            webhook_timeout: Duration::from_millis(DEFAULT_WEBHOOK_TIMEOUT_MS),
            audit_feed_limit: DEFAULT_AUDIT_FEED_LIMIT,
            unknown_status: UnknownStatusPolicy::Ignore,
            forward_only: false,
        }
    }
}

impl ReviewConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("REVIEW_FALLBACK_WEBHOOK_URL") {
            config.fallback_webhook_url = parse_webhook_url(&raw)
                .map_err(|_| ConfigError::InvalidWebhookUrl(raw.clone()))?;
        }

        if let Ok(raw) = env::var("REVIEW_WEBHOOK_TIMEOUT_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or(ConfigError::InvalidWebhookTimeout(raw.clone()))?;
            config.webhook_timeout = Duration::from_millis(millis);
        }

        if let Ok(raw) = env::var("REVIEW_AUDIT_LIMIT") {
            config.audit_feed_limit = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::InvalidAuditLimit(raw.clone()))?;
        }

        if let Ok(raw) = env::var("REVIEW_UNKNOWN_STATUS") {
            config.unknown_status = match raw.trim().to_ascii_lowercase().as_str() {
                "reject" => UnknownStatusPolicy::Reject,
                "ignore" => UnknownStatusPolicy::Ignore,
                _ => return Err(ConfigError::InvalidUnknownStatusPolicy(raw)),
            };
        }

        if let Ok(raw) = env::var("REVIEW_FORWARD_ONLY") {
            config.forward_only = parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "REVIEW_FORWARD_ONLY",
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn settings(&self) -> ReviewSettings {
        ReviewSettings {
            fallback_webhook_url: self.fallback_webhook_url.clone(),
            audit_feed_limit: self.audit_feed_limit,
            unknown_status: self.unknown_status,
            transition_policy: if self.forward_only {
                TransitionPolicy::ForwardOnly
            } else {
                TransitionPolicy::Permissive
            },
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidWebhookUrl(String),
    InvalidWebhookTimeout(String),
    InvalidAuditLimit(String),
    InvalidUnknownStatusPolicy(String),
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json' (found '{value}')")
            }
            ConfigError::InvalidWebhookUrl(value) => write!(
                f,
                "REVIEW_FALLBACK_WEBHOOK_URL must be an absolute http(s) URL (found '{value}')"
            ),
            ConfigError::InvalidWebhookTimeout(value) => write!(
                f,
                "REVIEW_WEBHOOK_TIMEOUT_MS must be a positive integer (found '{value}')"
            ),
            ConfigError::InvalidAuditLimit(value) => write!(
                f,
                "REVIEW_AUDIT_LIMIT must be a positive integer (found '{value}')"
            ),
            ConfigError::InvalidUnknownStatusPolicy(value) => write!(
                f,
                "REVIEW_UNKNOWN_STATUS must be 'reject' or 'ignore' (found '{value}')"
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be a boolean flag (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "REVIEW_FALLBACK_WEBHOOK_URL",
            "REVIEW_WEBHOOK_TIMEOUT_MS",
            "REVIEW_AUDIT_LIMIT",
            "REVIEW_UNKNOWN_STATUS",
            "REVIEW_FORWARD_ONLY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert!(config.review.fallback_webhook_url.is_none());
        assert_eq!(config.review.webhook_timeout, Duration::from_millis(5_000));
        assert_eq!(config.review.audit_feed_limit, 200);
        assert_eq!(config.review.unknown_status, UnknownStatusPolicy::Ignore);
        assert!(!config.review.forward_only);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn review_settings_follow_env_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REVIEW_FALLBACK_WEBHOOK_URL", "https://hooks.example.com/rejected");
        env::set_var("REVIEW_WEBHOOK_TIMEOUT_MS", "750");
        env::set_var("REVIEW_AUDIT_LIMIT", "25");
        env::set_var("REVIEW_UNKNOWN_STATUS", "reject");
        env::set_var("REVIEW_FORWARD_ONLY", "true");

        let config = AppConfig::load().expect("config loads");
        let settings = config.review.settings();
        reset_env();

        assert_eq!(
            settings.fallback_webhook_url.as_deref(),
            Some("https://hooks.example.com/rejected")
        );
        assert_eq!(config.review.webhook_timeout, Duration::from_millis(750));
        assert_eq!(settings.audit_feed_limit, 25);
        assert_eq!(settings.unknown_status, UnknownStatusPolicy::Reject);
        assert_eq!(settings.transition_policy, TransitionPolicy::ForwardOnly);
    }

    #[test]
    fn rejects_relative_fallback_webhook() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REVIEW_FALLBACK_WEBHOOK_URL", "/hooks/rejected");
        let result = AppConfig::load();
        reset_env();

        match result {
            Err(ConfigError::InvalidWebhookUrl(value)) => assert_eq!(value, "/hooks/rejected"),
            other => panic!("expected invalid webhook url, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_log_format() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LOG_FORMAT", "xml");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(result, Err(ConfigError::InvalidLogFormat(_))));
    }
}
