use serde::Deserialize;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Bridge to the persistence layer's pool configuration.
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Group membership API client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the group membership API.
    pub base_url: String,

    /// Bearer token for the bot account.
    pub token: String,

    /// The bot's own member id, used for the role authority ceiling.
    pub bot_member_id: i64,

    #[serde(default = "default_gateway_timeout")]
    pub request_timeout_secs: u64,

    /// Outbound request budget toward the platform.
    #[serde(default = "default_gateway_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Bounded retry attempts for transient failures.
    #[serde(default = "default_gateway_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    #[serde(default = "default_gateway_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

/// Attribution and reconciliation policy.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Groups this deployment tracks.
    #[serde(default)]
    pub group_ids: Vec<i64>,

    /// Accounts younger than this at join time are credited as fake.
    #[serde(default = "default_min_account_age_hours")]
    pub min_account_age_hours: i64,

    /// Whether unearned held roles are removed. Disable to make ranks
    /// sticky.
    #[serde(default = "default_demotion_enabled")]
    pub demotion_enabled: bool,

    /// Minutes between invite registry refreshes.
    #[serde(default = "default_invite_sync_minutes")]
    pub invite_sync_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_host")]
    pub host: String,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_metrics_host(),
            port: default_metrics_port(),
        }
    }
}

impl MetricsConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid metrics listen address {}:{}",
                    self.host, self.port
                ))
            })
    }
}

// Default value functions
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_gateway_timeout() -> u64 {
    10
}
fn default_gateway_rate_limit() -> u32 {
    50
}
fn default_gateway_max_retries() -> u32 {
    3
}
fn default_gateway_retry_base_delay() -> u64 {
    500
}
fn default_min_account_age_hours() -> i64 {
    24
}
fn default_demotion_enabled() -> bool {
    true
}
fn default_invite_sync_minutes() -> u64 {
    10
}
fn default_metrics_host() -> String {
    "0.0.0.0".to_string()
}
fn default_metrics_port() -> u16 {
    9187
}

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with IT__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("IT").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "IT__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.gateway.base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "IT__GATEWAY__BASE_URL environment variable must be set".to_string(),
            ));
        }

        if self.gateway.token.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "IT__GATEWAY__TOKEN environment variable must be set".to_string(),
            ));
        }

        if self.gateway.rate_limit_per_minute == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "gateway rate_limit_per_minute cannot be 0".to_string(),
            ));
        }

        if self.tracking.min_account_age_hours < 0 {
            return Err(ConfigValidationError::InvalidValue(
                "min_account_age_hours cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config entirely from embedded defaults and overrides,
    /// without touching the file system.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [database]
            url = "postgres://localhost/invite_tracker_test"

            [logging]
            level = "info"
            format = "json"

            [gateway]
            base_url = "http://localhost:9000"
            token = "test-token"
            bot_member_id = 1

            [tracking]
            group_ids = []
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = Config::load_for_test(&[]).unwrap();
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.gateway.max_retries, 3);
        assert_eq!(config.tracking.min_account_age_hours, 24);
        assert!(config.tracking.demotion_enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = Config::load_for_test(&[
            ("tracking.demotion_enabled", "false"),
            ("gateway.max_retries", "5"),
        ])
        .unwrap();
        assert!(!config.tracking.demotion_enabled);
        assert_eq!(config.gateway.max_retries, 5);
    }

    #[test]
    fn test_validate_rejects_empty_database_url() {
        let config = Config::load_for_test(&[("database.url", "")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_rate_limit() {
        let config =
            Config::load_for_test(&[("gateway.rate_limit_per_minute", "0")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_socket_addr() {
        let config = Config::load_for_test(&[
            ("metrics.enabled", "true"),
            ("metrics.host", "127.0.0.1"),
            ("metrics.port", "9300"),
        ])
        .unwrap();
        let addr = config.metrics.socket_addr().unwrap();
        assert_eq!(addr.port(), 9300);
    }

    #[test]
    fn test_pool_config_bridge() {
        let config = Config::load_for_test(&[("database.max_connections", "7")]).unwrap();
        let pool_config = config.database.pool_config();
        assert_eq!(pool_config.max_connections, 7);
        assert_eq!(pool_config.url, config.database.url);
    }
}
