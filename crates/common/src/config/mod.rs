//! Configuration management for Peerview services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! Loaded once at startup and shared read-only behind an Arc; components
//! receive the sections they need at construction time.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Authentication configuration (tokens + registration whitelist)
    pub auth: AuthConfig,

    /// Object storage collaborator configuration
    pub storage: StorageConfig,

    /// Mail collaborator configuration
    pub mail: MailConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Allowed CORS origin for the frontend; any origin when unset
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Login token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Reviewer invitation token lifetime in seconds
    #[serde(default = "default_invitation_ttl")]
    pub invitation_ttl_secs: u64,

    /// The single administrator address; matched case-insensitively
    pub admin_email: String,

    /// Whitelist of addresses allowed to register as reviewers
    #[serde(default)]
    pub reviewer_emails: Vec<String>,

    /// Dedicated token header name
    #[serde(default = "default_token_header")]
    pub token_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Provider account namespace
    pub cloud_name: String,

    /// Provider API key
    pub api_key: String,

    /// Provider API secret, used for request and URL signatures
    pub api_secret: String,

    /// Folder namespace uploads are tagged with
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,

    /// Provider API base URL
    #[serde(default = "default_storage_api_base")]
    pub api_base: String,

    /// Provider delivery/CDN base URL
    #[serde(default = "default_storage_delivery_base")]
    pub delivery_base: String,

    /// Validity window for signed access URLs in seconds
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,

    /// Upload round-trip timeout in seconds
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// Mail provider API base URL
    #[serde(default = "default_mail_api_base")]
    pub api_base: String,

    /// Mail provider API key
    #[serde(default)]
    pub api_key: String,

    /// Sender address for outgoing notifications
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Base URL the reviewer-facing links point at
    #[serde(default = "default_review_base_url")]
    pub review_base_url: String,

    /// Send timeout in seconds
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_token_ttl() -> u64 { 86_400 }
fn default_invitation_ttl() -> u64 { 604_800 }
fn default_token_header() -> String { "x-auth-token".to_string() }
fn default_upload_folder() -> String { "journals".to_string() }
fn default_storage_api_base() -> String { "https://api.mediavault.example.com".to_string() }
fn default_storage_delivery_base() -> String { "https://files.mediavault.example.com".to_string() }
fn default_signed_url_ttl() -> u64 { 3_600 }
fn default_upload_timeout() -> u64 { 30 }
fn default_mail_api_base() -> String { "https://api.mailrelay.example.com".to_string() }
fn default_from_address() -> String { "submissions@peerview.local".to_string() }
fn default_review_base_url() -> String { "http://localhost:3000".to_string() }
fn default_mail_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "peerview".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=5001
            // APP__AUTH__REVIEWER_EMAILS is a comma-separated list
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.reviewer_emails")
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.reviewer_emails")
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
                cors_origin: None,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/peerview".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            auth: AuthConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                token_ttl_secs: default_token_ttl(),
                invitation_ttl_secs: default_invitation_ttl(),
                admin_email: "admin@peerview.local".to_string(),
                reviewer_emails: Vec::new(),
                token_header: default_token_header(),
            },
            storage: StorageConfig {
                cloud_name: "peerview-dev".to_string(),
                api_key: String::new(),
                api_secret: String::new(),
                upload_folder: default_upload_folder(),
                api_base: default_storage_api_base(),
                delivery_base: default_storage_delivery_base(),
                signed_url_ttl_secs: default_signed_url_ttl(),
                upload_timeout_secs: default_upload_timeout(),
            },
            mail: MailConfig {
                api_base: default_mail_api_base(),
                api_key: String::new(),
                from_address: default_from_address(),
                review_base_url: default_review_base_url(),
                timeout_secs: default_mail_timeout(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_rate_limit(),
                burst: default_burst(),
                enabled: default_enabled(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_ttl_secs, 86_400);
        assert_eq!(config.auth.invitation_ttl_secs, 604_800);
        assert_eq!(config.storage.signed_url_ttl_secs, 3_600);
    }

    #[test]
    fn test_timeouts_as_durations() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_reviewer_whitelist_defaults_empty() {
        let config = AppConfig::default();
        assert!(config.auth.reviewer_emails.is_empty());
    }
}
