//! Unified configuration for the Vigil server.
//!
//! A TOML file provides the bulk of the settings; provider secrets may
//! be supplied (or overridden) through `VIGIL_*` environment variables
//! so credentials stay out of the file. `validate()` names the
//! offending field on failure.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VigilConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between sync cycles.
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// Upper bound on one adapter's sync call, in seconds.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
    /// Grace period for an in-flight cycle at shutdown, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
            adapter_timeout_secs: default_adapter_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

/// Per-feed toggles. A `base_url` of `None` means the adapter's
/// production endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_true")]
    pub weather_enabled: bool,
    #[serde(default)]
    pub weather_base_url: Option<String>,
    #[serde(default = "default_weather_area")]
    pub weather_area: String,

    #[serde(default = "default_true")]
    pub seismic_enabled: bool,
    #[serde(default)]
    pub seismic_base_url: Option<String>,

    #[serde(default = "default_true")]
    pub volcano_enabled: bool,
    #[serde(default)]
    pub volcano_base_url: Option<String>,

    #[serde(default)]
    pub crime_enabled: bool,
    #[serde(default)]
    pub crime_base_url: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            weather_enabled: true,
            weather_base_url: None,
            weather_area: default_weather_area(),
            seismic_enabled: true,
            seismic_base_url: None,
            volcano_enabled: true,
            volcano_base_url: None,
            crime_enabled: false,
            crime_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Fixed UTC offset, in hours, of the recipient-local clock used
    /// for quiet hours.
    #[serde(default = "default_quiet_offset")]
    pub quiet_hours_offset_hours: i8,
    /// Bound on the dispatch queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub email: EmailProviderConfig,
    #[serde(default)]
    pub sms: SmsProviderConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            quiet_hours_offset_hours: default_quiet_offset(),
            queue_capacity: default_queue_capacity(),
            email: EmailProviderConfig::default(),
            sms: SmsProviderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for EmailProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmsProviderConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_sync_interval() -> u64 {
    300
}
fn default_adapter_timeout() -> u64 {
    60
}
fn default_shutdown_grace() -> u64 {
    10
}
fn default_weather_area() -> String {
    "HI".to_string()
}
fn default_quiet_offset() -> i8 {
    -10
}
fn default_queue_capacity() -> usize {
    256
}
fn default_from_email() -> String {
    "alerts@vigil.local".to_string()
}
fn default_from_name() -> String {
    "Vigil Alerts".to_string()
}
fn default_true() -> bool {
    true
}

impl VigilConfig {
    /// Parse from TOML text.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load from a file if it exists (defaults otherwise), apply
    /// environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_toml(&std::fs::read_to_string(path)?)?,
            _ => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Secrets from the environment win over the file.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("VIGIL_EMAIL_API_KEY") {
            self.dispatch.email.api_key = value;
        }
        if let Ok(value) = std::env::var("VIGIL_SMS_ACCOUNT_SID") {
            self.dispatch.sms.account_sid = value;
        }
        if let Ok(value) = std::env::var("VIGIL_SMS_AUTH_TOKEN") {
            self.dispatch.sms.auth_token = value;
        }
        if let Ok(value) = std::env::var("VIGIL_SMS_FROM_NUMBER") {
            self.dispatch.sms.from_number = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".into()));
        }
        if self.sync.interval_secs == 0 {
            return Err(ConfigError::Invalid("sync.interval_secs must be > 0".into()));
        }
        if self.sync.adapter_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.adapter_timeout_secs must be > 0".into(),
            ));
        }
        let level = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        if !(-12..=14).contains(&self.dispatch.quiet_hours_offset_hours) {
            return Err(ConfigError::Invalid(
                "dispatch.quiet_hours_offset_hours must be between -12 and 14".into(),
            ));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.queue_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}
