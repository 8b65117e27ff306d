//! Configuration types for providers and the provider manager.
//!
//! Configuration is loaded externally and handed to the manager as
//! `ProviderOptions`. TOML loading is provided through `FileConfig`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Base trait for configuration types.
///
/// # Example
///
/// ```rust
/// use mailroute::{Config, ProviderConfig};
///
/// let config = ProviderConfig::new("smtp-primary", 1).with_hourly_quota(100);
/// assert_eq!(config.name(), "smtp-primary");
/// assert!(config.validate().is_ok());
/// ```
pub trait Config: Send + Sync {
    /// Returns the configuration name/identifier.
    fn name(&self) -> &str {
        "default"
    }

    /// Validates the configuration.
    fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }
}

/// Trait for configurations that support file-based loading.
pub trait FileConfig: Config {
    /// Load configuration from a file path.
    fn from_file(path: &Path) -> ConfigResult<Self>
    where
        Self: Sized;

    /// Save configuration to a file path.
    fn to_file(&self, path: &Path) -> ConfigResult<()>;
}

/// Static configuration for a single provider.
///
/// Immutable after load. Absent quotas mean unlimited, an absent
/// `requests_per_second` means unthrottled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name, matches `Provider::name`
    pub name: String,
    /// Ascending: lower is preferred
    #[serde(default)]
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_quota: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_quota: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_quota: Option<u64>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<u32>,
    /// Backend specific settings (host, credentials, default sender, ...)
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl ProviderConfig {
    /// Create an enabled, unlimited, unthrottled provider configuration.
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            hourly_quota: None,
            daily_quota: None,
            monthly_quota: None,
            is_enabled: true,
            requests_per_second: None,
            settings: HashMap::new(),
        }
    }

    pub fn with_hourly_quota(mut self, quota: u64) -> Self {
        self.hourly_quota = Some(quota);
        self
    }

    pub fn with_daily_quota(mut self, quota: u64) -> Self {
        self.daily_quota = Some(quota);
        self
    }

    pub fn with_monthly_quota(mut self, quota: u64) -> Self {
        self.monthly_quota = Some(quota);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.is_enabled = enabled;
        self
    }

    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Look up a backend setting.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Look up a backend setting that must be present.
    pub fn require_setting(&self, key: &str) -> ConfigResult<&str> {
        self.setting(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingSetting {
                provider: self.name.clone(),
                key: key.to_string(),
            })
    }
}

impl Config for ProviderConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "provider name must not be empty".to_string(),
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "provider {} has requests_per_second = 0; omit it to disable throttling",
                self.name
            )));
        }
        Ok(())
    }
}

/// Options for the provider manager.
///
/// `enable_fallback` and `max_retries` are accepted and exposed but the
/// send path makes exactly one pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOptions {
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            enable_fallback: true,
            max_retries: default_max_retries(),
            providers: Vec::new(),
        }
    }
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider configuration.
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.enable_fallback = enabled;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Find the configuration for a provider by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let options: Self = toml::from_str(input)?;
        options.validate()?;
        Ok(options)
    }
}

impl Config for ProviderOptions {
    fn name(&self) -> &str {
        "providers"
    }

    fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider name: {}",
                    provider.name
                )));
            }
        }
        Ok(())
    }
}

impl FileConfig for ProviderOptions {
    fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    fn to_file(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}
