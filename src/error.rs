//! Error types for Mailroute.
//!
//! Each layer owns its own error enum. `MailRouterError` is the root type
//! returned by the send orchestrator and wraps the others.

use thiserror::Error;

use crate::manager::ExhaustedProvider;

/// Root error type for Mailroute operations.
#[derive(Error, Debug)]
pub enum MailRouterError {
    /// Configuration errors raised at construction time
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Registry and provider selection errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Errors raised by a pipeline step
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required provider setting is absent
    #[error("Provider {provider} requires setting '{key}'")]
    MissingSetting { provider: String, key: String },

    /// The configuration is structurally valid but semantically wrong
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// IO error while reading or writing a configuration file
    #[error("IO error: {0}")]
    Io(String),
}

/// Errors raised by a raw delivery transport.
///
/// Transports return these from `MailTransport::deliver`; the rate-limited
/// adapter converts them into a failed `SendResult`.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The backend refused the message
    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Errors that can occur in registry and provider-selection operations.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// Provider already registered with this name
    #[error("Provider already registered: {0}")]
    AlreadyRegistered(String),

    /// Every enabled provider has hit at least one quota window
    #[error(
        "No available email providers. Quota exceeded for: {}. \
         Please add more providers or increase the quota limits for existing providers.",
        join_exhausted(.0)
    )]
    QuotaExhausted(Vec<ExhaustedProvider>),

    /// No enabled provider exists at all
    #[error(
        "No available email providers. All providers are either disabled or have exceeded their quotas."
    )]
    NoProviders,
}

impl RegistryError {
    /// Returns true for either shape of "no provider available".
    pub fn is_no_provider_available(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_) | Self::NoProviders)
    }
}

fn join_exhausted(providers: &[ExhaustedProvider]) -> String {
    providers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while running a send pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The message failed a local precondition
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The sending step ran without a provider on the context
    #[error("No provider selected")]
    NoProviderSelected,

    /// The provider reported a failed delivery
    #[error("Failed to send email: {0}")]
    Delivery(String),

    /// All steps ran but none stored a send result
    #[error("Pipeline completed without a send result")]
    MissingResult,

    /// A custom step failed
    #[error("Step '{step}' failed: {message}")]
    Step { step: String, message: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for transport operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for general Mailroute operations.
pub type MailRouterResult<T> = Result<T, MailRouterError>;
