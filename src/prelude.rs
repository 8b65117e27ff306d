//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use mailroute::prelude::*;
//! ```

// Configuration
pub use crate::config::{Config, FileConfig, ProviderConfig, ProviderOptions};

// Core traits
pub use crate::pipeline::PipelineStep;
pub use crate::provider::{EmailProvider, MailTransport, Provider, ProviderExt};

// Messages
pub use crate::message::{EmailAttachment, EmailMessage, SendResult};

// Routing
pub use crate::manager::{ProviderManager, ProviderStats, QuotaWindow};
pub use crate::pipeline::{Pipeline, PipelineContext, SendingStep, ValidationStep};
pub use crate::service::SendService;
pub use crate::throttle::{RateLimitedProvider, RateLimiter};

// Monitoring
pub use crate::events::{DeliveryEvent, EventStream};
pub use crate::monitor::{EmailStats, ProviderMonitor, ProviderStatus};

// Test doubles
pub use crate::clock::{MockTimeProvider, SystemTimeProvider, TimeProvider};
pub use crate::mock::{MockProvider, MockTransport};

// Errors
pub use crate::error::{
    ConfigError, MailRouterError, MailRouterResult, PipelineError, ProviderError, RegistryError,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
