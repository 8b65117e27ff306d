//! # Mailroute
//!
//! **Mailroute** routes outbound email across several delivery backends,
//! enforcing per-backend send quotas with automatic failover and recording
//! the outcome of every send.
//!
//! ## Overview
//!
//! ```text
//! SendService ──► ProviderManager::get_next_provider()
//!      │                 (quota ledger, priority order)
//!      ▼
//! Pipeline [ValidationStep → SendingStep → ...]
//!      │
//!      ▼
//! EmailProvider::send()  ◄── RateLimitedProvider<MailTransport>
//!      │
//!      ▼
//! ProviderManager::report_success / report_failure
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mailroute::prelude::*;
//!
//! let options = ProviderOptions::from_file(Path::new("providers.toml"))?;
//! let providers: Vec<Arc<dyn EmailProvider>> = vec![
//!     Arc::new(RateLimitedProvider::from_config(smtp_transport, options.provider("smtp").unwrap())),
//!     Arc::new(RateLimitedProvider::from_config(ses_transport, options.provider("ses").unwrap())),
//! ];
//!
//! let manager = Arc::new(ProviderManager::new(providers, options)?);
//! let service = SendService::new(manager, Pipeline::standard());
//! let result = service.send(message).await?;
//! ```
//!
//! ## Features
//!
//! - Priority-ordered provider selection with hourly/daily/monthly quotas
//! - Composable, ordered send pipeline
//! - Per-provider rate limiting with a permit pool and pacing
//! - Monitoring snapshots and an async delivery event stream

mod clock;
mod config;
mod error;
mod manager;
mod message;
mod provider;
mod registry;
mod service;
mod throttle;

pub mod events;
pub mod mock;
pub mod monitor;
pub mod pipeline;
pub mod prelude;

// Re-export core types
pub use clock::{MockTimeProvider, SystemTimeProvider, TimeProvider};
pub use config::{Config, FileConfig, ProviderConfig, ProviderOptions};
pub use error::{
    ConfigError, ConfigResult, MailRouterError, MailRouterResult, PipelineError, PipelineResult,
    ProviderError, ProviderResult, RegistryError, RegistryResult,
};
pub use events::{DeliveryEvent, EventSender, EventStream};
pub use manager::{ExhaustedProvider, ProviderManager, ProviderStats, QuotaWindow};
pub use message::{EmailAttachment, EmailMessage, EmailMessageBuilder, SendResult};
pub use mock::{MockProvider, MockTransport};
pub use monitor::{EmailStats, ProviderMonitor, ProviderStatus};
pub use pipeline::{
    Pipeline, PipelineBuilder, PipelineContext, PipelineStep, SendingStep, ValidationStep,
};
pub use provider::{EmailProvider, MailTransport, Provider, ProviderExt};
pub use registry::Registry;
pub use service::SendService;
pub use throttle::{RateLimitedProvider, RateLimiter};

// Re-export async-trait for convenience
pub use async_trait::async_trait;
