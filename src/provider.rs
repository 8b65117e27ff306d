//! Provider traits.
//!
//! `EmailProvider` is the capability the core depends on: a stable name and
//! a `send` that reports ordinary delivery failure through `SendResult`.
//! `MailTransport` is the raw, fallible send call that concrete backends
//! (SMTP clients, HTTP APIs) implement; `RateLimitedProvider` turns a
//! transport into an `EmailProvider`.

use std::any::Any;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::message::{EmailMessage, SendResult};

/// Base trait for all providers.
///
/// # Example
///
/// ```rust
/// use mailroute::Provider;
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct Relay;
///
/// impl Provider for Relay {
///     fn name(&self) -> &str {
///         "relay"
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Provider: Send + Sync + Debug {
    /// Returns the unique name of this provider.
    ///
    /// This name is the key into the registry, configuration and ledger.
    fn name(&self) -> &str;

    /// Short backend type label used by monitoring.
    fn kind(&self) -> &str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Downcast to concrete type for advanced usage.
    fn as_any(&self) -> &dyn Any;
}

/// A delivery backend able to send one message.
///
/// Ordinary delivery failure must be reported as `SendResult::failure`,
/// never by panicking.
#[async_trait]
pub trait EmailProvider: Provider {
    async fn send(&self, message: &EmailMessage) -> SendResult;
}

/// A raw send call that may fail.
///
/// Returns the provider-assigned message id on success.
#[async_trait]
pub trait MailTransport: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &EmailMessage) -> ProviderResult<String>;
}

/// Extension trait for provider type checking.
pub trait ProviderExt: Provider {
    /// Check if this provider is of type T.
    fn is<T: Provider + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to type T.
    fn downcast_ref<T: Provider + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl<P: Provider + ?Sized> ProviderExt for P {}
