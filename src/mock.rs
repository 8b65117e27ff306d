//! In-memory providers for tests and demos.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::error::{ConfigResult, ProviderError, ProviderResult};
use crate::message::{EmailMessage, SendResult};
use crate::provider::{EmailProvider, MailTransport, Provider};

/// Setting key for the sender used when a message has no `from`.
pub const DEFAULT_FROM_SETTING: &str = "default_from";

/// Mock email provider that captures sent messages.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    default_from: Option<String>,
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    attempts: AtomicUsize,
    failure: Option<String>,
}

impl MockProvider {
    /// Create a provider that accepts every message.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_from: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            attempts: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// Create a provider that reports every send as failed.
    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            failure: Some(error.into()),
            ..Self::new(name)
        }
    }

    /// Build from configuration; `default_from` must be set.
    pub fn from_config(config: &ProviderConfig) -> ConfigResult<Self> {
        let default_from = config.require_setting(DEFAULT_FROM_SETTING)?.to_string();
        Ok(Self::new(config.name.clone()).with_default_from(default_from))
    }

    pub fn with_default_from(mut self, from: impl Into<String>) -> Self {
        self.default_from = Some(from.into());
        self
    }

    /// Messages accepted so far, with the default sender applied.
    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn was_sent_to(&self, addr: &str) -> bool {
        self.sent.lock().iter().any(|m| m.to == addr)
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl EmailProvider for MockProvider {
    async fn send(&self, message: &EmailMessage) -> SendResult {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.failure {
            return SendResult::failure(error.clone());
        }

        let mut accepted = message.clone();
        if accepted.from.is_none() {
            accepted.from = self.default_from.clone();
        }
        self.sent.lock().push(accepted);

        SendResult::success(Uuid::new_v4().to_string())
    }
}

/// Mock raw transport with optional latency and scripted failures.
#[derive(Debug, Default)]
pub struct MockTransport {
    name: String,
    latency: Option<Duration>,
    failure: Option<String>,
    delivered: AtomicUsize,
}

impl MockTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Every delivery takes `latency` before completing.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every delivery fails with `error`.
    pub fn with_failure(mut self, error: impl Into<String>) -> Self {
        self.failure = Some(error.into());
        self
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, _message: &EmailMessage) -> ProviderResult<String> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = &self.failure {
            return Err(ProviderError::Rejected(error.clone()));
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(Uuid::new_v4().to_string())
    }
}
