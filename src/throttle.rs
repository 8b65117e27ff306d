//! Rate-limited dispatch.
//!
//! `RateLimiter` caps an operation at R completions per second using a
//! permit pool of size R and post-operation pacing: a caller keeps its
//! permit until at least `1s / R` has passed since it acquired it. Up to R
//! calls may start together; steady-state throughput converges to R/s no
//! matter how many callers are waiting.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};
use tracing::{error, trace, warn};

use crate::config::ProviderConfig;
use crate::message::{EmailMessage, SendResult};
use crate::provider::{EmailProvider, MailTransport, Provider};

/// Permit pool plus pacing delay.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    interval: Duration,
    rate: u32,
}

impl RateLimiter {
    /// A limiter admitting `rate` operations per second, or `None` for zero.
    pub fn per_second(rate: u32) -> Option<Self> {
        if rate == 0 {
            return None;
        }
        Some(Self {
            permits: Arc::new(Semaphore::new(rate as usize)),
            interval: Duration::from_secs(1) / rate,
            rate,
        })
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Minimum time a permit is held.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Permits not currently held.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `operation` under the limiter.
    pub async fn run<F, T>(&self, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let permit = match self.permits.acquire().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                warn!("Rate limiter closed, running unthrottled");
                None
            }
        };
        let acquired = Instant::now();

        let output = operation.await;

        let remaining = self.interval.saturating_sub(acquired.elapsed());
        if !remaining.is_zero() {
            trace!(delay_ms = remaining.as_millis() as u64, "Pacing before releasing permit");
            sleep(remaining).await;
        }
        drop(permit);
        output
    }
}

/// Wraps a raw transport as an `EmailProvider`, with optional throttling.
///
/// Transport errors are converted into failed `SendResult`s, so a failing
/// backend never surfaces as an error to the caller.
#[derive(Debug)]
pub struct RateLimitedProvider<T> {
    transport: T,
    limiter: Option<RateLimiter>,
}

impl<T: MailTransport + 'static> RateLimitedProvider<T> {
    /// Throttle `transport` to `requests_per_second`; `None` passes through.
    pub fn new(transport: T, requests_per_second: Option<u32>) -> Self {
        Self {
            transport,
            limiter: requests_per_second.and_then(RateLimiter::per_second),
        }
    }

    /// Use the provider configuration's `requests_per_second`.
    pub fn from_config(transport: T, config: &ProviderConfig) -> Self {
        Self::new(transport, config.requests_per_second)
    }

    pub fn unthrottled(transport: T) -> Self {
        Self::new(transport, None)
    }

    pub fn limiter(&self) -> Option<&RateLimiter> {
        self.limiter.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: MailTransport + 'static> Provider for RateLimitedProvider<T> {
    fn name(&self) -> &str {
        self.transport.name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<T: MailTransport + 'static> EmailProvider for RateLimitedProvider<T> {
    async fn send(&self, message: &EmailMessage) -> SendResult {
        let outcome = match &self.limiter {
            Some(limiter) => limiter.run(self.transport.deliver(message)).await,
            None => self.transport.deliver(message).await,
        };

        match outcome {
            Ok(message_id) => SendResult::success(message_id),
            Err(err) => {
                error!(provider = %self.transport.name(), error = %err, "Failed to send email");
                SendResult::failure(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn message() -> EmailMessage {
        EmailMessage::builder()
            .to("user@example.com")
            .subject("Hi")
            .body("Body")
            .build()
    }

    #[test]
    fn test_zero_rate_disables_limiter() {
        assert!(RateLimiter::per_second(0).is_none());
        let limiter = RateLimiter::per_second(4).unwrap();
        assert_eq!(limiter.interval(), Duration::from_millis(250));
        assert_eq!(limiter.available_permits(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_sends_are_spaced() {
        let provider = RateLimitedProvider::new(MockTransport::new("ses"), Some(2));
        let msg = message();

        let mut completions = Vec::new();
        for _ in 0..4 {
            assert!(provider.send(&msg).await.success);
            completions.push(Instant::now());
        }

        for pair in completions.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(400), "gap too short: {gap:?}");
            assert!(gap <= Duration::from_millis(600), "gap too long: {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_send_is_not_padded() {
        let transport = MockTransport::new("ses").with_latency(Duration::from_millis(800));
        let provider = RateLimitedProvider::new(transport, Some(2));

        let started = Instant::now();
        provider.send(&message()).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(800));
        assert!(elapsed < Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_burst_converges_to_rate() {
        let provider = Arc::new(RateLimitedProvider::new(MockTransport::new("ses"), Some(2)));
        let started = Instant::now();

        let sends = (0..6).map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move {
                provider.send(&message()).await;
                Instant::now()
            })
        });
        let mut finished = Vec::new();
        for handle in sends {
            finished.push(handle.await.unwrap() - started);
        }
        finished.sort();

        // Two permits: pairs complete at 0.5s, 1.0s and 1.5s.
        assert!(finished[1] >= Duration::from_millis(500));
        assert!(finished[5] >= Duration::from_millis(1500));
        assert!(finished[5] < Duration::from_millis(2000));
        assert_eq!(provider.transport().delivered(), 6);
    }

    #[tokio::test]
    async fn test_unthrottled_is_pass_through() {
        let provider = Arc::new(RateLimitedProvider::unthrottled(MockTransport::new("smtp")));
        assert!(provider.limiter().is_none());

        let started = std::time::Instant::now();
        let results = futures::future::join_all((0..4).map(|_| {
            let provider = Arc::clone(&provider);
            async move { provider.send(&message()).await }
        }))
        .await;

        assert!(results.iter().all(|r| r.success));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_transport_error_becomes_failed_result() {
        let transport = MockTransport::new("api").with_failure("invalid api key");
        let provider = RateLimitedProvider::new(transport, Some(10));

        let result = provider.send(&message()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("invalid api key"));
        assert_eq!(provider.limiter().unwrap().available_permits(), 10);
    }

    #[test]
    fn test_from_config() {
        let config = ProviderConfig::new("ses", 1).with_requests_per_second(14);
        let provider = RateLimitedProvider::from_config(MockTransport::new("ses"), &config);
        assert_eq!(provider.limiter().unwrap().rate(), 14);
        assert_eq!(provider.name(), "ses");
        assert_eq!(provider.kind(), "RateLimitedProvider");
    }
}
