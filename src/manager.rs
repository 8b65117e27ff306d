//! Provider manager: quota-gated provider selection and the send ledger.
//!
//! The manager owns one `ProviderStats` entry per registered provider. All
//! ledger access goes through a single lock so that an eligibility scan
//! never observes a half-applied report.
//!
//! # Quota policy
//!
//! `successful_sends` is a lifetime counter and is never reset. A quota
//! window rejects a provider when the window has a limit, the counter is at
//! or above it, and the most recent success falls in the same calendar
//! bucket as now. Once a bucket rolls over the provider becomes eligible
//! again even though the counter is still above the limit.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{SystemTimeProvider, TimeProvider};
use crate::config::{Config, ProviderConfig, ProviderOptions};
use crate::error::{MailRouterResult, RegistryError, RegistryResult};
use crate::provider::EmailProvider;
use crate::registry::Registry;

/// A calendar bucket a quota applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QuotaWindow {
    Hourly,
    Daily,
    Monthly,
}

impl QuotaWindow {
    /// Windows in the order they are checked and reported.
    pub const ALL: [QuotaWindow; 3] = [Self::Hourly, Self::Daily, Self::Monthly];

    /// The configured limit for this window, if any.
    pub fn limit(self, config: &ProviderConfig) -> Option<u64> {
        match self {
            Self::Hourly => config.hourly_quota,
            Self::Daily => config.daily_quota,
            Self::Monthly => config.monthly_quota,
        }
    }

    /// Whether two instants fall in the same bucket of this window.
    pub fn same_bucket(self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        match self {
            Self::Hourly => a.date_naive() == b.date_naive() && a.hour() == b.hour(),
            Self::Daily => a.date_naive() == b.date_naive(),
            Self::Monthly => a.year() == b.year() && a.month() == b.month(),
        }
    }
}

impl fmt::Display for QuotaWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => write!(f, "Hourly"),
            Self::Daily => write!(f, "Daily"),
            Self::Monthly => write!(f, "Monthly"),
        }
    }
}

/// Per-provider send statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub successful_sends: u64,
    pub failed_sends: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl ProviderStats {
    /// First window whose quota currently rejects the provider.
    pub fn exhausted_window(
        &self,
        config: &ProviderConfig,
        now: DateTime<Utc>,
    ) -> Option<QuotaWindow> {
        QuotaWindow::ALL.into_iter().find(|window| {
            let Some(limit) = window.limit(config) else {
                return false;
            };
            self.successful_sends >= limit
                && self
                    .last_success_at
                    .is_some_and(|last| window.same_bucket(last, now))
        })
    }
}

/// A quota-exhausted provider as reported in `RegistryError::QuotaExhausted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhaustedProvider {
    pub name: String,
    pub successful_sends: u64,
    /// Every configured window with its limit
    pub limits: Vec<(QuotaWindow, u64)>,
}

impl fmt::Display for ExhaustedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limits = self
            .limits
            .iter()
            .map(|(window, limit)| format!("{}: {}/{}", window, self.successful_sends, limit))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} ({})", self.name, limits)
    }
}

/// Chooses providers for outgoing messages and records their outcomes.
pub struct ProviderManager {
    registry: Registry<dyn EmailProvider>,
    options: ProviderOptions,
    ledger: Mutex<HashMap<String, ProviderStats>>,
    clock: Arc<dyn TimeProvider>,
}

impl fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderManager")
            .field("providers", &self.registry.names())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ProviderManager {
    /// Create a manager over `providers` using the system clock.
    ///
    /// Fails when the options are invalid or two providers share a name.
    pub fn new(
        providers: Vec<Arc<dyn EmailProvider>>,
        options: ProviderOptions,
    ) -> MailRouterResult<Self> {
        Self::with_time_provider(providers, options, Arc::new(SystemTimeProvider))
    }

    /// Create a manager with an explicit time source.
    pub fn with_time_provider(
        providers: Vec<Arc<dyn EmailProvider>>,
        options: ProviderOptions,
        clock: Arc<dyn TimeProvider>,
    ) -> MailRouterResult<Self> {
        options.validate()?;

        let mut registry = Registry::new();
        let mut ledger = HashMap::new();
        for provider in providers {
            let name = provider.name().to_string();
            if options.provider(&name).is_none() {
                warn!(provider = %name, "Provider has no configuration and will never be selected");
            }
            registry.register(provider)?;
            ledger.insert(name, ProviderStats::default());
        }

        info!(
            providers = registry.len(),
            enable_fallback = options.enable_fallback,
            max_retries = options.max_retries,
            "Provider manager initialized"
        );

        Ok(Self {
            registry,
            options,
            ledger: Mutex::new(ledger),
            clock,
        })
    }

    /// Select the preferred eligible provider.
    ///
    /// Eligible means enabled and not rejected by any quota window. Ties in
    /// priority go to the provider registered first.
    pub fn get_next_provider(&self) -> RegistryResult<Arc<dyn EmailProvider>> {
        let ledger = self.ledger.lock();
        let now = self.clock.now();

        let selected = self
            .registry
            .iter()
            .filter_map(|provider| {
                let config = self.options.provider(provider.name())?;
                let stats = ledger.get(provider.name())?;
                self.is_available(config, stats, now)
                    .then_some((config.priority, provider))
            })
            .min_by_key(|(priority, _)| *priority)
            .map(|(_, provider)| Arc::clone(provider));

        if let Some(provider) = selected {
            debug!(provider = %provider.name(), "Selected email provider");
            return Ok(provider);
        }

        let exhausted: Vec<ExhaustedProvider> = self
            .registry
            .iter()
            .filter_map(|provider| {
                let config = self.options.provider(provider.name())?;
                let stats = ledger.get(provider.name())?;
                if !config.is_enabled || stats.exhausted_window(config, now).is_none() {
                    return None;
                }
                Some(ExhaustedProvider {
                    name: provider.name().to_string(),
                    successful_sends: stats.successful_sends,
                    limits: QuotaWindow::ALL
                        .into_iter()
                        .filter_map(|w| w.limit(config).map(|limit| (w, limit)))
                        .collect(),
                })
            })
            .collect();

        if exhausted.is_empty() {
            warn!("No enabled email providers");
            Err(RegistryError::NoProviders)
        } else {
            warn!(exhausted = exhausted.len(), "All enabled email providers are over quota");
            Err(RegistryError::QuotaExhausted(exhausted))
        }
    }

    /// Record a successful delivery.
    pub fn report_success(&self, provider: &dyn EmailProvider) {
        let mut ledger = self.ledger.lock();
        let now = self.clock.now();
        match ledger.get_mut(provider.name()) {
            Some(stats) => {
                stats.successful_sends += 1;
                stats.last_success_at = Some(now);
            }
            None => debug!(provider = %provider.name(), "Ignoring success for unknown provider"),
        }
    }

    /// Record a failed delivery. Failures never consume quota.
    pub fn report_failure(&self, provider: &dyn EmailProvider) {
        let mut ledger = self.ledger.lock();
        let now = self.clock.now();
        match ledger.get_mut(provider.name()) {
            Some(stats) => {
                stats.failed_sends += 1;
                stats.last_failure_at = Some(now);
            }
            None => debug!(provider = %provider.name(), "Ignoring failure for unknown provider"),
        }
    }

    /// All registered providers, in registration order.
    pub fn get_all_providers(&self) -> Vec<Arc<dyn EmailProvider>> {
        self.registry.iter().cloned().collect()
    }

    /// Snapshot of one provider's statistics.
    pub fn stats(&self, name: &str) -> Option<ProviderStats> {
        self.ledger.lock().get(name).cloned()
    }

    /// Snapshot of every provider's statistics.
    pub fn all_stats(&self) -> HashMap<String, ProviderStats> {
        self.ledger.lock().clone()
    }

    pub fn config(&self, name: &str) -> Option<&ProviderConfig> {
        self.options.provider(name)
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Whether `name` would currently be considered by `get_next_provider`.
    pub fn is_eligible(&self, name: &str) -> bool {
        let ledger = self.ledger.lock();
        match (self.options.provider(name), ledger.get(name)) {
            (Some(config), Some(stats)) => self.is_available(config, stats, self.clock.now()),
            _ => false,
        }
    }

    fn is_available(
        &self,
        config: &ProviderConfig,
        stats: &ProviderStats,
        now: DateTime<Utc>,
    ) -> bool {
        if !config.is_enabled {
            return false;
        }
        if let Some(window) = stats.exhausted_window(config, now) {
            debug!(
                provider = %config.name,
                window = %window,
                quota = window.limit(config).unwrap_or_default(),
                "Provider has reached its quota"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockTimeProvider;
    use crate::mock::MockProvider;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 9, 10, 0).unwrap()
    }

    fn manager(configs: Vec<ProviderConfig>) -> (ProviderManager, MockTimeProvider) {
        let clock = MockTimeProvider::new(start());
        let providers: Vec<Arc<dyn EmailProvider>> = configs
            .iter()
            .map(|c| Arc::new(MockProvider::new(c.name.clone())) as Arc<dyn EmailProvider>)
            .collect();
        let options = configs
            .into_iter()
            .fold(ProviderOptions::new(), |o, c| o.with_provider(c));
        let manager =
            ProviderManager::with_time_provider(providers, options, Arc::new(clock.clone()))
                .unwrap();
        (manager, clock)
    }

    fn succeed(manager: &ProviderManager, name: &str, times: usize) {
        let provider = manager
            .get_all_providers()
            .into_iter()
            .find(|p| p.name() == name)
            .unwrap();
        for _ in 0..times {
            manager.report_success(provider.as_ref());
        }
    }

    #[test]
    fn test_same_bucket() {
        let a = Utc.with_ymd_and_hms(2024, 5, 14, 9, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 5, 14, 9, 59, 59).unwrap();
        let c = Utc.with_ymd_and_hms(2024, 5, 15, 9, 30, 0).unwrap();
        let d = Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap();

        assert!(QuotaWindow::Hourly.same_bucket(a, b));
        assert!(!QuotaWindow::Hourly.same_bucket(a, c));
        assert!(QuotaWindow::Daily.same_bucket(a, b));
        assert!(!QuotaWindow::Daily.same_bucket(a, c));
        assert!(QuotaWindow::Monthly.same_bucket(a, c));
        assert!(!QuotaWindow::Monthly.same_bucket(a, d));
    }

    #[test]
    fn test_lowest_priority_wins() {
        let (manager, _) = manager(vec![
            ProviderConfig::new("second", 2),
            ProviderConfig::new("third", 3),
            ProviderConfig::new("first", 1),
        ]);
        assert_eq!(manager.get_next_provider().unwrap().name(), "first");
    }

    #[test]
    fn test_priority_tie_uses_registration_order() {
        let (manager, _) = manager(vec![
            ProviderConfig::new("a", 1),
            ProviderConfig::new("b", 1),
        ]);
        assert_eq!(manager.get_next_provider().unwrap().name(), "a");
    }

    #[test]
    fn test_disabled_provider_skipped() {
        let (manager, _) = manager(vec![
            ProviderConfig::new("primary", 1).with_enabled(false),
            ProviderConfig::new("backup", 2),
        ]);
        assert_eq!(manager.get_next_provider().unwrap().name(), "backup");
        assert!(!manager.is_eligible("primary"));
    }

    #[test]
    fn test_hourly_quota_fails_over() {
        let (manager, _) = manager(vec![
            ProviderConfig::new("primary", 1).with_hourly_quota(3),
            ProviderConfig::new("backup", 2),
        ]);

        succeed(&manager, "primary", 2);
        assert_eq!(manager.get_next_provider().unwrap().name(), "primary");

        succeed(&manager, "primary", 1);
        assert_eq!(manager.get_next_provider().unwrap().name(), "backup");
    }

    #[test]
    fn test_failures_do_not_consume_quota() {
        let (manager, _) = manager(vec![
            ProviderConfig::new("primary", 1).with_hourly_quota(1),
            ProviderConfig::new("backup", 2),
        ]);
        let primary = manager.get_next_provider().unwrap();
        for _ in 0..10 {
            manager.report_failure(primary.as_ref());
        }

        assert_eq!(manager.get_next_provider().unwrap().name(), "primary");
        let stats = manager.stats("primary").unwrap();
        assert_eq!(stats.failed_sends, 10);
        assert_eq!(stats.successful_sends, 0);
        assert_eq!(stats.last_failure_at, Some(start()));
    }

    #[test]
    fn test_hourly_rollover_reenables_without_reset() {
        let (manager, clock) = manager(vec![
            ProviderConfig::new("primary", 1).with_hourly_quota(2),
            ProviderConfig::new("backup", 2),
        ]);
        succeed(&manager, "primary", 2);
        assert_eq!(manager.get_next_provider().unwrap().name(), "backup");

        clock.advance(Duration::hours(1));
        assert_eq!(manager.get_next_provider().unwrap().name(), "primary");
        assert_eq!(manager.stats("primary").unwrap().successful_sends, 2);

        // The next success lands in the new bucket with the counter still over the limit.
        succeed(&manager, "primary", 1);
        assert_eq!(manager.get_next_provider().unwrap().name(), "backup");
    }

    #[test]
    fn test_daily_and_monthly_windows() {
        let (manager, clock) = manager(vec![
            ProviderConfig::new("daily", 1).with_daily_quota(1),
            ProviderConfig::new("monthly", 2).with_monthly_quota(1),
            ProviderConfig::new("fallback", 3),
        ]);
        succeed(&manager, "daily", 1);
        succeed(&manager, "monthly", 1);
        assert_eq!(manager.get_next_provider().unwrap().name(), "fallback");

        clock.advance(Duration::days(1));
        assert_eq!(manager.get_next_provider().unwrap().name(), "daily");
        assert!(!manager.is_eligible("monthly"));

        clock.set_time(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(manager.is_eligible("monthly"));
    }

    #[test]
    fn test_quota_exhausted_error_details() {
        let (manager, _) = manager(vec![
            ProviderConfig::new("primary", 1)
                .with_hourly_quota(2)
                .with_monthly_quota(500),
            ProviderConfig::new("backup", 2).with_daily_quota(1),
            ProviderConfig::new("off", 3).with_enabled(false),
        ]);
        succeed(&manager, "primary", 2);
        succeed(&manager, "backup", 1);

        let err = manager.get_next_provider().unwrap_err();
        let RegistryError::QuotaExhausted(exhausted) = &err else {
            panic!("expected quota exhaustion, got {err:?}");
        };
        assert_eq!(exhausted.len(), 2);

        let msg = err.to_string();
        assert!(msg.contains("primary (Hourly: 2/2, Monthly: 2/500)"));
        assert!(msg.contains("backup (Daily: 1/1)"));
        assert!(!msg.contains("off ("));
    }

    #[test]
    fn test_all_disabled_error() {
        let (manager, _) = manager(vec![
            ProviderConfig::new("a", 1).with_enabled(false),
            ProviderConfig::new("b", 2).with_enabled(false),
        ]);
        assert!(matches!(
            manager.get_next_provider(),
            Err(RegistryError::NoProviders)
        ));
    }

    #[test]
    fn test_unconfigured_provider_never_selected() {
        let clock = Arc::new(MockTimeProvider::new(start()));
        let manager = ProviderManager::with_time_provider(
            vec![Arc::new(MockProvider::new("stray"))],
            ProviderOptions::new(),
            clock,
        )
        .unwrap();
        assert!(matches!(
            manager.get_next_provider(),
            Err(RegistryError::NoProviders)
        ));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let result = ProviderManager::new(
            vec![
                Arc::new(MockProvider::new("dup")),
                Arc::new(MockProvider::new("dup")),
            ],
            ProviderOptions::new().with_provider(ProviderConfig::new("dup", 1)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_provider_reports_are_ignored() {
        let (manager, _) = manager(vec![ProviderConfig::new("known", 1)]);
        let stranger = MockProvider::new("stranger");
        manager.report_success(&stranger);
        manager.report_failure(&stranger);
        assert!(manager.stats("stranger").is_none());
        assert_eq!(manager.all_stats().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reports_are_not_lost() {
        let (manager, _) = manager(vec![ProviderConfig::new("shared", 1)]);
        let manager = Arc::new(manager);
        let provider = manager.get_next_provider().unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let provider = Arc::clone(&provider);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            manager.report_success(provider.as_ref());
                        } else {
                            manager.report_failure(provider.as_ref());
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = manager.stats("shared").unwrap();
        assert_eq!(stats.successful_sends, 400);
        assert_eq!(stats.failed_sends, 400);
    }

    /// Hands its first caller an earlier instant, after a delay.
    struct SlowFirstReadClock {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl TimeProvider for SlowFirstReadClock {
        fn now(&self) -> DateTime<Utc> {
            let call = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                std::thread::sleep(std::time::Duration::from_millis(200));
                Utc.with_ymd_and_hms(2024, 5, 14, 10, 59, 59).unwrap()
            } else {
                Utc.with_ymd_and_hms(2024, 5, 14, 11, 0, 1).unwrap()
            }
        }
    }

    #[test]
    fn test_concurrent_successes_commit_in_clock_order() {
        let providers: Vec<Arc<dyn EmailProvider>> = vec![Arc::new(MockProvider::new("shared"))];
        let options = ProviderOptions::new()
            .with_provider(ProviderConfig::new("shared", 1).with_hourly_quota(2));
        let clock = Arc::new(SlowFirstReadClock {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let manager = Arc::new(
            ProviderManager::with_time_provider(providers, options, clock).unwrap(),
        );
        let provider = manager.get_all_providers().remove(0);

        let report = |manager: Arc<ProviderManager>, provider: Arc<dyn EmailProvider>| {
            std::thread::spawn(move || manager.report_success(provider.as_ref()))
        };
        let first = report(Arc::clone(&manager), Arc::clone(&provider));
        std::thread::sleep(std::time::Duration::from_millis(50));
        let second = report(Arc::clone(&manager), Arc::clone(&provider));
        first.join().unwrap();
        second.join().unwrap();

        let stats = manager.stats("shared").unwrap();
        assert_eq!(stats.successful_sends, 2);
        assert_eq!(
            stats.last_success_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 14, 11, 0, 1).unwrap())
        );
        assert!(!manager.is_eligible("shared"));
    }
}
