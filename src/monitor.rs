//! Read-only monitoring snapshots over the provider manager.

use std::sync::Arc;

use serde::Serialize;

use crate::manager::ProviderManager;

/// Status of one provider for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    /// The configured enabled flag; true when the provider has no configuration
    pub is_active: bool,
    pub quota_used: u64,
    /// Hourly limit, else daily, else monthly, else 0
    pub quota_limit: u64,
}

/// Aggregate send statistics across every provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub total_sent: u64,
    pub total_failed: u64,
    /// Percentage of attempts that succeeded; 100 when nothing was attempted
    pub success_rate: f64,
}

/// Builds monitoring snapshots from the ledger.
#[derive(Debug, Clone)]
pub struct ProviderMonitor {
    manager: Arc<ProviderManager>,
}

impl ProviderMonitor {
    pub fn new(manager: Arc<ProviderManager>) -> Self {
        Self { manager }
    }

    pub fn providers_status(&self) -> Vec<ProviderStatus> {
        self.manager
            .get_all_providers()
            .iter()
            .map(|provider| {
                let config = self.manager.config(provider.name());
                let stats = self.manager.stats(provider.name()).unwrap_or_default();
                ProviderStatus {
                    name: provider.name().to_string(),
                    provider_type: provider.kind().to_string(),
                    is_active: config.map_or(true, |c| c.is_enabled),
                    quota_used: stats.successful_sends,
                    quota_limit: config
                        .and_then(|c| c.hourly_quota.or(c.daily_quota).or(c.monthly_quota))
                        .unwrap_or(0),
                }
            })
            .collect()
    }

    pub fn email_stats(&self) -> EmailStats {
        let (sent, failed) = self
            .manager
            .all_stats()
            .values()
            .fold((0, 0), |(s, f), stats| {
                (s + stats.successful_sends, f + stats.failed_sends)
            });
        let attempts = sent + failed;
        let success_rate = if attempts == 0 {
            100.0
        } else {
            sent as f64 * 100.0 / attempts as f64
        };
        EmailStats {
            total_sent: sent,
            total_failed: failed,
            success_rate,
        }
    }
}
