use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserDriver, FingerprintRotation};
use crate::config::RetryConfig;
use crate::extraction::ItemExtractor;
use crate::models::{DiscoveryRecord, ItemSnapshot};

/// Exponential backoff: the delay after failed attempt `n` is
/// `base_delay * growth_factor^(n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub growth_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, growth_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            growth_factor,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            config.growth_factor,
        )
    }

    /// Attempt numbers start at 1.
    pub fn should_retry(&self, failed_attempt: u32) -> bool {
        failed_attempt < self.max_attempts
    }

    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.growth_factor.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Delays applied before attempts `2..=max_attempts`.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|n| self.delay_after(n)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Success { snapshot: ItemSnapshot, attempts: u32 },
    GivenUp { attempts: u32, last_failure: String },
}

impl ItemOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            ItemOutcome::Success { attempts, .. } | ItemOutcome::GivenUp { attempts, .. } => *attempts,
        }
    }
}

/// Drives one item through `Attempting -> {Success, Retryable} -> ... -> GivenUp`.
///
/// Every retry discards the browsing session and starts a fresh one with the
/// next fingerprint; a flagged session is never reused.
pub struct RetryController {
    policy: RetryPolicy,
    fingerprints: FingerprintRotation,
}

impl RetryController {
    pub fn new(policy: RetryPolicy, fingerprints: FingerprintRotation) -> Self {
        Self {
            policy,
            fingerprints,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run(
        &mut self,
        driver: &mut dyn BrowserDriver,
        extractor: &dyn ItemExtractor,
        record: &DiscoveryRecord,
    ) -> ItemOutcome {
        let mut attempt = 1;

        loop {
            metrics::counter!("watcher_extraction_attempts").increment(1);
            debug!(attempt, max = self.policy.max_attempts, url = %record.item_url, "Extracting item");

            let failure = match extractor.extract(driver, record).await {
                Ok(Some(snapshot)) => {
                    return ItemOutcome::Success {
                        snapshot,
                        attempts: attempt,
                    };
                }
                Ok(None) => {
                    info!(attempt, url = %record.item_url, "No product data on page");
                    "no product data on page".to_string()
                }
                Err(e) if e.is_access_denied() => {
                    warn!(attempt, url = %record.item_url, error = %e, "Session blocked by site");
                    e.to_string()
                }
                Err(e) => {
                    warn!(attempt, url = %record.item_url, error = %e, "Extraction attempt failed");
                    e.to_string()
                }
            };

            if !self.policy.should_retry(attempt) {
                warn!(attempts = attempt, url = %record.item_url, "Giving up on item");
                return ItemOutcome::GivenUp {
                    attempts: attempt,
                    last_failure: failure,
                };
            }

            let delay = self.policy.delay_after(attempt);
            info!(delay_ms = delay.as_millis() as u64, next_attempt = attempt + 1, "Backing off before retry");
            tokio::time::sleep(delay).await;

            self.recover(driver).await;
            attempt += 1;
        }
    }

    async fn recover(&mut self, driver: &mut dyn BrowserDriver) {
        let profile = self.fingerprints.next_profile();
        metrics::counter!("watcher_session_recreations").increment(1);

        // A failed relaunch leaves the old session in place; the next attempt
        // will fail on its own and come back here.
        if let Err(e) = driver.recreate_session(&profile).await {
            error!(error = %e, "Failed to recreate browser session");
        }
    }
}
