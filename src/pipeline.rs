use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::browser::{BrowserDriver, FingerprintRotation};
use crate::config::AppConfig;
use crate::detection::{ChangeDetector, ChangeRules};
use crate::discovery::CatalogCrawler;
use crate::extraction::{DetailExtractor, ItemExtractor};
use crate::models::DiscoveryRecord;
use crate::plugins::NotificationDispatcher;
use crate::retry::{ItemOutcome, RetryController, RetryPolicy};
use crate::store::SnapshotStore;
use crate::summary::DailySummary;
use crate::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub discovered: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub notifications_delivered: usize,
    pub notifications_failed: usize,
    pub summary_sent: bool,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            discovered: 0,
            succeeded: 0,
            skipped: 0,
            notifications_delivered: 0,
            notifications_failed: 0,
            summary_sent: false,
        }
    }
}

/// Calendar date a run is evaluated against, taken in UTC.
pub fn run_date<Tz: TimeZone>(now: DateTime<Tz>) -> NaiveDate {
    now.with_timezone(&Utc).date_naive()
}

/// One pass of discovery, extraction, change detection and the daily digest.
pub struct Pipeline {
    catalog_urls: Vec<String>,
    crawler: CatalogCrawler,
    extractor: Box<dyn ItemExtractor>,
    retry: RetryController,
    detector: ChangeDetector,
    dispatcher: Arc<NotificationDispatcher>,
}

impl Pipeline {
    pub fn new(
        catalog_urls: Vec<String>,
        crawler: CatalogCrawler,
        extractor: Box<dyn ItemExtractor>,
        retry: RetryController,
        detector: ChangeDetector,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            catalog_urls,
            crawler,
            extractor,
            retry,
            detector,
            dispatcher,
        }
    }

    /// `fingerprints` should be the rotation the initial session was launched
    /// from, so recreated sessions continue through the pool.
    pub fn from_config(
        config: &AppConfig,
        fingerprints: FingerprintRotation,
        store: Arc<dyn SnapshotStore>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        let timeout = config.browser.navigation_timeout();

        Self::new(
            config.catalog.urls.clone(),
            CatalogCrawler::new(config.site.clone(), &config.catalog, timeout),
            Box::new(DetailExtractor::new(config.site.clone(), timeout)),
            RetryController::new(RetryPolicy::from_config(&config.retry), fingerprints),
            ChangeDetector::new(store, dispatcher.clone(), ChangeRules::from_config(&config.rules)),
            dispatcher,
        )
    }

    pub async fn run(&mut self, driver: &mut dyn BrowserDriver, today: NaiveDate) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);

        self.run_items(driver, today, run_id).instrument(span).await
    }

    async fn run_items(
        &mut self,
        driver: &mut dyn BrowserDriver,
        today: NaiveDate,
        run_id: Uuid,
    ) -> RunReport {
        let mut report = RunReport::new(run_id);
        let mut summary = DailySummary::new();

        let records = self.crawler.discover_all(driver, &self.catalog_urls).await;
        report.discovered = records.len();
        info!(items = records.len(), "Discovery finished");

        for (index, record) in records.iter().enumerate() {
            let item_span = info_span!("item", index, url = %record.item_url);

            self.process_record(driver, record, today, &mut summary, &mut report)
                .instrument(item_span)
                .await;
        }

        let cutoff_hour = self.detector.rules().cutoff_hour();
        if let Some(digest) = summary.flush(&self.dispatcher, cutoff_hour).await {
            report.summary_sent = true;
            report.notifications_delivered += digest.delivered;
            report.notifications_failed += digest.failed;
        }

        info!(
            discovered = report.discovered,
            succeeded = report.succeeded,
            skipped = report.skipped,
            "Run finished"
        );
        report
    }

    async fn process_record(
        &mut self,
        driver: &mut dyn BrowserDriver,
        record: &DiscoveryRecord,
        today: NaiveDate,
        summary: &mut DailySummary,
        report: &mut RunReport,
    ) {
        match self.retry.run(driver, self.extractor.as_ref(), record).await {
            ItemOutcome::Success { snapshot, attempts } => {
                match self.detector.process(&snapshot, today, summary).await {
                    Ok(outcome) => {
                        report.succeeded += 1;
                        report.notifications_delivered += outcome.notifications.delivered;
                        report.notifications_failed += outcome.notifications.failed;
                        info!(code = %snapshot.code, attempts, "Item processed");
                    }
                    Err(e) => {
                        report.skipped += 1;
                        metrics::counter!("watcher_items_skipped").increment(1);
                        error!(code = %snapshot.code, error = %e, "Change detection failed");
                    }
                }
            }
            ItemOutcome::GivenUp {
                attempts,
                last_failure,
            } => {
                report.skipped += 1;
                metrics::counter!("watcher_items_skipped").increment(1);
                let error = AppError::RetryExhausted {
                    item_url: record.item_url.clone(),
                    attempts,
                };
                warn!(error = %error, last_failure = %last_failure, "Skipping item for this run");
            }
        }
    }
}
