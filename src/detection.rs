use chrono::{NaiveDate, Timelike};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::RulesConfig;
use crate::models::{ChangeEvent, ItemDisplay, ItemSnapshot, PriceDirection};
use crate::plugins::{DispatchReport, NotificationDispatcher, OutboundMessage};
use crate::store::{load_snapshot, save_snapshot, SnapshotStore};
use crate::summary::DailySummary;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRules {
    /// A drop must exceed this many percent to notify.
    pub price_drop_threshold_percent: Decimal,
    /// Releases whose hour is at or before this one count as early.
    pub early_release_cutoff_hour: u32,
}

impl ChangeRules {
    pub fn from_config(config: &RulesConfig) -> Self {
        Self {
            price_drop_threshold_percent: Decimal::from_f64(config.price_drop_threshold_percent)
                .unwrap_or(Decimal::ZERO),
            early_release_cutoff_hour: config.early_release_cutoff_hour,
        }
    }

    pub fn cutoff_hour(&self) -> u32 {
        self.early_release_cutoff_hour
    }
}

impl Default for ChangeRules {
    fn default() -> Self {
        Self {
            price_drop_threshold_percent: Decimal::new(30, 0),
            early_release_cutoff_hour: 10,
        }
    }
}

/// What one snapshot means against its stored predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub events: Vec<ChangeEvent>,
    /// True for first sightings and whenever an event fired.
    pub persist: bool,
    pub first_sighting: bool,
}

/// `(current - previous) / previous * 100`, rounded to two places.
pub fn percent_change(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((current - previous) / previous * Decimal::ONE_HUNDRED).round_dp(2))
}

pub fn price_change(
    previous: &ItemSnapshot,
    current: &ItemSnapshot,
    rules: &ChangeRules,
) -> Option<ChangeEvent> {
    let previous_price = previous.effective_price()?;
    let current_price = current.effective_price()?;

    if current_price >= previous_price {
        return None;
    }

    let percent = percent_change(previous_price, current_price)?;
    if percent.abs() <= rules.price_drop_threshold_percent {
        debug!(code = %current.code, %percent, "Price drop below threshold");
        return None;
    }

    Some(ChangeEvent::PriceChange {
        item: ItemDisplay::from(current),
        previous: previous_price,
        current: current_price,
        percent_change: percent,
        direction: PriceDirection::Down,
    })
}

pub fn restock(previous: &ItemSnapshot, current: &ItemSnapshot) -> Option<ChangeEvent> {
    (!previous.stocked && current.stocked).then(|| ChangeEvent::Restock {
        item: ItemDisplay::from(current),
    })
}

pub fn assess(previous: Option<&ItemSnapshot>, current: &ItemSnapshot, rules: &ChangeRules) -> Assessment {
    let Some(previous) = previous else {
        return Assessment {
            events: Vec::new(),
            persist: true,
            first_sighting: true,
        };
    };

    let events: Vec<ChangeEvent> = price_change(previous, current, rules)
        .into_iter()
        .chain(restock(previous, current))
        .collect();

    Assessment {
        persist: !events.is_empty(),
        events,
        first_sighting: false,
    }
}

/// Released on `today` in an hour no later than `cutoff_hour`, read in the
/// timestamp's own offset. A 10:59 release still counts for a cutoff of 10.
pub fn is_early_release(snapshot: &ItemSnapshot, today: NaiveDate, cutoff_hour: u32) -> bool {
    snapshot
        .release_date
        .is_some_and(|release| release.date_naive() == today && release.hour() <= cutoff_hour)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    pub assessment: Assessment,
    pub early_release: bool,
    pub notifications: DispatchReport,
}

/// Sole writer of stored snapshots.
pub struct ChangeDetector {
    store: Arc<dyn SnapshotStore>,
    dispatcher: Arc<NotificationDispatcher>,
    rules: ChangeRules,
}

impl ChangeDetector {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        dispatcher: Arc<NotificationDispatcher>,
        rules: ChangeRules,
    ) -> Self {
        Self {
            store,
            dispatcher,
            rules,
        }
    }

    pub fn rules(&self) -> &ChangeRules {
        &self.rules
    }

    pub async fn process(
        &self,
        snapshot: &ItemSnapshot,
        today: NaiveDate,
        summary: &mut DailySummary,
    ) -> Result<DetectionOutcome> {
        let early_release = is_early_release(snapshot, today, self.rules.early_release_cutoff_hour);
        if early_release {
            summary.add_early_release(snapshot);
        }

        let previous = load_snapshot(self.store.as_ref(), &snapshot.source, &snapshot.code).await?;
        let assessment = assess(previous.as_ref(), snapshot, &self.rules);

        let mut notifications = DispatchReport::default();
        for event in &assessment.events {
            if matches!(event, ChangeEvent::PriceChange { .. }) {
                summary.add_price_change(event);
            }

            info!(code = %snapshot.code, change = event.label(), "Change detected");
            let message = OutboundMessage::with_image(event.message(), event.item().image_url.clone());
            let report = self.dispatcher.dispatch(&message).await;
            notifications.delivered += report.delivered;
            notifications.failed += report.failed;
        }

        if assessment.persist {
            if assessment.first_sighting {
                info!(code = %snapshot.code, "New item; saving snapshot");
            }
            save_snapshot(self.store.as_ref(), snapshot).await?;
        }

        Ok(DetectionOutcome {
            assessment,
            early_release,
            notifications,
        })
    }
}
