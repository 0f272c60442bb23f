use tracing::info;

use crate::models::{ChangeEvent, ItemSnapshot};
use crate::plugins::{DispatchReport, NotificationDispatcher, OutboundMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceChangeEntry {
    pub name: String,
    pub price_line: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
    pub name: String,
    pub url: String,
}

/// Accumulates price drops and same-day releases over one run.
#[derive(Debug, Clone, Default)]
pub struct DailySummary {
    price_changes: Vec<PriceChangeEntry>,
    releases: Vec<ReleaseEntry>,
}

impl DailySummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restock events have no price line and are ignored.
    pub fn add_price_change(&mut self, event: &ChangeEvent) {
        if let Some(price_line) = event.price_line() {
            let item = event.item();
            self.price_changes.push(PriceChangeEntry {
                name: item.name.clone(),
                price_line,
                url: item.url.clone(),
            });
        }
    }

    pub fn add_early_release(&mut self, snapshot: &ItemSnapshot) {
        self.releases.push(ReleaseEntry {
            name: snapshot.name.clone(),
            url: snapshot.url.clone(),
        });
    }

    pub fn price_changes(&self) -> &[PriceChangeEntry] {
        &self.price_changes
    }

    pub fn releases(&self) -> &[ReleaseEntry] {
        &self.releases
    }

    pub fn is_empty(&self) -> bool {
        self.price_changes.is_empty() && self.releases.is_empty()
    }

    pub fn render(&self, cutoff_hour: u32) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut message = String::new();

        if !self.price_changes.is_empty() {
            message.push_str("📊 Daily Price Summary 📊\n\n");
            for entry in &self.price_changes {
                message.push_str(&format!(
                    "👟 {}\n{}\n🛒 Link: {}\n\n",
                    entry.name, entry.price_line, entry.url
                ));
            }
            message.push_str("Don't miss these deals! ⚡\n\n");
        }

        if !self.releases.is_empty() {
            message.push_str(&format!("🎉 Today's Releases (until {:02}:00) 🎉\n\n", cutoff_hour));
            for entry in &self.releases {
                message.push_str(&format!("👟 {}\n🛒 Link: {}\n\n", entry.name, entry.url));
            }
            message.push_str("Keep an eye out and grab yours! 🚀");
        }

        Some(message.trim_end().to_string())
    }

    /// Sends the digest once, or nothing when the run produced no entries.
    pub async fn flush(
        self,
        dispatcher: &NotificationDispatcher,
        cutoff_hour: u32,
    ) -> Option<DispatchReport> {
        let message = self.render(cutoff_hour)?;

        info!(
            price_changes = self.price_changes.len(),
            releases = self.releases.len(),
            "Sending daily summary"
        );
        Some(dispatcher.dispatch(&OutboundMessage::text(message)).await)
    }
}
