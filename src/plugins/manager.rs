use tracing::{error, info, warn};

use super::notifiers::{DiscordNotifier, WhatsAppNotifier};
use super::traits::{NotifierPlugin, OutboundMessage};
use crate::config::NotificationsConfig;

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans a message out to every registered channel.
///
/// Delivery is fire-and-forget: failures are logged and counted, never
/// returned to the caller.
#[derive(Default)]
pub struct NotificationDispatcher {
    notifiers: Vec<NotifierPluginBox>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &NotificationsConfig) -> Self {
        let mut dispatcher = Self::new();

        if let Some(whatsapp) = &config.whatsapp {
            dispatcher.register(Box::new(WhatsAppNotifier::new(whatsapp.clone())));
        }
        if let Some(discord) = &config.discord {
            dispatcher.register(Box::new(DiscordNotifier::new(discord.clone())));
        }

        if dispatcher.is_empty() {
            warn!("No notification channel configured; messages will only be logged");
        }
        dispatcher
    }

    pub fn register(&mut self, plugin: NotifierPluginBox) {
        info!(channel = plugin.plugin_type(), "Registered notifier");
        self.notifiers.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn list_notifier_types(&self) -> Vec<String> {
        self.notifiers.iter().map(|n| n.plugin_type().to_string()).collect()
    }

    pub async fn dispatch(&self, message: &OutboundMessage) -> DispatchReport {
        let mut report = DispatchReport::default();

        if self.notifiers.is_empty() {
            info!(text = %message.text, "Notification (no channel configured)");
            return report;
        }

        for notifier in &self.notifiers {
            let channel = notifier.plugin_type();
            match notifier.send(message).await {
                Ok(result) if result.success => {
                    report.delivered += 1;
                    metrics::counter!("watcher_notifications_sent", "channel" => channel.to_string())
                        .increment(1);
                }
                Ok(result) => {
                    report.failed += 1;
                    metrics::counter!("watcher_notifications_failed", "channel" => channel.to_string())
                        .increment(1);
                    error!(channel, error = ?result.error, "Notification rejected");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("watcher_notifications_failed", "channel" => channel.to_string())
                        .increment(1);
                    error!(channel, error = %e, "Notification delivery failed");
                }
            }
        }

        report
    }
}
