use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::DiscordConfig;
use crate::plugins::traits::{NotificationResult, NotifierPlugin, OutboundMessage};
use crate::Result;

const DEFAULT_USERNAME: &str = "Catalog Watcher";

pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Self {
        DiscordNotifier {
            client: Client::new(),
            config,
        }
    }

    fn create_webhook_payload(&self, message: &OutboundMessage) -> serde_json::Value {
        let mut payload = json!({
            "content": message.text,
            "username": self.config.username.as_deref().unwrap_or(DEFAULT_USERNAME),
        });

        if let Some(image_url) = &message.image_url {
            payload["embeds"] = json!([{ "image": { "url": image_url } }]);
        }

        payload
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    fn description(&self) -> &str {
        "Sends notifications via Discord webhooks"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<NotificationResult> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.create_webhook_payload(message))
            .send()
            .await?;

        let status = response.status();
        Ok(NotificationResult {
            success: status.is_success(),
            message_id: None,
            error: (!status.is_success()).then(|| format!("Discord webhook responded with {}", status)),
        })
    }
}
