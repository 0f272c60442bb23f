use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info};

use crate::config::WhatsAppConfig;
use crate::plugins::traits::{NotificationResult, NotifierPlugin, OutboundMessage};
use crate::Result;

/// Sends to a WhatsApp group through an Evolution API instance.
pub struct WhatsAppNotifier {
    client: Client,
    config: WhatsAppConfig,
}

impl WhatsAppNotifier {
    pub fn new(config: WhatsAppConfig) -> Self {
        WhatsAppNotifier {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, message: &OutboundMessage) -> String {
        let action = if message.image_url.is_some() {
            "sendMedia"
        } else {
            "sendText"
        };
        format!(
            "{}/message/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            action,
            self.config.instance
        )
    }

    fn create_payload(&self, message: &OutboundMessage) -> serde_json::Value {
        let options = json!({
            "delay": self.config.delay_ms,
            "presence": "composing",
            "linkPreview": false
        });

        match &message.image_url {
            Some(image_url) => json!({
                "number": self.config.number,
                "options": options,
                "mediaMessage": {
                    "mediatype": "image",
                    "caption": message.text,
                    "media": image_url
                }
            }),
            None => json!({
                "number": self.config.number,
                "options": options,
                "textMessage": {
                    "text": message.text
                }
            }),
        }
    }
}

#[async_trait]
impl NotifierPlugin for WhatsAppNotifier {
    fn name(&self) -> &str {
        "WhatsApp Notifier"
    }

    fn plugin_type(&self) -> &str {
        "whatsapp"
    }

    fn description(&self) -> &str {
        "Sends text and image messages to a WhatsApp chat via Evolution API"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<NotificationResult> {
        let response = self
            .client
            .post(self.endpoint(message))
            .header("ApiKey", &self.config.api_key)
            .json(&self.create_payload(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "Failed to send message to WhatsApp");
            return Ok(NotificationResult {
                success: false,
                message_id: None,
                error: Some(format!("WhatsApp API responded with {}", status)),
            });
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message_id = body["key"]["id"].as_str().map(str::to_string);
        info!(?message_id, "Message sent to WhatsApp channel");

        Ok(NotificationResult {
            success: true,
            message_id,
            error: None,
        })
    }
}
