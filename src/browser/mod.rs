use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;

pub mod chrome;
pub mod dom;

pub use chrome::ChromeSession;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigationResponse {
    /// Main document status; `None` when the browser did not report one.
    pub status: Option<u16>,
    pub final_url: String,
}

impl NavigationResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_none_or(|s| (200..300).contains(&s))
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

/// Identity a fresh session presents to the site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintProfile {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

/// Cycles through the configured user agent pool so each recreated
/// session looks like a different desktop visitor.
#[derive(Debug, Clone)]
pub struct FingerprintRotation {
    user_agents: Vec<String>,
    viewport_width: u32,
    viewport_height: u32,
    next_index: usize,
}

impl FingerprintRotation {
    pub fn new(user_agents: Vec<String>, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            user_agents,
            viewport_width,
            viewport_height,
            next_index: 0,
        }
    }

    pub fn next_profile(&mut self) -> FingerprintProfile {
        let user_agent = if self.user_agents.is_empty() {
            String::new()
        } else {
            let ua = self.user_agents[self.next_index % self.user_agents.len()].clone();
            self.next_index = self.next_index.wrapping_add(1);
            ua
        };

        FingerprintProfile {
            user_agent,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
        }
    }
}

/// The single browsing session the pipeline drives.
///
/// Methods take `&mut self`: there is exactly one live session and only the
/// in-flight item uses it. `recreate_session` must either fully replace the
/// session or leave the old one in place.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str, referer: Option<&str>) -> Result<NavigationResponse>;

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Evaluates a JavaScript expression in the page. `None` when it yields
    /// `null` or `undefined`.
    async fn evaluate(&mut self, expression: &str) -> Result<Option<serde_json::Value>>;

    /// Absolute `href`s of every element matching `selector`.
    async fn extract_all_hrefs(&mut self, selector: &str) -> Result<Vec<String>>;

    /// Trimmed text of the last element matching `selector`.
    async fn text_content(&mut self, selector: &str) -> Result<Option<String>>;

    async fn recreate_session(&mut self, profile: &FingerprintProfile) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    /// Installs a page timer that keeps clicking cookie banners and popups away.
    async fn dismiss_modals(&mut self, selectors: &[String]) -> Result<()> {
        if selectors.is_empty() {
            return Ok(());
        }
        let selectors = serde_json::to_string(selectors)?;
        let script = format!(
            "(() => {{ const selectors = {}; setInterval(() => {{ for (const s of selectors) {{ document.querySelector(s)?.click(); }} }}, 100); return null; }})()",
            selectors
        );
        self.evaluate(&script).await?;
        Ok(())
    }
}
