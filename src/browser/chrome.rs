use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{dom, BrowserDriver, FingerprintProfile, NavigationResponse};
use crate::config::BrowserConfig;
use crate::{AppError, Result};

const NAVIGATION_STATUS_SCRIPT: &str = "(() => { const entry = performance.getEntriesByType('navigation')[0]; return entry && entry.responseStatus ? entry.responseStatus : null; })()";

/// `headless_chrome` backed session. Owns exactly one browser process and one tab.
pub struct ChromeSession {
    config: BrowserConfig,
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: BrowserConfig, profile: &FingerprintProfile) -> Result<Self> {
        let (browser, tab) = Self::open(&config, profile)?;
        info!(user_agent = %profile.user_agent, "Browser session launched");
        Ok(Self { config, browser, tab })
    }

    fn open(config: &BrowserConfig, profile: &FingerprintProfile) -> Result<(Browser, Arc<Tab>)> {
        let user_agent_arg = OsString::from(format!("--user-agent={}", profile.user_agent));

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((profile.viewport_width, profile.viewport_height)))
            // Backoff sleeps can outlast the default idle timeout.
            .idle_browser_timeout(Duration::from_secs(30 * 60))
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-backgrounding-occluded-windows"),
                OsStr::new("--disable-renderer-backgrounding"),
                user_agent_arg.as_os_str(),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(config.navigation_timeout());
        tab.set_user_agent(&profile.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;

        Ok((browser, tab))
    }

    fn page_html(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))
    }

    fn navigation_status(&self) -> Option<u16> {
        self.tab
            .evaluate(NAVIGATION_STATUS_SCRIPT, false)
            .ok()
            .and_then(|result| result.value)
            .and_then(|value| value.as_u64())
            .and_then(|status| u16::try_from(status).ok())
    }
}

#[async_trait]
impl BrowserDriver for ChromeSession {
    async fn navigate(&mut self, url: &str, referer: Option<&str>) -> Result<NavigationResponse> {
        let mut headers = HashMap::new();
        if let Some(referer) = referer {
            headers.insert("Referer", referer);
        }
        self.tab
            .set_extra_http_headers(headers)
            .map_err(|e| AppError::Browser(format!("Failed to set headers: {}", e)))?;

        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| AppError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let final_url = {
            let current = self.tab.get_url();
            if current.is_empty() { url.to_string() } else { current }
        };
        let status = self.navigation_status();
        debug!(url, ?status, "Navigated");

        Ok(NavigationResponse { status, final_url })
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|_| AppError::Timeout {
                selector: selector.to_string(),
            })
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Option<serde_json::Value>> {
        // Stringify in the page so objects come back by value.
        let js_code = format!("JSON.stringify(({}) ?? null)", expression);

        let result = self
            .tab
            .evaluate(&js_code, false)
            .map_err(|e| AppError::Browser(format!("Evaluation failed: {}", e)))?;

        match result.value {
            Some(serde_json::Value::String(json)) => {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                Ok(if value.is_null() { None } else { Some(value) })
            }
            _ => Ok(None),
        }
    }

    async fn extract_all_hrefs(&mut self, selector: &str) -> Result<Vec<String>> {
        let html = self.page_html()?;
        dom::hrefs(&html, &self.tab.get_url(), selector)
    }

    async fn text_content(&mut self, selector: &str) -> Result<Option<String>> {
        let html = self.page_html()?;
        dom::last_text(&html, selector)
    }

    async fn recreate_session(&mut self, profile: &FingerprintProfile) -> Result<()> {
        // Build the replacement first so a failed launch keeps the old session.
        let (browser, tab) = Self::open(&self.config, profile)?;
        let _ = self.tab.close(true);

        self.browser = browser;
        self.tab = tab;
        info!(user_agent = %profile.user_agent, "Browser session recreated");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // The browser process exits when `Browser` is dropped.
        let _ = self.tab.close(true);
        debug!(tabs = self.browser.get_tabs().lock().map(|t| t.len()).unwrap_or(0), "Browser session closed");
        Ok(())
    }
}
