// Integration tests for Catalog Watcher
// These drive the pipeline end to end against a scripted browser.

pub mod discovery_tests;
pub mod pipeline_tests;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use catalog_watcher::browser::{BrowserDriver, FingerprintProfile, NavigationResponse};
use catalog_watcher::config::{CatalogConfig, SiteConfig};
use catalog_watcher::plugins::traits::NotificationResult;
use catalog_watcher::plugins::{NotifierPlugin, OutboundMessage};
use catalog_watcher::{AppError, Result};

pub const CATALOG_URL: &str = "https://shop.example.com/nav/shoes";
pub const GRID: &str = "[data-testid=\"products-search-3\"]";
pub const PAGINATION: &str = "#section-pagination ol a:last-child";

pub fn site_config() -> SiteConfig {
    SiteConfig {
        source: "nike".to_string(),
        pagination_selector: PAGINATION.to_string(),
        grid_selector: GRID.to_string(),
        item_anchor_selector: format!("{} a", GRID),
        modal_selectors: vec!["button#adopt-accept-all-button".to_string()],
        payload_expression: "window.__NEXT_DATA__?.props?.pageProps?.product".to_string(),
    }
}

pub fn catalog_config(urls: &[&str]) -> CatalogConfig {
    CatalogConfig {
        urls: urls.iter().map(|u| u.to_string()).collect(),
        sorting: Some("DescReleaseDate".to_string()),
    }
}

pub fn page_url(catalog_url: &str, page: u32) -> String {
    format!("{}?page={}&sorting=DescReleaseDate", catalog_url, page)
}

pub fn item_url(code: &str) -> String {
    format!("https://shop.example.com/p/{}", code)
}

pub fn timeout() -> Duration {
    Duration::from_secs(60)
}

/// Product payload the way the detail page embeds it.
pub fn product_payload(code: &str, price: i64, stocked: bool) -> Value {
    json!({
        "code": code,
        "name": format!("Sneaker {}", code),
        "brand": "Nike",
        "nickname": "White/Black",
        "isReleased": true,
        "releaseDate": null,
        "priceInfos": { "price": price, "originalPrice": price },
        "sizes": [
            { "description": "40", "hasStock": true },
            { "description": "41", "hasStock": stocked },
        ],
        "images": [
            { "url": format!("https://img.example.com/{}-1.jpg", code), "order": 2 },
            { "url": format!("https://img.example.com/{}-2.jpg", code), "order": 1 },
        ],
    })
}

/// One scripted response to a detail page visit.
#[derive(Debug, Clone)]
pub enum ItemVisit {
    Denied,
    Empty,
    Payload(Value),
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub status: Option<u16>,
    pub selectors: HashSet<String>,
    pub hrefs: Vec<String>,
    pub text: Option<String>,
    pub payload: Option<Value>,
}

impl FakePage {
    pub fn catalog(total_pages: u32) -> Self {
        Self {
            status: Some(200),
            selectors: [PAGINATION.to_string(), GRID.to_string()].into(),
            text: Some(total_pages.to_string()),
            ..Default::default()
        }
    }

    pub fn listing(hrefs: Vec<String>) -> Self {
        Self {
            status: Some(200),
            selectors: [GRID.to_string()].into(),
            hrefs,
            ..Default::default()
        }
    }

    pub fn item(payload: Value) -> Self {
        Self {
            status: Some(200),
            payload: Some(payload),
            ..Default::default()
        }
    }
}

/// Scripted stand-in for the browser session.
#[derive(Debug, Default)]
pub struct FakeDriver {
    pages: HashMap<String, FakePage>,
    visits: HashMap<String, VecDeque<ItemVisit>>,
    current: Option<String>,
    pub navigations: Vec<(String, Option<String>)>,
    pub item_visits: Vec<(String, Instant)>,
    pub recreations: Vec<FingerprintProfile>,
    pub closed: bool,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, page: FakePage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    /// Queues responses for successive visits to `url`; once drained the
    /// registered page is served.
    pub fn visits(mut self, url: impl Into<String>, visits: Vec<ItemVisit>) -> Self {
        self.visits.insert(url.into(), visits.into());
        self
    }

    /// A catalog with `pages` listing pages, `items[n]` listed on page `n + 1`.
    pub fn with_catalog(mut self, catalog_url: &str, items: Vec<Vec<String>>) -> Self {
        self = self.page(catalog_url, FakePage::catalog(items.len() as u32));
        for (index, hrefs) in items.into_iter().enumerate() {
            self = self.page(page_url(catalog_url, index as u32 + 1), FakePage::listing(hrefs));
        }
        self
    }

    pub fn visit_times(&self, url: &str) -> Vec<Instant> {
        self.item_visits
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, at)| *at)
            .collect()
    }

    fn current_page(&self) -> Option<&FakePage> {
        self.current.as_ref().and_then(|url| self.pages.get(url))
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&mut self, url: &str, referer: Option<&str>) -> Result<NavigationResponse> {
        self.navigations.push((url.to_string(), referer.map(str::to_string)));

        if let Some(queue) = self.visits.get_mut(url) {
            self.item_visits.push((url.to_string(), Instant::now()));
            if let Some(visit) = queue.pop_front() {
                let page = match visit {
                    ItemVisit::Denied => FakePage {
                        status: Some(403),
                        ..Default::default()
                    },
                    ItemVisit::Empty => FakePage {
                        status: Some(200),
                        ..Default::default()
                    },
                    ItemVisit::Payload(payload) => FakePage::item(payload),
                };
                let status = page.status;
                let scripted = format!("{}#visit", url);
                self.pages.insert(scripted.clone(), page);
                self.current = Some(scripted);
                return Ok(NavigationResponse {
                    status,
                    final_url: url.to_string(),
                });
            }
        } else if self.pages.get(url).is_some_and(|p| p.payload.is_some()) {
            self.item_visits.push((url.to_string(), Instant::now()));
        }

        match self.pages.get(url) {
            Some(page) => {
                let status = page.status;
                self.current = Some(url.to_string());
                Ok(NavigationResponse {
                    status,
                    final_url: url.to_string(),
                })
            }
            None => Err(AppError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> Result<()> {
        match self.current_page() {
            Some(page) if page.selectors.contains(selector) => Ok(()),
            _ => Err(AppError::Timeout {
                selector: selector.to_string(),
            }),
        }
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Option<Value>> {
        if !expression.contains("window.location.href") {
            return Ok(None);
        }

        let url = self.current.clone().unwrap_or_default();
        let url = url.trim_end_matches("#visit").to_string();
        let product = self.current_page().and_then(|p| p.payload.clone());
        Ok(Some(json!({ "url": url, "product": product })))
    }

    async fn extract_all_hrefs(&mut self, _selector: &str) -> Result<Vec<String>> {
        Ok(self.current_page().map(|p| p.hrefs.clone()).unwrap_or_default())
    }

    async fn text_content(&mut self, _selector: &str) -> Result<Option<String>> {
        Ok(self.current_page().and_then(|p| p.text.clone()))
    }

    async fn recreate_session(&mut self, profile: &FingerprintProfile) -> Result<()> {
        self.recreations.push(profile.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Notifier that records every message it is handed.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    fn description(&self) -> &str {
        "Keeps sent messages in memory"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<NotificationResult> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(NotificationResult {
            success: true,
            message_id: None,
            error: None,
        })
    }
}
