use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

use crate::browser::BrowserDriver;
use crate::config::{CatalogConfig, SiteConfig};
use crate::models::DiscoveryRecord;
use crate::{AppError, Result};

static PAGE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("page number pattern is valid"));

/// Walks paginated catalog listings and collects item links.
pub struct CatalogCrawler {
    site: SiteConfig,
    sorting: Option<String>,
    timeout: Duration,
}

impl CatalogCrawler {
    pub fn new(site: SiteConfig, catalog: &CatalogConfig, timeout: Duration) -> Self {
        Self {
            site,
            sorting: catalog.sorting.clone(),
            timeout,
        }
    }

    /// `{catalog}?page={n}&sorting={sorting}`, keeping any existing query.
    pub fn page_url(&self, catalog_url: &str, page: u32) -> Result<String> {
        let mut url = Url::parse(catalog_url).map_err(|e| AppError::Discovery {
            catalog_url: catalog_url.to_string(),
            message: format!("invalid URL: {}", e),
        })?;

        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "page" && k != "sorting")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut query = url.query_pairs_mut();
            query.clear();
            for (k, v) in &retained {
                query.append_pair(k, v);
            }
            query.append_pair("page", &page.to_string());
            if let Some(sorting) = &self.sorting {
                query.append_pair("sorting", sorting);
            }
        }

        Ok(url.to_string())
    }

    /// Enumerates every item on every page of one catalog. Any failure aborts
    /// this catalog only; there is no retry at this level.
    pub async fn discover(
        &self,
        driver: &mut dyn BrowserDriver,
        catalog_url: &str,
    ) -> Result<Vec<DiscoveryRecord>> {
        let fail = |message: String| AppError::Discovery {
            catalog_url: catalog_url.to_string(),
            message,
        };

        let response = driver
            .navigate(catalog_url, None)
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !response.is_success() {
            return Err(fail(format!("catalog responded with {:?}", response.status)));
        }

        driver
            .dismiss_modals(&self.site.modal_selectors)
            .await
            .map_err(|e| fail(e.to_string()))?;
        driver
            .wait_for_selector(&self.site.pagination_selector, self.timeout)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let total_pages = driver
            .text_content(&self.site.pagination_selector)
            .await
            .map_err(|e| fail(e.to_string()))?
            .as_deref()
            .and_then(parse_page_count)
            .ok_or_else(|| fail("unable to read page count".to_string()))?;

        info!(catalog_url, total_pages, "Resolved catalog page count");

        let mut records = Vec::new();
        for page in 1..=total_pages {
            info!(page, total_pages, "Scraping catalog page for item URLs");

            let page_url = self.page_url(catalog_url, page)?;
            driver
                .navigate(&page_url, None)
                .await
                .map_err(|e| fail(e.to_string()))?;
            driver
                .wait_for_selector(&self.site.grid_selector, self.timeout)
                .await
                .map_err(|e| fail(format!("page {}: {}", page, e)))?;

            let item_urls = driver
                .extract_all_hrefs(&self.site.item_anchor_selector)
                .await
                .map_err(|e| fail(e.to_string()))?;

            records.extend(
                item_urls
                    .into_iter()
                    .map(|item_url| DiscoveryRecord::new(catalog_url, item_url)),
            );
        }

        Ok(records)
    }

    /// Discovers every configured catalog and deduplicates by item URL.
    /// A failed catalog is logged and contributes nothing.
    pub async fn discover_all(
        &self,
        driver: &mut dyn BrowserDriver,
        catalog_urls: &[String],
    ) -> Vec<DiscoveryRecord> {
        let mut all = Vec::new();

        for catalog_url in catalog_urls {
            info!(catalog_url = %catalog_url, "Discovering items");
            match self.discover(driver, catalog_url).await {
                Ok(records) => all.extend(records),
                Err(e) => error!(catalog_url = %catalog_url, error = %e, "Catalog discovery failed"),
            }
        }

        let records = dedupe_records(all);
        metrics::counter!("watcher_items_discovered").increment(records.len() as u64);
        records
    }
}

/// Reads the first number in the pagination control's text.
pub fn parse_page_count(text: &str) -> Option<u32> {
    PAGE_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Keyed by `item_url`; a later record replaces an earlier one in place.
pub fn dedupe_records(records: impl IntoIterator<Item = DiscoveryRecord>) -> Vec<DiscoveryRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<DiscoveryRecord> = Vec::new();

    for record in records {
        match positions.get(&record.item_url) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(record.item_url.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}
