use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::browser::BrowserDriver;
use crate::config::SiteConfig;
use crate::models::{DiscoveryRecord, ItemSnapshot, ProductPayload};
use crate::{AppError, Result};

/// Turns one discovery record into a snapshot.
///
/// `Ok(None)` means the page loaded but carried no product payload; callers
/// treat that as a transient miss.
#[async_trait]
pub trait ItemExtractor: Send + Sync {
    async fn extract(
        &self,
        driver: &mut dyn BrowserDriver,
        record: &DiscoveryRecord,
    ) -> Result<Option<ItemSnapshot>>;
}

#[derive(Debug, Deserialize)]
struct EmbeddedPage {
    url: Option<String>,
    product: Option<ProductPayload>,
}

pub struct DetailExtractor {
    site: SiteConfig,
    timeout: Duration,
}

impl DetailExtractor {
    pub fn new(site: SiteConfig, timeout: Duration) -> Self {
        Self { site, timeout }
    }

    fn payload_script(&self) -> String {
        format!(
            "({{ url: window.location.href, product: ({}) ?? null }})",
            self.site.payload_expression
        )
    }

    /// Loads the listing page the item was found on; detail pages are gated
    /// on having come from it.
    async fn prime(&self, driver: &mut dyn BrowserDriver, record: &DiscoveryRecord) -> Result<()> {
        let response = driver.navigate(&record.catalog_referer, None).await?;

        if response.is_access_denied() {
            return Err(AppError::AccessDenied {
                status: response.status.unwrap_or_default(),
            });
        }
        if !response.is_success() {
            return Err(AppError::Navigation {
                url: record.catalog_referer.clone(),
                message: format!("unexpected status {:?}", response.status),
            });
        }

        driver.dismiss_modals(&self.site.modal_selectors).await?;
        driver.wait_for_selector(&self.site.grid_selector, self.timeout).await
    }
}

#[async_trait]
impl ItemExtractor for DetailExtractor {
    async fn extract(
        &self,
        driver: &mut dyn BrowserDriver,
        record: &DiscoveryRecord,
    ) -> Result<Option<ItemSnapshot>> {
        self.prime(driver, record).await?;

        let response = driver
            .navigate(&record.item_url, Some(&record.catalog_referer))
            .await?;

        if response.is_access_denied() {
            return Err(AppError::AccessDenied {
                status: response.status.unwrap_or_default(),
            });
        }

        driver.dismiss_modals(&self.site.modal_selectors).await?;

        let Some(value) = driver.evaluate(&self.payload_script()).await? else {
            return Ok(None);
        };

        let page: EmbeddedPage = serde_json::from_value(value)?;
        let Some(product) = page.product else {
            debug!(url = %record.item_url, "Page has no embedded product");
            return Ok(None);
        };

        let url = page.url.unwrap_or(response.final_url);
        Ok(Some(ItemSnapshot::from_payload(&self.site.source, url, product)))
    }
}
