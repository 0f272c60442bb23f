use serde::{Deserialize, Serialize};

/// One catalog entry before enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryRecord {
    /// Listing page the item was found on, sent as referer on fetch.
    pub catalog_referer: String,
    pub item_url: String,
}

impl DiscoveryRecord {
    pub fn new(catalog_referer: impl Into<String>, item_url: impl Into<String>) -> Self {
        Self {
            catalog_referer: catalog_referer.into(),
            item_url: item_url.into(),
        }
    }
}
