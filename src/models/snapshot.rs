use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Full extracted state of one item at one point in time.
///
/// Snapshots are never mutated after extraction; a changed item is persisted
/// by replacing the stored snapshot wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub source: String,
    pub code: String,
    pub name: String,
    pub brand: Option<String>,
    pub collection: Option<String>,
    pub colorway: Option<String>,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub stocked: bool,
    pub released: bool,
    pub release_date: Option<DateTime<FixedOffset>>,
    pub original_price: Option<Decimal>,
    pub promotional_price: Option<Decimal>,
    #[serde(default)]
    pub available_sizes: Vec<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductImage {
    pub url: String,
    pub description: Option<String>,
}

/// Product payload as embedded in the detail page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub code: String,
    pub name: String,
    pub brand: Option<String>,
    pub collection: Option<String>,
    pub nickname: Option<String>,
    pub description: Option<String>,
    pub gender: Option<String>,
    #[serde(default)]
    pub sizes: Vec<SizePayload>,
    #[serde(default)]
    pub is_released: bool,
    pub release_date: Option<String>,
    #[serde(default)]
    pub price_infos: PriceInfosPayload,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizePayload {
    #[serde(alias = "label", alias = "size")]
    pub description: Option<String>,
    #[serde(default)]
    pub has_stock: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfosPayload {
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub promotional_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub url: String,
    pub description: Option<String>,
    pub order: Option<i64>,
}

impl ItemSnapshot {
    pub fn from_payload(source: &str, url: String, payload: ProductPayload) -> Self {
        // An empty size list counts as fully stocked, same as the site reports it.
        let stocked = payload.sizes.iter().all(|s| s.has_stock);
        let available_sizes = payload
            .sizes
            .iter()
            .filter(|s| s.has_stock)
            .filter_map(|s| s.description.clone())
            .collect();

        let original_price = payload.price_infos.original_price.or(payload.price_infos.price);
        let promotional_price = payload
            .price_infos
            .promotional_price
            .filter(|promo| Some(*promo) != original_price);

        // Images keep the order the page lists them in.
        let images = payload
            .images
            .into_iter()
            .map(|i| ProductImage {
                url: i.url,
                description: i.description,
            })
            .collect();

        Self {
            source: source.to_string(),
            code: payload.code,
            name: payload.name,
            brand: payload.brand,
            collection: payload.collection,
            colorway: payload.nickname,
            description: payload.description,
            gender: payload.gender,
            stocked,
            released: payload.is_released,
            release_date: payload.release_date.as_deref().and_then(parse_release_date),
            original_price,
            promotional_price,
            available_sizes,
            images,
            url,
        }
    }

    /// Persistence key, `{source}:{code}`.
    pub fn store_key(&self) -> String {
        store_key(&self.source, &self.code)
    }

    /// Promotional price when a promotion is active, otherwise the original price.
    pub fn effective_price(&self) -> Option<Decimal> {
        self.promotional_price.or(self.original_price)
    }

    pub fn first_image_url(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

pub fn store_key(source: &str, code: &str) -> String {
    format!("{}:{}", source, code)
}

/// Accepts RFC 3339 timestamps; offset-less timestamps are read as UTC.
pub fn parse_release_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}
