use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::ItemSnapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriceDirection {
    Up,
    Down,
}

impl PriceDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            PriceDirection::Up => "↑",
            PriceDirection::Down => "↓",
        }
    }
}

/// Display fields of the snapshot that triggered an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDisplay {
    pub name: String,
    pub url: String,
    pub image_url: Option<String>,
    pub available_sizes: Vec<String>,
}

impl From<&ItemSnapshot> for ItemDisplay {
    fn from(snapshot: &ItemSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            url: snapshot.url.clone(),
            image_url: snapshot.first_image_url().map(str::to_string),
            available_sizes: snapshot.available_sizes.clone(),
        }
    }
}

/// Derived from a previous/current snapshot pair; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    PriceChange {
        item: ItemDisplay,
        previous: Decimal,
        current: Decimal,
        percent_change: Decimal,
        direction: PriceDirection,
    },
    Restock {
        item: ItemDisplay,
    },
}

impl ChangeEvent {
    pub fn item(&self) -> &ItemDisplay {
        match self {
            ChangeEvent::PriceChange { item, .. } | ChangeEvent::Restock { item } => item,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeEvent::PriceChange { .. } => "price_change",
            ChangeEvent::Restock { .. } => "restock",
        }
    }

    pub fn message(&self) -> String {
        let item = self.item();
        let sizes = item.available_sizes.join(", ");

        match self {
            ChangeEvent::PriceChange { .. } => format!(
                "⚡ Price change for {}!\n{}\nAvailable sizes: {}\n🛒 Check it out: {}",
                item.name,
                self.price_line().unwrap_or_default(),
                sizes,
                item.url
            ),
            ChangeEvent::Restock { .. } => format!(
                "🚨 Restock for {}!\nAvailable now! ✅\nAvailable sizes: {}\n🛒 Check it out: {}",
                item.name, sizes, item.url
            ),
        }
    }

    /// `Price changed from 100.00 to 65.00 (↓ 35.00%)`
    pub fn price_line(&self) -> Option<String> {
        match self {
            ChangeEvent::PriceChange {
                previous,
                current,
                percent_change,
                direction,
                ..
            } => Some(format!(
                "Price changed from {:.2} to {:.2} ({} {:.2}%)",
                previous,
                current,
                direction.arrow(),
                percent_change.abs()
            )),
            ChangeEvent::Restock { .. } => None,
        }
    }
}
