//! Equipment listings.

use chrono::{DateTime, Utc};
use labmarket_core::{Price, ProductId, ProductStatus, RequestKind, SellerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::backend::Table;

/// A listed piece of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Free text for buy listings, a [`DonateCategory`] name for donations.
    ///
    /// [`DonateCategory`]: labmarket_core::DonateCategory
    #[serde(default)]
    pub category: Option<String>,
    /// Only buy listings carry a price.
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub status: ProductStatus,
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    pub created_at: DateTime<Utc>,
    /// Set by a soft delete; such rows are excluded from every read.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Price used for totals; unpriced listings count as zero.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        self.price.unwrap_or(Price::ZERO)
    }

    /// Whether the listing has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Entity for Product {
    const TABLE: Table = Table::Products;

    fn uuid(&self) -> Uuid {
        self.id.as_uuid()
    }
}
