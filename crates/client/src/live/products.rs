//! Product listings, for the storefront grids and product moderation.

use chrono::Utc;
use labmarket_core::{ProductId, ProductStatus, RequestKind, SellerId};
use serde_json::json;

use super::{ListFilter, LiveList, patch_item};
use crate::backend::{ChannelSpec, Query, Table, by_id};
use crate::error::MarketError;
use crate::models::Product;

/// Which products a list shows. Soft-deleted rows are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub kind: Option<RequestKind>,
    pub status: Option<ProductStatus>,
    pub category: Option<String>,
    pub seller_id: Option<SellerId>,
}

impl ListFilter for ProductFilter {
    type Item = Product;

    fn query(&self) -> Query {
        Query::on(Table::Products)
            .is_null("deleted_at")
            .eq_opt("type", self.kind)
            .eq_opt("status", self.status)
            .eq_opt("category", self.category.as_deref())
            .eq_opt("seller_id", self.seller_id)
            .newest_first()
    }

    fn channel(&self) -> ChannelSpec {
        ChannelSpec::table(Table::Products)
    }
}

/// A live page of products.
pub type ProductList = LiveList<ProductFilter>;

impl LiveList<ProductFilter> {
    /// Set a product's listing status.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Backend`] if the write fails; the cached page
    /// is then left unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<(), MarketError> {
        let filters = by_id(id);
        let write = self
            .backend()
            .update(Table::Products, &filters, json!({ "status": status }));

        self.write_then_patch(write, |state| {
            patch_item(&mut state.items, id.as_uuid(), |p| p.status = status);
        })
        .await
        .map(drop)
    }

    /// Soft-delete a product: stamp `deleted_at` so reads skip it.
    ///
    /// On success the product leaves the cached page and the total drops by
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Backend`] if the write fails.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, id: ProductId) -> Result<(), MarketError> {
        let filters = by_id(id);
        let write = self
            .backend()
            .update(Table::Products, &filters, json!({ "deleted_at": Utc::now() }));

        self.write_then_patch(write, |state| {
            let before = state.items.len();
            state.items.retain(|p| p.id != id);
            if state.items.len() < before {
                state.total = state.total.saturating_sub(1);
            }
        })
        .await
        .map(drop)
    }
}
