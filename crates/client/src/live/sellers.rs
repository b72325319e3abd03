//! Seller accounts for moderation.

use labmarket_core::{SellerId, SellerStatus};
use serde_json::json;

use super::{ListFilter, LiveList, patch_item};
use crate::backend::{ChannelSpec, Query, Table, by_id};
use crate::error::MarketError;
use crate::models::Seller;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerFilter {
    pub status: Option<SellerStatus>,
}

impl ListFilter for SellerFilter {
    type Item = Seller;

    fn query(&self) -> Query {
        Query::on(Table::Sellers)
            .eq_opt("status", self.status)
            .newest_first()
    }

    fn channel(&self) -> ChannelSpec {
        ChannelSpec::table(Table::Sellers)
    }
}

/// A live page of sellers.
pub type SellerList = LiveList<SellerFilter>;

impl LiveList<SellerFilter> {
    /// Activate, suspend or ban a seller.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Backend`] if the write fails.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: SellerId,
        status: SellerStatus,
    ) -> Result<(), MarketError> {
        let filters = by_id(id);
        let write = self
            .backend()
            .update(Table::Sellers, &filters, json!({ "status": status }));

        self.write_then_patch(write, |state| {
            patch_item(&mut state.items, id.as_uuid(), |s| s.status = status);
        })
        .await
        .map(drop)
    }
}
