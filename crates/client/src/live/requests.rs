//! Buy and donate request queues for the admin views.

use labmarket_core::{RequestId, RequestKind, RequestStatus};
use serde_json::json;

use super::{ListFilter, LiveList, patch_item};
use crate::backend::{ChannelSpec, Filter, Query, Table, by_id};
use crate::error::MarketError;
use crate::models::{Product, Request, RequestLine};

/// Requests of one kind, optionally narrowed by status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    pub kind: RequestKind,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    /// Every request of `kind`.
    #[must_use]
    pub const fn kind(kind: RequestKind) -> Self {
        Self { kind, status: None }
    }
}

impl ListFilter for RequestFilter {
    type Item = Request;

    fn query(&self) -> Query {
        Query::on(Table::Requests)
            .eq("type", self.kind)
            .eq_opt("status", self.status)
            .newest_first()
    }

    fn channel(&self) -> ChannelSpec {
        ChannelSpec::typed(Table::Requests, self.kind)
    }
}

/// A live page of requests.
pub type RequestList = LiveList<RequestFilter>;

impl LiveList<RequestFilter> {
    /// Approve or reject a pending request.
    ///
    /// The transition is checked against the stored status, and the write
    /// only applies while the row still holds that status.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidTransition`] unless the request is pending and
    ///   `status` is approved or rejected, including when it was decided
    ///   between the read and the write
    /// - [`MarketError::NotFound`] if the request does not exist
    /// - [`MarketError::Backend`] if a read or the write fails
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
    ) -> Result<(), MarketError> {
        let current = self.stored_status(id).await?;
        if !current.can_transition_to(status) {
            return Err(MarketError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        let [id_filter] = by_id(id);
        let filters = [
            id_filter,
            Filter::Eq {
                column: "status",
                value: current.to_string(),
            },
        ];
        let write = self
            .backend()
            .update(Table::Requests, &filters, json!({ "status": status }));

        let changed = self
            .write_then_patch(write, |state| {
                patch_item(&mut state.items, id.as_uuid(), |r| r.status = status);
            })
            .await?;

        if changed == 0 {
            let from = self.stored_status(id).await?;
            tracing::warn!(request_id = %id, %from, "request changed before the write");
            return Err(MarketError::InvalidTransition { from, to: status });
        }

        tracing::info!(request_id = %id, %status, "request status updated");
        Ok(())
    }

    /// Products and quantities attached to request `id`.
    ///
    /// Lines whose product has since disappeared are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Backend`] if any read fails.
    pub async fn line_items(&self, id: RequestId) -> Result<Vec<(Product, u32)>, MarketError> {
        let lines: Vec<RequestLine> = self
            .backend()
            .select(&Query::on(Table::RequestProducts).eq("request_id", id))
            .await?
            .decode()?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self
                .backend()
                .select(&Query::on(Table::Products).eq("id", line.product_id).limit(1))
                .await?
                .decode::<Product>()?
                .into_iter()
                .next();
            match product {
                Some(product) => items.push((product, line.quantity)),
                None => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        "request line points at a missing product"
                    );
                }
            }
        }
        Ok(items)
    }

    async fn stored_status(&self, id: RequestId) -> Result<RequestStatus, MarketError> {
        self.backend()
            .select(&Query::on(Table::Requests).eq("id", id).limit(1))
            .await?
            .decode::<Request>()?
            .into_iter()
            .next()
            .map(|r| r.status)
            .ok_or_else(|| MarketError::NotFound(format!("request {id}")))
    }
}
