//! Request submission.
//!
//! # Two-phase write
//!
//! The backend has no multi-statement transaction, so a submission is:
//!
//! 1. Insert the request header (`requests`, status `pending`).
//! 2. Insert one `request_products` row per cart line.
//! 3. If (2) fails, delete the header from (1) and surface the line error.
//!    If that delete fails too, the header is orphaned and
//!    [`MarketError::OrphanedRequest`] names it so it can be reconciled.
//!
//! The cart is cleared only after both phases succeed. Empty carts are
//! rejected before anything is written.

use labmarket_core::{ContactInfo, Price, RequestId, RequestKind, SellerRequestId, SellerStatus};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::backend::{Backend, BackendError, Table, by_id};
use crate::cart::{Cart, CartLine};
use crate::error::{MarketError, add_breadcrumb};
use crate::models::{NewRequest, RequestLine, SellerRegistration};

/// A successfully submitted request, for the confirmation card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub contact: ContactInfo,
    /// Cart contents at submission time.
    pub items: Vec<CartLine>,
}

/// A seller registration that reached the review queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: SellerRequestId,
    pub form: SellerRegistration,
}

#[derive(Deserialize)]
struct Inserted<Id> {
    id: Id,
}

/// First row of an insert response, decoded as its `id`.
fn inserted_id<Id: serde::de::DeserializeOwned>(
    table: Table,
    rows: Vec<Value>,
) -> Result<Id, BackendError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::NotFound(format!("inserted {table} row")))?;
    Ok(serde_json::from_value::<Inserted<Id>>(row)?.id)
}

/// Submit `cart` on behalf of `contact`.
///
/// # Errors
///
/// - [`MarketError::EmptyCart`] before any write when the cart is empty
/// - [`MarketError::Backend`] when the header insert fails, or when the line
///   insert fails and the header was removed again
/// - [`MarketError::OrphanedRequest`] when the line insert and the
///   compensating delete both fail
#[instrument(skip(backend, cart, contact), fields(kind = %cart.kind(), lines = cart.lines().len()))]
pub async fn submit(
    backend: &dyn Backend,
    cart: &mut Cart,
    contact: &ContactInfo,
) -> Result<Submission, MarketError> {
    let kind = cart.kind();
    if cart.is_empty() {
        return Err(MarketError::EmptyCart(kind));
    }

    let header =
        serde_json::to_value(NewRequest::pending(kind, contact)).map_err(BackendError::from)?;
    let rows = backend.insert(Table::Requests, vec![header]).await?;
    let request_id: RequestId = inserted_id(Table::Requests, rows)?;

    let lines = cart
        .lines()
        .iter()
        .map(|line| {
            serde_json::to_value(RequestLine {
                request_id,
                product_id: line.product.id,
                quantity: line.quantity(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(BackendError::from)?;

    if let Err(source) = backend.insert(Table::RequestProducts, lines).await {
        return Err(compensate(backend, request_id, source).await);
    }

    let items = cart.lines().to_vec();
    cart.clear();
    tracing::info!(%request_id, "request submitted");
    let id = request_id.to_string();
    add_breadcrumb(
        "checkout",
        "Request submitted",
        Some(&[("request_id", id.as_str()), ("kind", kind.as_str())]),
    );

    Ok(Submission {
        request_id,
        kind,
        contact: contact.clone(),
        items,
    })
}

/// Remove the header of a half-written request.
async fn compensate(
    backend: &dyn Backend,
    request_id: RequestId,
    source: BackendError,
) -> MarketError {
    tracing::warn!(%request_id, error = %source, "line items failed, removing request header");

    match backend.delete(Table::Requests, &by_id(request_id)).await {
        Ok(()) => MarketError::from(source),
        Err(cleanup) => {
            tracing::error!(
                %request_id,
                error = %source,
                cleanup_error = %cleanup,
                "request header orphaned"
            );
            MarketError::OrphanedRequest {
                request_id,
                source,
                cleanup,
            }
        }
    }
}

/// Queue a seller registration for review.
///
/// # Errors
///
/// Returns [`MarketError::Backend`] if the insert fails.
#[instrument(skip(backend, form), fields(company = %form.company_name))]
pub async fn register_seller(
    backend: &dyn Backend,
    form: SellerRegistration,
) -> Result<Registration, MarketError> {
    let mut row = serde_json::to_value(&form).map_err(BackendError::from)?;
    if let Value::Object(map) = &mut row {
        let status = serde_json::to_value(SellerStatus::Pending).map_err(BackendError::from)?;
        map.insert("status".into(), status);
    }

    let rows = backend.insert(Table::SellerRequests, vec![row]).await?;
    let id = inserted_id(Table::SellerRequests, rows)?;
    tracing::info!(seller_request_id = %id, "seller registration submitted");

    Ok(Registration { id, form })
}

/// Summary shown before a cart is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPreview {
    pub kind: RequestKind,
    /// Sum of line quantities.
    pub total_items: u64,
    /// Buy carts only.
    pub total_amount: Option<Price>,
}

impl CheckoutPreview {
    #[must_use]
    pub fn of(cart: &Cart) -> Self {
        Self {
            kind: cart.kind(),
            total_items: cart.total_quantity(),
            total_amount: cart.total_amount(),
        }
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self.kind {
            RequestKind::Buy => "Review Your Quote Request",
            RequestKind::Donate => "Review Your Donation",
        }
    }

    /// "1 item selected", "3 items selected".
    #[must_use]
    pub fn item_label(&self) -> String {
        let plural = if self.total_items == 1 { "" } else { "s" };
        format!("{} item{plural} selected", self.total_items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, Operation};
    use crate::models::Product;
    use chrono::Utc;
    use labmarket_core::{ProductId, ProductStatus};

    fn product(cents: i64) -> Product {
        Product {
            id: ProductId::generate(),
            title: "Thermal Cycler".to_string(),
            description: None,
            category: None,
            price: Some(Price::from_cents(cents)),
            image_url: None,
            kind: RequestKind::Buy,
            status: ProductStatus::Active,
            seller_id: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn contact() -> ContactInfo {
        ContactInfo::new("Ada", "ada@lab.org", "+1 555 0100").unwrap()
    }

    #[tokio::test]
    async fn test_submit_writes_header_then_lines() {
        let backend = MemoryBackend::new();
        let mut cart = Cart::new(RequestKind::Buy);
        let p = product(500);
        cart.add(p.clone());
        cart.add(p.clone());

        let submission = submit(&backend, &mut cart, &contact()).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(submission.items.len(), 1);
        let headers = backend.rows(Table::Requests);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0]["status"], "pending");
        assert_eq!(headers[0]["type"], "buy");

        let lines = backend.rows(Table::RequestProducts);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["quantity"], 2);
        assert_eq!(lines[0]["request_id"], submission.request_id.to_string());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_before_any_write() {
        let backend = MemoryBackend::new();
        let mut cart = Cart::new(RequestKind::Donate);

        let result = submit(&backend, &mut cart, &contact()).await;
        assert!(matches!(result, Err(MarketError::EmptyCart(RequestKind::Donate))));
        assert_eq!(backend.calls(Operation::Insert), 0);
    }

    #[tokio::test]
    async fn test_header_failure_keeps_cart() {
        let backend = MemoryBackend::new();
        backend.fail_next(Table::Requests, Operation::Insert, 1);
        let mut cart = Cart::new(RequestKind::Buy);
        cart.add(product(100));

        let result = submit(&backend, &mut cart, &contact()).await;
        assert!(matches!(result, Err(MarketError::Backend(_))));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(backend.calls(Operation::Insert), 1);
    }

    #[tokio::test]
    async fn test_register_seller_is_pending() {
        let backend = MemoryBackend::new();
        let form = SellerRegistration::new(
            "Acme Labs",
            "Ada",
            "ada@acme.test",
            "555",
            "",
            "Microscopes",
        )
        .unwrap();

        let registration = register_seller(&backend, form).await.unwrap();
        let rows = backend.rows(Table::SellerRequests);
        assert_eq!(rows[0]["status"], "pending");
        assert_eq!(rows[0]["id"], registration.id.to_string());
        assert_eq!(rows[0]["email"], "ada@acme.test");
    }

    #[test]
    fn test_preview() {
        let mut cart = Cart::new(RequestKind::Buy);
        let p = product(1999);
        cart.add(p.clone());
        cart.set_quantity(p.id, 3);

        let preview = CheckoutPreview::of(&cart);
        assert_eq!(preview.item_label(), "3 items selected");
        assert_eq!(preview.total_amount.unwrap().to_string(), "59.97");
        assert_eq!(preview.title(), "Review Your Quote Request");
    }
}
