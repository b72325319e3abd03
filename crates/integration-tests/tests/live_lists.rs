//! Integration tests for live paginated lists.
//!
//! Lists re-fetch on every change notification and only ever apply the
//! result of the most recently issued fetch.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use labmarket_client::MarketError;
use labmarket_client::backend::{Backend, ChangeHub, MemoryBackend, Operation, Table, by_id};
use labmarket_client::cart::Cart;
use labmarket_client::checkout::submit;
use labmarket_client::live::{ProductFilter, ProductList, RequestFilter, RequestList};
use labmarket_client::pagination::{PageRequest, Pagination};
use labmarket_core::{ProductStatus, RequestKind, RequestStatus};
use labmarket_integration_tests::{GatedBackend, contact, product, product_row, seed_products};
use serde_json::json;

async fn open_products(
    backend: Arc<dyn Backend>,
    hub: &ChangeHub,
    page: PageRequest,
) -> ProductList {
    ProductList::open(backend, hub.clone(), ProductFilter::default(), page).await
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_last_partial_page() {
    let backend = Arc::new(MemoryBackend::new());
    seed_products(&backend, RequestKind::Buy, 25).await;

    let list = open_products(backend.clone(), backend.hub(), PageRequest::new(3, 12)).await;
    let state = list.snapshot();

    assert_eq!(state.total, 25);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].title, "Instrument 00", "oldest row is last");

    let mut pagination = Pagination::new(state.total, 12);
    assert_eq!(pagination.total_pages(), 3);
    pagination.go_to_page(3);
    assert_eq!(pagination.window(), Some((24, 24)));
    assert!(!pagination.has_next());
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let backend = Arc::new(MemoryBackend::new());
    seed_products(&backend, RequestKind::Buy, 3).await;

    let list = open_products(backend.clone(), backend.hub(), PageRequest::new(5, 10)).await;
    let state = list.snapshot();

    assert!(state.items.is_empty());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_filter_by_kind_and_status() {
    let backend = Arc::new(MemoryBackend::new());
    seed_products(&backend, RequestKind::Buy, 4).await;
    seed_products(&backend, RequestKind::Donate, 2).await;
    backend
        .insert(
            Table::Products,
            vec![product_row(9, RequestKind::Donate, ProductStatus::Pending)],
        )
        .await
        .unwrap();

    let mut list = open_products(backend.clone(), backend.hub(), PageRequest::new(1, 10)).await;
    assert_eq!(list.snapshot().total, 7);

    list.set_filter(ProductFilter {
        kind: Some(RequestKind::Donate),
        status: Some(ProductStatus::Active),
        ..ProductFilter::default()
    })
    .await;
    let state = list.snapshot();
    assert_eq!(state.total, 2);
    assert!(state.items.iter().all(|p| p.kind == RequestKind::Donate));
}

// =============================================================================
// Change Notifications
// =============================================================================

#[tokio::test]
async fn test_last_issued_fetch_wins() {
    let memory = Arc::new(MemoryBackend::new());
    seed_products(&memory, RequestKind::Buy, 1).await;
    let gated = GatedBackend::new(memory.clone());

    let list = open_products(Arc::new(gated.clone()), memory.hub(), PageRequest::new(1, 10)).await;
    assert_eq!(list.snapshot().total, 1);
    let mut rx = list.watch();

    // The manual refresh reads one row, then stalls. Meanwhile an insert
    // triggers a second fetch that sees two rows and completes first.
    let mut gate = gated.hold_next_select();
    let stalled = list.refresh();
    let driver = async {
        gate.reached().await;
        seed_products(&memory, RequestKind::Buy, 1).await;
        while rx.borrow_and_update().total != 2 {
            rx.changed().await.unwrap();
        }
        gate.release();
    };
    tokio::join!(stalled, driver);

    let state = list.snapshot();
    assert_eq!(state.total, 2, "stale one-row result was discarded");
    assert_eq!(state.items.len(), 2);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_typed_channel_ignores_other_kind() {
    let backend = Arc::new(MemoryBackend::new());
    let list = RequestList::open(
        backend.clone(),
        backend.hub().clone(),
        RequestFilter::kind(RequestKind::Donate),
        PageRequest::default(),
    )
    .await;
    let reads_after_open = backend.calls(Operation::Select);

    let mut cart = Cart::new(RequestKind::Buy);
    cart.add(product("Autoclave", RequestKind::Buy, Some(10_000)));
    submit(backend.as_ref(), &mut cart, &contact()).await.unwrap();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(backend.calls(Operation::Select), reads_after_open);
    assert_eq!(list.snapshot().total, 0);
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn test_soft_delete_hides_product() {
    let backend = Arc::new(MemoryBackend::new());
    let seeded = seed_products(&backend, RequestKind::Buy, 3).await;
    let list = open_products(backend.clone(), backend.hub(), PageRequest::new(1, 10)).await;

    list.soft_delete(seeded[1].id).await.unwrap();

    let state = list.snapshot();
    assert_eq!(state.total, 2);
    assert!(state.items.iter().all(|p| p.id != seeded[1].id));
    let stored = backend.rows(Table::Products);
    assert_eq!(stored.len(), 3, "soft delete keeps the row");

    list.refresh().await;
    assert_eq!(list.snapshot().total, 2);
}

#[tokio::test]
async fn test_failed_write_leaves_page_untouched() {
    let backend = Arc::new(MemoryBackend::new());
    let seeded = seed_products(&backend, RequestKind::Buy, 2).await;
    let list = open_products(backend.clone(), backend.hub(), PageRequest::new(1, 10)).await;
    backend.fail_next(Table::Products, Operation::Update, 1);

    let err = list
        .update_status(seeded[0].id, ProductStatus::Inactive)
        .await
        .unwrap_err();

    assert!(matches!(err, MarketError::Backend(_)));
    let state = list.snapshot();
    assert!(state.items.iter().all(|p| p.status == ProductStatus::Active));
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_request_review_is_one_way() {
    let backend = Arc::new(MemoryBackend::new());
    let seeded = seed_products(&backend, RequestKind::Donate, 1).await;
    let mut cart = Cart::new(RequestKind::Donate);
    cart.add(seeded[0].clone());
    let submission = submit(backend.as_ref(), &mut cart, &contact()).await.unwrap();

    let list = RequestList::open(
        backend.clone(),
        backend.hub().clone(),
        RequestFilter::kind(RequestKind::Donate),
        PageRequest::default(),
    )
    .await;

    list.update_status(submission.request_id, RequestStatus::Approved)
        .await
        .unwrap();
    assert_eq!(list.snapshot().items[0].status, RequestStatus::Approved);

    let writes = backend.calls(Operation::Update);
    let err = list
        .update_status(submission.request_id, RequestStatus::Rejected)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "This request has already been approved.");
    assert_eq!(backend.calls(Operation::Update), writes, "nothing written");

    let items = list.line_items(submission.request_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].0.id, seeded[0].id);
    assert_eq!(items[0].1, 1);
}

#[tokio::test]
async fn test_decision_between_read_and_write_is_kept() {
    let memory = Arc::new(MemoryBackend::new());
    let seeded = seed_products(&memory, RequestKind::Buy, 1).await;
    let mut cart = Cart::new(RequestKind::Buy);
    cart.add(seeded[0].clone());
    let submission = submit(memory.as_ref(), &mut cart, &contact()).await.unwrap();
    let id = submission.request_id;

    let gated = GatedBackend::new(memory.clone());
    let list = RequestList::open(
        Arc::new(gated.clone()),
        memory.hub().clone(),
        RequestFilter::kind(RequestKind::Buy),
        PageRequest::default(),
    )
    .await;

    // The status read sees `pending`, then another reviewer approves the
    // request before the rejection is written.
    let mut gate = gated.hold_next_select();
    let reject = list.update_status(id, RequestStatus::Rejected);
    let reviewer = async {
        gate.reached().await;
        memory
            .update(Table::Requests, &by_id(id), json!({ "status": "approved" }))
            .await
            .unwrap();
        gate.release();
    };
    let (result, ()) = tokio::join!(reject, reviewer);

    assert!(matches!(
        result,
        Err(MarketError::InvalidTransition {
            from: RequestStatus::Approved,
            to: RequestStatus::Rejected
        })
    ));
    assert_eq!(memory.rows(Table::Requests)[0]["status"], "approved");
}
