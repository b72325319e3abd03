//! Integration tests for admin search and confirmation cards.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use labmarket_client::backend::{Backend, MemoryBackend, Table, by_id};
use labmarket_client::cart::Cart;
use labmarket_client::checkout::submit;
use labmarket_client::confirmation::{Confirmation, Rasterizer};
use labmarket_client::search::{SearchBox, SearchResultKind, search};
use labmarket_core::RequestKind;
use labmarket_integration_tests::{contact, product, seed_products};
use serde_json::json;

/// Emits a minimal PNG regardless of input.
struct StubRasterizer;

impl Rasterizer for StubRasterizer {
    fn rasterize(&self, html: &str) -> Result<Vec<u8>, String> {
        if html.is_empty() {
            return Err("nothing to draw".to_string());
        }
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(&[0, 0, 0, 13]);
        Ok(png)
    }
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_skips_deleted_products() {
    let backend = MemoryBackend::new();
    let seeded = seed_products(&backend, RequestKind::Buy, 2).await;
    backend
        .update(
            Table::Products,
            &by_id(seeded[0].id),
            json!({ "deleted_at": Utc::now() }),
        )
        .await
        .unwrap();

    let results = search(&backend, "instrument").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, seeded[1].id.as_uuid());
    assert_eq!(results[0].kind, SearchResultKind::Product);
}

#[tokio::test]
async fn test_search_caps_each_collection() {
    let backend = MemoryBackend::new();
    seed_products(&backend, RequestKind::Donate, 8).await;

    let results = search(&backend, "Instrument").await.unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn test_search_finds_requests_by_requester() {
    let backend = MemoryBackend::new();
    let mut cart = Cart::new(RequestKind::Buy);
    cart.add(product("Thermocycler", RequestKind::Buy, Some(80_000)));
    submit(&backend, &mut cart, &contact()).await.unwrap();

    let results = search(&backend, "rosalind").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, SearchResultKind::BuyRequest);
    assert_eq!(results[0].kind.route(), "/admin/buy-requests");
    assert_eq!(results[0].email.as_deref(), Some("rosalind@kings.test"));
}

#[tokio::test(start_paused = true)]
async fn test_search_box_settles_on_last_query() {
    let backend = Arc::new(MemoryBackend::new());
    seed_products(&backend, RequestKind::Buy, 2).await;
    let search_box = SearchBox::spawn(backend.clone(), Duration::from_millis(300));
    let mut rx = search_box.watch();

    search_box.set_query("zzz");
    search_box.set_query("instrument 01");

    loop {
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        if !state.loading && !state.query.is_empty() {
            assert_eq!(state.query, "instrument 01");
            assert_eq!(state.results.len(), 1);
            assert!(state.is_open());
            break;
        }
    }

    search_box.clear();
    loop {
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        if !state.loading && state.query.is_empty() {
            assert!(!state.is_open());
            break;
        }
    }
}

// =============================================================================
// Confirmation Export
// =============================================================================

#[tokio::test]
async fn test_confirmation_export_of_submission() {
    let backend = MemoryBackend::new();
    let mut cart = Cart::new(RequestKind::Donate);
    cart.add(product("Biosafety Cabinet", RequestKind::Donate, None));
    let submission = submit(&backend, &mut cart, &contact()).await.unwrap();

    let card = Confirmation::for_submission(&submission);
    let html = card.render_html().unwrap();
    assert!(html.contains("Donation Request Confirmation"));
    assert!(html.contains("Items for Donation"));
    assert!(html.contains("Biosafety Cabinet"));
    assert!(html.contains(&submission.request_id.to_string()));

    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let export = card.export_png(&StubRasterizer, at).unwrap();
    assert_eq!(
        export.file_name,
        format!("donate-confirmation-{}.png", at.timestamp_millis())
    );
    assert!(export.data_url.starts_with("data:image/png;base64,"));
}
