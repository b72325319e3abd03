//! Integration test support for LabMarket.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p labmarket-integration-tests
//! ```
//!
//! Everything runs against [`MemoryBackend`]; no hosted backend is needed.
//! [`GatedBackend`] wraps it to hold a read mid-flight so tests can
//! interleave a change notification with an in-flight fetch.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use labmarket_client::backend::{Backend, BackendError, Filter, MemoryBackend, Query, Rows, Table};
use labmarket_client::models::Product;
use labmarket_core::{ContactInfo, Price, ProductId, ProductStatus, RequestKind};
use serde_json::{Value, json};
use tokio::sync::oneshot;

// =============================================================================
// Fixtures
// =============================================================================

/// Fixed base time so `created_at` ordering is deterministic.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A product row; `n` orders rows by creation time.
#[must_use]
pub fn product_row(n: u32, kind: RequestKind, status: ProductStatus) -> Value {
    let price = match kind {
        RequestKind::Buy => json!(format!("{}.00", 100 + n)),
        RequestKind::Donate => Value::Null,
    };
    json!({
        "title": format!("Instrument {n:02}"),
        "description": "Bench-top unit, serviced",
        "category": "Microscopes",
        "price": price,
        "type": kind,
        "status": status,
        "created_at": (base_time() + Duration::minutes(i64::from(n))).to_rfc3339(),
    })
}

/// Insert `count` active products of `kind`.
///
/// # Panics
///
/// Panics if the insert fails.
#[allow(clippy::unwrap_used)]
pub async fn seed_products(backend: &MemoryBackend, kind: RequestKind, count: u32) -> Vec<Product> {
    let rows = (0..count)
        .map(|n| product_row(n, kind, ProductStatus::Active))
        .collect();
    let stored = backend.insert(Table::Products, rows).await.unwrap();
    stored
        .into_iter()
        .map(|row| serde_json::from_value(row).unwrap())
        .collect()
}

/// A product value that never touched a backend.
#[must_use]
pub fn product(title: &str, kind: RequestKind, cents: Option<i64>) -> Product {
    Product {
        id: ProductId::generate(),
        title: title.to_string(),
        description: None,
        category: Some("Centrifuges".to_string()),
        price: cents.map(Price::from_cents),
        image_url: None,
        kind,
        status: ProductStatus::Active,
        seller_id: None,
        created_at: base_time(),
        deleted_at: None,
    }
}

/// # Panics
///
/// Panics if the fixture contact is invalid.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn contact() -> ContactInfo {
    ContactInfo::new("Rosalind Franklin", "rosalind@kings.test", "+44 20 7946 0000").unwrap()
}

// =============================================================================
// Gated backend
// =============================================================================

/// Handle on a held read.
#[derive(Debug)]
pub struct Gate {
    reached: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

impl Gate {
    /// Wait until the held read has taken its snapshot.
    pub async fn reached(&mut self) {
        let _ = (&mut self.reached).await;
    }

    /// Let the held read return.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

type Held = (oneshot::Sender<()>, oneshot::Receiver<()>);

/// [`MemoryBackend`] whose next read can be held after it has read its rows.
#[derive(Clone)]
pub struct GatedBackend {
    inner: Arc<MemoryBackend>,
    held: Arc<Mutex<Option<Held>>>,
}

impl GatedBackend {
    #[must_use]
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self {
            inner,
            held: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<MemoryBackend> {
        &self.inner
    }

    /// Hold the next `select` until the returned gate is released.
    #[must_use]
    pub fn hold_next_select(&self) -> Gate {
        let (reached_tx, reached) = oneshot::channel();
        let (release, release_rx) = oneshot::channel();
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = Some((reached_tx, release_rx));
        Gate { reached, release }
    }
}

#[async_trait]
impl Backend for GatedBackend {
    async fn select(&self, query: &Query) -> Result<Rows, BackendError> {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner).take();
        let rows = self.inner.select(query).await;
        if let Some((reached, release)) = held {
            let _ = reached.send(());
            let _ = release.await;
        }
        rows
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        self.inner.insert(table, rows).await
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<u64, BackendError> {
        self.inner.update(table, filters, patch).await
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError> {
        self.inner.delete(table, filters).await
    }
}
