//! Admin search-as-you-type.
//!
//! One query searches products (title/description), sellers (company
//! name/email) and requests (requester name/email), a few rows each, and
//! merges them into typed results that know which admin view to open.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use labmarket_core::RequestKind;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::{Backend, Query, Table};
use crate::error::{MarketError, report};
use crate::models::{Product, Request, Seller};

/// Rows fetched per collection.
const RESULTS_PER_TABLE: u64 = 3;

/// What a search hit points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchResultKind {
    Product,
    Seller,
    BuyRequest,
    DonateRequest,
}

impl SearchResultKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Seller => "seller",
            Self::BuyRequest => "buy-request",
            Self::DonateRequest => "donate-request",
        }
    }

    /// Admin view that lists this kind of row.
    #[must_use]
    pub const fn route(self) -> &'static str {
        match self {
            Self::Product => "/admin/products",
            Self::Seller => "/admin/sellers",
            Self::BuyRequest => "/admin/buy-requests",
            Self::DonateRequest => "/admin/donate-requests",
        }
    }
}

impl From<RequestKind> for SearchResultKind {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Buy => Self::BuyRequest,
            RequestKind::Donate => Self::DonateRequest,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: Uuid,
    pub kind: SearchResultKind,
    /// Product title, company name or requester name.
    pub label: String,
    pub email: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Search all three collections for `query`.
///
/// A blank query returns no results without touching the backend.
///
/// # Errors
///
/// Returns [`MarketError::Backend`] if any of the reads fail.
#[tracing::instrument(skip(backend))]
pub async fn search(backend: &dyn Backend, query: &str) -> Result<Vec<SearchResult>, MarketError> {
    let needle = query.trim();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let products: Vec<Product> = backend
        .select(
            &Query::on(Table::Products)
                .is_null("deleted_at")
                .any_ilike(&["title", "description"], needle)
                .limit(RESULTS_PER_TABLE),
        )
        .await?
        .decode()?;

    let sellers: Vec<Seller> = backend
        .select(
            &Query::on(Table::Sellers)
                .any_ilike(&["company_name", "email"], needle)
                .limit(RESULTS_PER_TABLE),
        )
        .await?
        .decode()?;

    let requests: Vec<Request> = backend
        .select(
            &Query::on(Table::Requests)
                .any_ilike(&["user_name", "user_email"], needle)
                .limit(RESULTS_PER_TABLE),
        )
        .await?
        .decode()?;

    let mut results = Vec::with_capacity(products.len() + sellers.len() + requests.len());
    results.extend(products.into_iter().map(|p| SearchResult {
        id: p.id.as_uuid(),
        kind: SearchResultKind::Product,
        label: p.title,
        email: None,
        status: p.status.to_string(),
        created_at: p.created_at,
    }));
    results.extend(sellers.into_iter().map(|s| SearchResult {
        id: s.id.as_uuid(),
        kind: SearchResultKind::Seller,
        label: s.company_name,
        email: Some(s.email),
        status: s.status.to_string(),
        created_at: s.created_at,
    }));
    results.extend(requests.into_iter().map(|r| SearchResult {
        id: r.id.as_uuid(),
        kind: r.kind.into(),
        label: r.user_name,
        email: Some(r.user_email),
        status: r.status.to_string(),
        created_at: r.created_at,
    }));

    tracing::debug!(hits = results.len(), "search complete");
    Ok(results)
}

/// What the search box shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Query the results belong to.
    pub query: String,
    pub results: Vec<SearchResult>,
    pub loading: bool,
    /// Transient failure notice for the last search.
    pub notice: Option<String>,
}

impl SearchState {
    /// Whether the dropdown should be open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.results.is_empty()
    }
}

/// Debounced search input.
///
/// Only the last keystroke in a quiet window of `debounce` issues a
/// search. Dropping the box stops its worker.
#[derive(Debug)]
pub struct SearchBox {
    input: watch::Sender<String>,
    state: watch::Receiver<SearchState>,
    worker: JoinHandle<()>,
}

impl SearchBox {
    /// Start the worker. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn spawn(backend: Arc<dyn Backend>, debounce: Duration) -> Self {
        let (input, input_rx) = watch::channel(String::new());
        let (state_tx, state) = watch::channel(SearchState::default());
        let worker = tokio::spawn(run(backend, debounce, input_rx, state_tx));
        Self {
            input,
            state,
            worker,
        }
    }

    /// Replace the query text.
    pub fn set_query(&self, query: impl Into<String>) {
        self.input.send_replace(query.into());
    }

    /// Clear the query, as after following a result.
    pub fn clear(&self) {
        self.set_query(String::new());
    }

    #[must_use]
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }
}

impl Drop for SearchBox {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run(
    backend: Arc<dyn Backend>,
    debounce: Duration,
    mut input: watch::Receiver<String>,
    state: watch::Sender<SearchState>,
) {
    while input.changed().await.is_ok() {
        // Restart the window on every keystroke until input goes quiet.
        loop {
            match tokio::time::timeout(debounce, input.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return,
                Err(_) => break,
            }
        }

        let query = input.borrow_and_update().clone();
        state.send_modify(|s| s.loading = true);

        let outcome = search(backend.as_ref(), &query).await;
        state.send_modify(|s| {
            s.loading = false;
            s.query = query;
            match outcome {
                Ok(results) => {
                    s.results = results;
                    s.notice = None;
                }
                Err(err) => {
                    s.results.clear();
                    s.notice = Some(report(&err));
                }
            }
        });
    }
}
