//! Live, paginated list views.
//!
//! A [`LiveList`] keeps one page of a collection current:
//!
//! 1. On open it subscribes to the collection's change feed, then fetches.
//! 2. Every change notification triggers a full re-fetch of the current page
//!    with the current filter. There is no incremental patching.
//! 3. Each fetch takes a ticket; a result is applied only if no later fetch
//!    has been issued since, so the displayed page always converges on the
//!    last-issued fetch even when notifications race an in-flight read.
//! 4. Changing the filter or page releases the old subscription and opens a
//!    new one. Dropping the list releases it for good.
//!
//! Mutators write first and patch the cached page only after the write
//! succeeds. A failed write leaves the page untouched and records the error.

mod products;
mod requests;
mod sellers;

pub use products::{ProductFilter, ProductList};
pub use requests::{RequestFilter, RequestList};
pub use sellers::{SellerFilter, SellerList};

use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::{Backend, BackendError, ChangeHub, ChannelSpec, Query};
use crate::error::MarketError;
use crate::models::Entity;
use crate::pagination::PageRequest;

/// Filter configuration of one list view.
pub trait ListFilter: Clone + Debug + Send + Sync + 'static {
    /// Row type the list holds.
    type Item: Entity;

    /// Filtered, ordered query without pagination.
    fn query(&self) -> Query;

    /// Change-feed channel whose notifications invalidate the list.
    fn channel(&self) -> ChannelSpec;
}

/// What a list view displays.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    /// The current page, newest first.
    pub items: Vec<T>,
    /// Matching rows before pagination.
    pub total: u64,
    pub loading: bool,
    /// Last read or write failure; cleared by the next successful read.
    pub error: Option<Arc<BackendError>>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            loading: true,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Params<F> {
    filter: F,
    page: PageRequest,
}

struct Shared<F: ListFilter> {
    backend: Arc<dyn Backend>,
    hub: ChangeHub,
    params: Mutex<Params<F>>,
    state: watch::Sender<ListState<F::Item>>,
    issued: AtomicU64,
}

impl<F: ListFilter> Shared<F> {
    fn params(&self) -> MutexGuard<'_, Params<F>> {
        self.params.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe now and re-fetch on every notification.
    fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let mut stream = self.hub.subscribe(self.params().filter.channel());
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                tracing::debug!(table = %event.table, kind = ?event.kind, "list invalidated");
                shared.fetch().await;
            }
        })
    }

    async fn fetch(&self) {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let params = self.params().clone();
        self.state.send_modify(|state| state.loading = true);

        let (first, last) = params.page.window();
        let query = params.filter.query().range(first, last).count_exact();
        let result = match self.backend.select(&query).await {
            Ok(rows) => {
                let total = rows.total.unwrap_or(0);
                rows.decode::<F::Item>().map(|items| (items, total))
            }
            Err(err) => Err(err),
        };

        self.state.send_if_modified(|state| {
            if self.issued.load(Ordering::SeqCst) != ticket {
                tracing::debug!(ticket, "discarding stale list result");
                return false;
            }
            state.loading = false;
            match result {
                Ok((items, total)) => {
                    state.items = items;
                    state.total = total;
                    state.error = None;
                }
                Err(err) => {
                    tracing::error!(error = %err, table = %query.table, "list fetch failed");
                    state.error = Some(Arc::new(err));
                }
            }
            true
        });
    }
}

/// A live page of `F::Item` rows.
pub struct LiveList<F: ListFilter> {
    shared: Arc<Shared<F>>,
    listener: JoinHandle<()>,
}

impl<F: ListFilter> Debug for LiveList<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self.shared.params();
        f.debug_struct("LiveList")
            .field("filter", &params.filter)
            .field("page", &params.page)
            .finish_non_exhaustive()
    }
}

impl<F: ListFilter> LiveList<F> {
    /// Subscribe to `filter`'s channel on `hub`, then load `page`.
    ///
    /// Load failures do not fail the call; they land in
    /// [`ListState::error`].
    pub async fn open(
        backend: Arc<dyn Backend>,
        hub: ChangeHub,
        filter: F,
        page: PageRequest,
    ) -> Self {
        let (state, _) = watch::channel(ListState::default());
        let shared = Arc::new(Shared {
            backend,
            hub,
            params: Mutex::new(Params { filter, page }),
            state,
            issued: AtomicU64::new(0),
        });

        let listener = shared.listen();
        shared.fetch().await;
        Self { shared, listener }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> ListState<F::Item> {
        self.shared.state.borrow().clone()
    }

    /// Receiver that sees every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ListState<F::Item>> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn filter(&self) -> F {
        self.shared.params().filter.clone()
    }

    #[must_use]
    pub fn page(&self) -> PageRequest {
        self.shared.params().page
    }

    /// Re-fetch the current page.
    pub async fn refresh(&self) {
        self.shared.fetch().await;
    }

    /// Switch to `filter`, keeping the page.
    pub async fn set_filter(&mut self, filter: F) {
        self.reconfigure(|params| params.filter = filter).await;
    }

    /// Move to 1-indexed `page`.
    pub async fn set_page(&mut self, page: u32) {
        self.reconfigure(|params| params.page = PageRequest::new(page, params.page.page_size))
            .await;
    }

    async fn reconfigure(&mut self, change: impl FnOnce(&mut Params<F>)) {
        self.listener.abort();
        change(&mut self.shared.params());
        self.listener = self.shared.listen();
        self.shared.fetch().await;
    }

    /// Run `write`; when it changed at least one row apply `patch` to the
    /// cached page. Returns the number of rows changed.
    ///
    /// On failure the page is left as it was and the error is recorded.
    async fn write_then_patch<W>(
        &self,
        write: W,
        patch: impl FnOnce(&mut ListState<F::Item>),
    ) -> Result<u64, MarketError>
    where
        W: Future<Output = Result<u64, BackendError>>,
    {
        match write.await {
            Ok(0) => Ok(0),
            Ok(changed) => {
                self.shared.state.send_modify(patch);
                Ok(changed)
            }
            Err(err) => {
                let err = Arc::new(err);
                self.shared
                    .state
                    .send_modify(|state| state.error = Some(Arc::clone(&err)));
                Err(MarketError::Backend(err))
            }
        }
    }

    fn backend(&self) -> &dyn Backend {
        self.shared.backend.as_ref()
    }
}

impl<F: ListFilter> Drop for LiveList<F> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Apply `f` to the cached row with primary key `id`, if present.
fn patch_item<T: Entity>(items: &mut [T], id: Uuid, f: impl FnOnce(&mut T)) {
    if let Some(item) = items.iter_mut().find(|item| item.uuid() == id) {
        f(item);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, Operation, Table};
    use labmarket_core::SellerStatus;
    use serde_json::json;

    async fn seed_sellers(backend: &MemoryBackend, n: usize) {
        let rows = (0..n)
            .map(|i| {
                json!({
                    "company_name": format!("Lab {i:02}"),
                    "email": format!("lab{i}@example.org"),
                    "status": "active",
                    "created_at": format!("2024-01-{:02}T00:00:00Z", i + 1),
                })
            })
            .collect();
        backend.insert(Table::Sellers, rows).await.unwrap();
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_open_loads_first_page() {
        let backend = Arc::new(MemoryBackend::new());
        seed_sellers(&backend, 5).await;

        let list = SellerList::open(
            backend.clone(),
            backend.hub().clone(),
            SellerFilter::default(),
            PageRequest::new(1, 2),
        )
        .await;

        let state = list.snapshot();
        assert!(!state.loading);
        assert_eq!(state.total, 5);
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.items[0].company_name, "Lab 04");
    }

    #[tokio::test]
    async fn test_change_triggers_refetch() {
        let backend = Arc::new(MemoryBackend::new());
        seed_sellers(&backend, 1).await;
        let list = SellerList::open(
            backend.clone(),
            backend.hub().clone(),
            SellerFilter::default(),
            PageRequest::new(1, 10),
        )
        .await;
        let mut rx = list.watch();

        seed_sellers(&backend, 1).await;
        while rx.borrow_and_update().total != 2 {
            rx.changed().await.unwrap();
        }
        assert_eq!(list.snapshot().items.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_is_recorded() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_next(Table::Sellers, Operation::Select, 1);

        let list = SellerList::open(
            backend.clone(),
            backend.hub().clone(),
            SellerFilter::default(),
            PageRequest::default(),
        )
        .await;

        let state = list.snapshot();
        assert!(!state.loading);
        assert!(state.error.is_some());

        list.refresh().await;
        assert!(list.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_reconfigure_and_drop_release_subscription() {
        let backend = Arc::new(MemoryBackend::new());
        let hub = backend.hub().clone();
        let mut list = SellerList::open(
            backend.clone(),
            hub.clone(),
            SellerFilter::default(),
            PageRequest::default(),
        )
        .await;
        assert_eq!(hub.subscriber_count(), 1);

        list.set_filter(SellerFilter {
            status: Some(SellerStatus::Banned),
        })
        .await;
        list.set_page(2).await;
        settle().await;
        assert_eq!(hub.subscriber_count(), 1);

        drop(list);
        settle().await;
        assert_eq!(hub.subscriber_count(), 0);
    }
}
