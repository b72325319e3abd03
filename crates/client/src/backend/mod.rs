//! Hosted backend access: collection queries, writes and change feeds.
//!
//! # Architecture
//!
//! - The backend is a managed Postgres exposed through a PostgREST-style
//!   REST surface, with row-level auth and a realtime change feed.
//! - It is the source of truth - NO local persistence; every list view is
//!   a filtered, paginated read and is re-read when the feed reports a change.
//! - [`Backend`] is the seam: [`RestBackend`] talks HTTP, [`MemoryBackend`]
//!   keeps rows in process with identical filter/order/range semantics.
//!
//! # Example
//!
//! ```rust,ignore
//! use labmarket_client::backend::{Backend, Query, Table};
//!
//! let rows = backend
//!     .select(
//!         &Query::on(Table::Products)
//!             .eq("type", "buy")
//!             .is_null("deleted_at")
//!             .newest_first()
//!             .range(0, 11)
//!             .count_exact(),
//!     )
//!     .await?;
//! ```

mod feed;
mod memory;
mod rest;

pub use feed::{ChangeEvent, ChangeHub, ChangeKind, ChangeStream, ChannelSpec};
pub use memory::{MemoryBackend, Operation};
pub use rest::RestBackend;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing or row decoding failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A single-row operation matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Backend collections used by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    Sellers,
    Requests,
    /// Join rows linking a request to the products it asks for.
    RequestProducts,
    /// Seller registrations awaiting review.
    SellerRequests,
}

impl Table {
    /// Collection name on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Sellers => "sellers",
            Self::Requests => "requests",
            Self::RequestProducts => "request_products",
            Self::SellerRequests => "seller_requests",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value` (compared on the textual form of the value).
    Eq { column: &'static str, value: String },
    /// `column IS NULL`.
    IsNull(&'static str),
    /// Case-insensitive substring match on ANY of the columns.
    AnyILike {
        columns: Vec<&'static str>,
        needle: String,
    },
}

/// Sort order of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// A read against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    /// Inclusive row window `[first, last]`, applied after ordering.
    pub range: Option<(u64, u64)>,
    pub limit: Option<u64>,
    /// Whether to report the pre-pagination match count.
    pub count: bool,
}

impl Query {
    /// Start a query on `table` with no filters.
    #[must_use]
    pub const fn on(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            range: None,
            limit: None,
            count: false,
        }
    }

    /// Add an equality predicate.
    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq {
            column,
            value: value.to_string(),
        });
        self
    }

    /// Add an equality predicate when `value` is present.
    #[must_use]
    pub fn eq_opt<V: ToString>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// Add an `IS NULL` predicate.
    #[must_use]
    pub fn is_null(mut self, column: &'static str) -> Self {
        self.filters.push(Filter::IsNull(column));
        self
    }

    /// Add a case-insensitive substring match across `columns`.
    #[must_use]
    pub fn any_ilike(mut self, columns: &[&'static str], needle: &str) -> Self {
        self.filters.push(Filter::AnyILike {
            columns: columns.to_vec(),
            needle: needle.to_owned(),
        });
        self
    }

    /// Order by `created_at` descending.
    #[must_use]
    pub const fn newest_first(mut self) -> Self {
        self.order = Some(Order {
            column: "created_at",
            ascending: false,
        });
        self
    }

    /// Restrict to the inclusive row window `[first, last]`.
    #[must_use]
    pub const fn range(mut self, first: u64, last: u64) -> Self {
        self.range = Some((first, last));
        self
    }

    /// Return at most `n` rows.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Request the exact pre-pagination match count.
    #[must_use]
    pub const fn count_exact(mut self) -> Self {
        self.count = true;
        self
    }
}

/// Result of a [`Backend::select`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub rows: Vec<Value>,
    /// Pre-pagination match count, when the query asked for it.
    pub total: Option<u64>,
}

impl Rows {
    /// Decode every row into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Parse`] on the first row that does not fit `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        self.rows
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(BackendError::from))
            .collect()
    }
}

/// Access to the hosted backend's collections.
///
/// Every method is a single remote call; there is no multi-statement
/// transaction primitive.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read rows matching `query`.
    async fn select(&self, query: &Query) -> Result<Rows, BackendError>;

    /// Insert `rows` into `table`, returning the stored representations
    /// (with generated `id` and `created_at`).
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError>;

    /// Merge `patch` into every row matching `filters`, returning how many
    /// rows matched.
    async fn update(&self, table: Table, filters: &[Filter], patch: Value)
    -> Result<u64, BackendError>;

    /// Delete every row matching `filters`.
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError>;
}

/// Shorthand for an `id = value` filter list.
#[must_use]
pub fn by_id(id: impl ToString) -> [Filter; 1] {
    [Filter::Eq {
        column: "id",
        value: id.to_string(),
    }]
}
