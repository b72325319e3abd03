//! PostgREST-style HTTP adapter.
//!
//! Reads go through `GET /rest/v1/{table}` with filter query parameters and
//! a `Range` header; the pre-pagination count comes back in
//! `Content-Range` when `Prefer: count=exact` is sent.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{Backend, BackendError, Filter, Query, Rows, Table};
use crate::config::{BackendConfig, expose};

/// Path of the REST surface below the project URL.
const REST_PATH: &str = "rest/v1/";

/// Maximum characters of an error body kept in logs and errors.
const ERROR_BODY_LIMIT: usize = 500;

/// HTTP client for the hosted backend's REST surface.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestBackendInner>,
}

struct RestBackendInner {
    client: reqwest::Client,
    rest_url: Url,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("rest_url", &self.inner.rest_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    /// Create a client for the project described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let key = expose(config.api_key());

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(key)?);
        headers.insert("Authorization", header_value(&format!("Bearer {key}"))?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(RestBackendInner {
                client,
                rest_url: rest_url(&config.url)?,
            }),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.client.request(method, url)
    }

    fn table_url(&self, table: Table, filters: &[Filter]) -> Result<Url, BackendError> {
        let mut url = self
            .inner
            .rest_url
            .join(table.as_str())
            .map_err(|e| BackendError::Api {
                status: 0,
                message: format!("invalid table URL: {e}"),
            })?;
        append_filters(&mut url, filters);
        Ok(url)
    }
}

#[async_trait]
impl Backend for RestBackend {
    #[instrument(skip(self), fields(table = %query.table))]
    async fn select(&self, query: &Query) -> Result<Rows, BackendError> {
        let url = self.select_url(query)?;
        let mut request = self.request(Method::GET, url);

        if query.count {
            request = request.header("Prefer", "count=exact");
        }
        if let Some((first, last)) = query.range {
            request = request
                .header("Range-Unit", "items")
                .header("Range", format!("{first}-{last}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let total = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        // A window that starts past the last row is not an error here.
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            debug!(?total, "range past end of result set");
            return Ok(Rows {
                rows: Vec::new(),
                total: query.count.then(|| total.unwrap_or(0)),
            });
        }

        let body = check(response).await?;
        let rows: Vec<Value> = parse_body(&body)?;
        debug!(rows = rows.len(), ?total, "select complete");

        Ok(Rows {
            rows,
            total: if query.count { total } else { None },
        })
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(table, &[])?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await?;

        let body = check(response).await?;
        parse_body(&body)
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<u64, BackendError> {
        let mut url = self.table_url(table, filters)?;
        url.query_pairs_mut().append_pair("select", "id");
        let response = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        let body = check(response).await?;
        let rows: Vec<Value> = parse_body(&body)?;
        debug!(rows = rows.len(), "update complete");
        Ok(rows.len() as u64)
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError> {
        let url = self.table_url(table, filters)?;
        let response = self.request(Method::DELETE, url).send().await?;
        check(response).await.map(drop)
    }
}

impl RestBackend {
    fn select_url(&self, query: &Query) -> Result<Url, BackendError> {
        let mut url = self.table_url(query.table, &query.filters)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            if let Some(order) = query.order {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{direction}", order.column));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn header_value(value: &str) -> Result<HeaderValue, BackendError> {
    HeaderValue::from_str(value).map_err(|e| BackendError::Api {
        status: 0,
        message: format!("invalid API key format: {e}"),
    })
}

/// `{base}/rest/v1/`, tolerating a base URL with or without a trailing slash.
fn rest_url(base: &Url) -> Result<Url, BackendError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(REST_PATH).map_err(|e| BackendError::Api {
        status: 0,
        message: format!("invalid backend URL: {e}"),
    })
}

/// Encode filters as PostgREST query parameters.
fn append_filters(url: &mut Url, filters: &[Filter]) {
    if filters.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for filter in filters {
        match filter {
            Filter::Eq { column, value } => {
                pairs.append_pair(column, &format!("eq.{value}"));
            }
            Filter::IsNull(column) => {
                pairs.append_pair(column, "is.null");
            }
            Filter::AnyILike { columns, needle } => {
                let pattern = quote(&format!("%{}%", like_escape(needle)));
                let clauses: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{column}.ilike.{pattern}"))
                    .collect();
                pairs.append_pair("or", &format!("({})", clauses.join(",")));
            }
        }
    }
}

/// Escape `LIKE` wildcards so the needle matches literally.
fn like_escape(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Double-quote a value so reserved characters (`,.:()`) stay literal.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Total from a `Content-Range` header such as `0-11/25` or `*/0`.
///
/// Returns `None` when the total is unknown (`*`) or the header is malformed.
fn parse_content_range(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

/// Turn a non-success response into a [`BackendError`], returning the body
/// of a successful one.
async fn check(response: Response) -> Result<String, BackendError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(BackendError::RateLimited(retry_after));
    }

    let body = response.text().await?;

    if !status.is_success() {
        let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        tracing::error!(status = %status, body = %message, "backend returned non-success status");
        return Err(BackendError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(body)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(ERROR_BODY_LIMIT).collect::<String>(),
            "failed to parse backend response"
        );
        BackendError::Parse(e)
    })
}
