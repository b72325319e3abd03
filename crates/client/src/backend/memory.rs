//! In-process backend.
//!
//! Holds rows as JSON objects and evaluates [`Query`] with the same
//! semantics as the REST surface: filters, `created_at` ordering, inclusive
//! row windows and exact counts. Every write publishes to a [`ChangeHub`],
//! so live lists behave exactly as they do against the hosted service.
//!
//! Failures can be injected per table and operation to exercise error paths.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{
    Backend, BackendError, ChangeEvent, ChangeHub, ChangeKind, Filter, Order, Query, Rows, Table,
};

/// Backend operations, for failure injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug)]
struct StoredRow {
    seq: u64,
    data: Map<String, Value>,
}

#[derive(Debug, Default)]
struct Store {
    tables: HashMap<Table, Vec<StoredRow>>,
    next_seq: u64,
    failures: HashMap<(Table, Operation), usize>,
}

/// Rows kept in memory, with change publication.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
    hub: ChangeHub,
    calls: [AtomicUsize; 4],
}

impl MemoryBackend {
    /// Create an empty backend publishing to a fresh hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend publishing to `hub`.
    #[must_use]
    pub fn with_hub(hub: ChangeHub) -> Self {
        Self {
            hub,
            ..Self::default()
        }
    }

    /// The hub this backend publishes to.
    #[must_use]
    pub const fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// Make the next `times` calls of `operation` on `table` fail.
    pub fn fail_next(&self, table: Table, operation: Operation, times: usize) {
        *self.lock().failures.entry((table, operation)).or_insert(0) += times;
    }

    /// How many times `operation` has been called (including failures).
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[operation as usize].load(AtomicOrdering::SeqCst)
    }

    /// All rows of `table` in insertion order, ignoring soft deletes.
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock()
            .tables
            .get(&table)
            .map(|rows| rows.iter().map(|r| Value::Object(r.data.clone())).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(
        &self,
        table: Table,
        operation: Operation,
    ) -> Result<MutexGuard<'_, Store>, BackendError> {
        self.calls[operation as usize].fetch_add(1, AtomicOrdering::SeqCst);
        let mut store = self.lock();
        if let Some(remaining) = store.failures.get_mut(&(table, operation))
            && *remaining > 0
        {
            *remaining -= 1;
            tracing::debug!(%table, ?operation, "injected backend failure");
            return Err(BackendError::Api {
                status: 503,
                message: format!("injected {operation:?} failure on {table}"),
            });
        }
        Ok(store)
    }

    fn notify(&self, table: Table, kind: ChangeKind, rows: &[Map<String, Value>]) {
        for row in rows {
            self.hub.publish(ChangeEvent {
                table,
                kind,
                row_type: row.get("type").and_then(Value::as_str).map(str::to_owned),
            });
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Rows, BackendError> {
        let store = self.begin(query.table, Operation::Select)?;

        let mut matched: Vec<&StoredRow> = store
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(&row.data, f)))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = query.order {
            matched.sort_by(|a, b| compare(a, b, order));
        }

        let total = u64::try_from(matched.len()).unwrap_or(u64::MAX);
        let (skip, take) = window(query, total);
        let rows = matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| Value::Object(row.data.clone()))
            .collect();

        Ok(Rows {
            rows,
            total: query.count.then_some(total),
        })
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut data) = row else {
                return Err(BackendError::Api {
                    status: 400,
                    message: format!("insert into {table} expects JSON objects"),
                });
            };
            data.entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            data.entry("created_at").or_insert_with(|| {
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            });
            prepared.push(data);
        }

        {
            let mut store = self.begin(table, Operation::Insert)?;
            for data in &prepared {
                store.next_seq += 1;
                let seq = store.next_seq;
                store.tables.entry(table).or_default().push(StoredRow {
                    seq,
                    data: data.clone(),
                });
            }
        }

        self.notify(table, ChangeKind::Insert, &prepared);
        Ok(prepared.into_iter().map(Value::Object).collect())
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<u64, BackendError> {
        let Value::Object(patch) = patch else {
            return Err(BackendError::Api {
                status: 400,
                message: format!("update on {table} expects a JSON object"),
            });
        };

        let changed: Vec<Map<String, Value>> = {
            let mut store = self.begin(table, Operation::Update)?;
            store
                .tables
                .get_mut(&table)
                .map(|rows| {
                    rows.iter_mut()
                        .filter(|row| filters.iter().all(|f| matches(&row.data, f)))
                        .map(|row| {
                            for (key, value) in &patch {
                                row.data.insert(key.clone(), value.clone());
                            }
                            row.data.clone()
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        self.notify(table, ChangeKind::Update, &changed);
        Ok(changed.len() as u64)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError> {
        let removed: Vec<Map<String, Value>> = {
            let mut store = self.begin(table, Operation::Delete)?;
            let Some(rows) = store.tables.get_mut(&table) else {
                return Ok(());
            };
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(rows)
                .into_iter()
                .partition(|row| filters.iter().all(|f| matches(&row.data, f)));
            *rows = kept;
            gone.into_iter().map(|row| row.data).collect()
        };

        self.notify(table, ChangeKind::Delete, &removed);
        Ok(())
    }
}

// =============================================================================
// Query evaluation
// =============================================================================

/// Textual form of a scalar, as compared by equality filters.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Map<String, Value>, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => {
            row.get(*column).and_then(text).is_some_and(|v| v == *value)
        }
        Filter::IsNull(column) => row.get(*column).is_none_or(Value::is_null),
        Filter::AnyILike { columns, needle } => {
            let needle = needle.to_lowercase();
            columns.iter().any(|column| {
                row.get(*column)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.to_lowercase().contains(&needle))
            })
        }
    }
}

fn compare(a: &StoredRow, b: &StoredRow, order: Order) -> Ordering {
    let by_value = compare_values(a.data.get(order.column), b.data.get(order.column))
        .then(a.seq.cmp(&b.seq));
    if order.ascending {
        by_value
    } else {
        by_value.reverse()
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Rows to skip and take for the query's range and limit.
fn window(query: &Query, total: u64) -> (usize, usize) {
    let (first, mut take) = match query.range {
        Some((first, last)) if last >= first => (first, last - first + 1),
        Some(_) => (0, 0),
        None => (0, total),
    };
    if let Some(limit) = query.limit {
        take = take.min(limit);
    }
    (
        usize::try_from(first).unwrap_or(usize::MAX),
        usize::try_from(take).unwrap_or(usize::MAX),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::backend::{ChannelSpec, by_id};
    use serde_json::json;

    fn product(title: &str, kind: &str, created_at: &str) -> Value {
        json!({
            "title": title,
            "description": format!("{title} in good condition"),
            "type": kind,
            "status": "active",
            "created_at": created_at,
            "deleted_at": null,
        })
    }

    #[tokio::test]
    async fn test_insert_generates_id_and_timestamp() {
        let backend = MemoryBackend::new();
        let inserted = backend
            .insert(Table::Sellers, vec![json!({"company_name": "Acme Labs"})])
            .await
            .unwrap();

        assert!(inserted[0]["id"].as_str().unwrap().parse::<Uuid>().is_ok());
        assert!(inserted[0]["created_at"].is_string());
        assert_eq!(backend.rows(Table::Sellers).len(), 1);
    }

    #[tokio::test]
    async fn test_select_orders_newest_first_and_counts() {
        let backend = MemoryBackend::new();
        backend
            .insert(
                Table::Products,
                vec![
                    product("Centrifuge", "buy", "2024-01-01T00:00:00.000000Z"),
                    product("Pipette", "buy", "2024-03-01T00:00:00.000000Z"),
                    product("Incubator", "donate", "2024-02-01T00:00:00.000000Z"),
                ],
            )
            .await
            .unwrap();

        let result = backend
            .select(
                &Query::on(Table::Products)
                    .eq("type", "buy")
                    .newest_first()
                    .range(0, 0)
                    .count_exact(),
            )
            .await
            .unwrap();

        assert_eq!(result.total, Some(2));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["title"], "Pipette");
    }

    #[tokio::test]
    async fn test_is_null_and_ilike() {
        let backend = MemoryBackend::new();
        let mut deleted = product("Old Autoclave", "donate", "2024-01-01T00:00:00.000000Z");
        deleted["deleted_at"] = json!("2024-05-01T00:00:00Z");
        backend
            .insert(
                Table::Products,
                vec![
                    deleted,
                    product("Autoclave", "donate", "2024-01-02T00:00:00.000000Z"),
                ],
            )
            .await
            .unwrap();

        let result = backend
            .select(
                &Query::on(Table::Products)
                    .is_null("deleted_at")
                    .any_ilike(&["title", "description"], "AUTOCLAVE"),
            )
            .await
            .unwrap();

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["title"], "Autoclave");
        assert_eq!(result.total, None);
    }

    #[tokio::test]
    async fn test_range_past_end_is_empty() {
        let backend = MemoryBackend::new();
        backend
            .insert(Table::Sellers, vec![json!({"company_name": "A"})])
            .await
            .unwrap();

        let result = backend
            .select(&Query::on(Table::Sellers).range(10, 19).count_exact())
            .await
            .unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.total, Some(1));
    }

    #[tokio::test]
    async fn test_update_and_delete_publish_changes() {
        let backend = MemoryBackend::new();
        let mut stream = backend.hub().subscribe(ChannelSpec::table(Table::Requests));

        let inserted = backend
            .insert(Table::Requests, vec![json!({"type": "buy", "status": "pending"})])
            .await
            .unwrap();
        let id = inserted[0]["id"].as_str().unwrap().to_owned();

        let changed = backend
            .update(Table::Requests, &by_id(&id), json!({"status": "approved"}))
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(backend.rows(Table::Requests)[0]["status"], "approved");

        backend.delete(Table::Requests, &by_id(&id)).await.unwrap();
        assert!(backend.rows(Table::Requests).is_empty());

        let kinds = [
            stream.next().await.unwrap().kind,
            stream.next().await.unwrap().kind,
            stream.next().await.unwrap().kind,
        ];
        assert_eq!(kinds, [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let backend = MemoryBackend::new();
        backend.fail_next(Table::RequestProducts, Operation::Insert, 1);

        let first = backend
            .insert(Table::RequestProducts, vec![json!({"quantity": 1})])
            .await;
        assert!(matches!(first, Err(BackendError::Api { status: 503, .. })));
        assert!(backend.rows(Table::RequestProducts).is_empty());

        let second = backend
            .insert(Table::RequestProducts, vec![json!({"quantity": 1})])
            .await;
        assert!(second.is_ok());
        assert_eq!(backend.calls(Operation::Insert), 2);
    }
}
