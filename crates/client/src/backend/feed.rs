//! Row-change notifications.
//!
//! The hosted backend pushes a bare "something changed" signal per
//! collection; there is no diff. [`ChangeHub`] fans those signals out to
//! in-process subscribers. The realtime transport (or [`MemoryBackend`]
//! writes) feed it through [`ChangeHub::publish`].
//!
//! [`MemoryBackend`]: super::MemoryBackend

use labmarket_core::RequestKind;
use tokio::sync::broadcast;

use super::Table;

/// Default per-subscriber buffer before a slow subscriber starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change notification for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// Value of the row's `type` column, when it has one.
    pub row_type: Option<String>,
}

/// One logical channel: a collection, optionally narrowed by `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub table: Table,
    pub type_filter: Option<RequestKind>,
}

impl ChannelSpec {
    /// Every change on `table`.
    #[must_use]
    pub const fn table(table: Table) -> Self {
        Self {
            table,
            type_filter: None,
        }
    }

    /// Changes on `table` whose `type` column equals `kind`.
    #[must_use]
    pub const fn typed(table: Table, kind: RequestKind) -> Self {
        Self {
            table,
            type_filter: Some(kind),
        }
    }

    /// Whether `event` belongs to this channel.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match (self.type_filter, event.row_type.as_deref()) {
            (None, _) => true,
            (Some(kind), Some(row_type)) => kind.as_str() == row_type,
            (Some(_), None) => false,
        }
    }
}

/// In-process fan-out of change events.
///
/// Cheap to clone; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHub {
    /// Create a hub with the default buffer.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Deliver `event` to every live subscription. No subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(table = %event.table, kind = ?event.kind, "change published");
        let _ = self.tx.send(event);
    }

    /// Open a subscription on `spec`. Dropping the stream unsubscribes.
    #[must_use]
    pub fn subscribe(&self, spec: ChannelSpec) -> ChangeStream {
        ChangeStream {
            rx: self.tx.subscribe(),
            spec,
        }
    }

    /// Number of currently open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription to one channel.
#[derive(Debug)]
pub struct ChangeStream {
    rx: broadcast::Receiver<ChangeEvent>,
    spec: ChannelSpec,
}

impl ChangeStream {
    /// The channel this stream listens on.
    #[must_use]
    pub const fn spec(&self) -> ChannelSpec {
        self.spec
    }

    /// Wait for the next matching event.
    ///
    /// Returns `None` once the hub is gone. If this subscriber fell behind
    /// and missed events, a synthetic update is returned instead: the
    /// listener only needs to know that something changed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.spec.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, table = %self.spec.table, "change stream lagged");
                    return Some(ChangeEvent {
                        table: self.spec.table,
                        kind: ChangeKind::Update,
                        row_type: self.spec.type_filter.map(|k| k.as_str().to_owned()),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
