//! Coordination Client Interface
//!
//! The membership layer talks to the coordination store exclusively through
//! the `CoordinationClient` trait defined here. Concrete clients (an embedded
//! in-process store, a networked store) implement it; the membership code
//! never sees anything beyond these operations.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Monotonically increasing store revision. Revision 0 means "never written".
pub type Revision = u64;

/// Identifier of a granted lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(pub u64);

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A key-value pair as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
    /// Revision at which this key was last written.
    pub mod_revision: Revision,
}

/// One page of a paginated prefix scan.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub kvs: Vec<KeyValue>,
    /// True when further pages remain past the last key in `kvs`.
    pub more: bool,
}

/// What happened to a watched key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Put,
    Delete,
}

/// A single change observed on a watched prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub key: String,
    /// Value written for PUT events, empty for DELETE events.
    pub value: Vec<u8>,
    pub revision: Revision,
}

/// Receiving half of a watch. Dropping it cancels the subscription.
pub struct WatchSubscription {
    rx: mpsc::UnboundedReceiver<WatchEvent>,
}

impl WatchSubscription {
    pub fn new(rx: mpsc::UnboundedReceiver<WatchEvent>) -> Self {
        Self { rx }
    }

    /// Next event in delivery order, or `None` once the store side closed.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

/// Errors surfaced by coordination store operations.
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("unknown lease {0}")]
    UnknownLease(LeaseId),

    #[error("coordination store unavailable")]
    Unavailable,
}

pub type CoordResult<T> = Result<T, CoordError>;

/// Operations the membership layer requires from a coordination store.
///
/// Implementations must be linearizable per key and deliver watch events for
/// a prefix in revision order.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Reads one page of keys under `prefix`, ordered by key, starting
    /// strictly after `start_after` when given. A `limit` of 0 means
    /// unbounded.
    async fn scan_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> CoordResult<ScanPage>;

    /// Writes `value` under `key`, optionally bound to `lease`. Returns the
    /// revision of the write.
    async fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>) -> CoordResult<Revision>;

    /// Deletes `key`. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> CoordResult<()>;

    /// Opens an ordered change stream for `prefix`. With `from_revision > 0`
    /// every retained event with `revision >= from_revision` is replayed
    /// before live events; with 0 only live events are delivered.
    async fn watch_prefix(
        &self,
        prefix: &str,
        from_revision: Revision,
    ) -> CoordResult<WatchSubscription>;

    /// Grants a lease with the given time-to-live.
    async fn lease_grant(&self, ttl: Duration) -> CoordResult<LeaseId>;

    /// Extends `lease` by its original time-to-live. A single bounded ping;
    /// callers schedule the cadence themselves.
    async fn lease_keep_alive(&self, lease: LeaseId) -> CoordResult<()>;

    /// Revokes `lease`, deleting every key bound to it.
    async fn lease_revoke(&self, lease: LeaseId) -> CoordResult<()>;
}
