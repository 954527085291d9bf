//! In-Process Coordination Store
//!
//! A single-process implementation of `CoordinationClient` backing tests and
//! the demo binary. All state lives behind one mutex, which makes every
//! operation linearizable by construction. A background sweeper expires
//! overdue leases and deletes their keys, so silent client death is visible
//! to watchers the same way it would be against a networked store.

use super::client::*;

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// How often the sweeper checks for expired leases.
const SWEEP_INTERVAL: Duration = Duration::from_millis(100);

struct StoredValue {
    value: Vec<u8>,
    mod_revision: Revision,
    lease: Option<LeaseId>,
}

struct Watcher {
    prefix: String,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

struct LeaseRecord {
    ttl: Duration,
    deadline: Instant,
}

struct StoreState {
    revision: Revision,
    kv: BTreeMap<String, StoredValue>,
    /// Every event ever published, kept for watch replay.
    history: Vec<WatchEvent>,
    watchers: Vec<Watcher>,
    leases: HashMap<u64, LeaseRecord>,
    next_lease: u64,
}

impl StoreState {
    fn publish(&mut self, event: WatchEvent) {
        self.history.push(event.clone());
        self.watchers.retain(|w| {
            if !event.key.starts_with(&w.prefix) {
                return true;
            }
            // A failed send means the subscription was dropped.
            w.tx.send(event.clone()).is_ok()
        });
    }

    fn remove_key(&mut self, key: &str) {
        if self.kv.remove(key).is_some() {
            self.revision += 1;
            let event = WatchEvent {
                kind: EventKind::Delete,
                key: key.to_string(),
                value: Vec::new(),
                revision: self.revision,
            };
            self.publish(event);
        }
    }

    /// Deletes every key bound to `lease`, emitting DELETE events.
    fn drop_lease_keys(&mut self, lease: LeaseId) {
        let bound: Vec<String> = self
            .kv
            .iter()
            .filter(|(_, v)| v.lease == Some(lease))
            .map(|(k, _)| k.clone())
            .collect();
        for key in bound {
            self.remove_key(&key);
        }
    }
}

/// Embedded coordination store. Create with [`MemoryCoordination::new`] and
/// hand out clones of the returned `Arc` as `Arc<dyn CoordinationClient>`.
pub struct MemoryCoordination {
    state: Arc<Mutex<StoreState>>,
    sweeper: tokio::task::JoinHandle<()>,
}

impl MemoryCoordination {
    pub fn new() -> Arc<Self> {
        let state = Arc::new(Mutex::new(StoreState {
            revision: 0,
            kv: BTreeMap::new(),
            history: Vec::new(),
            watchers: Vec::new(),
            leases: HashMap::new(),
            next_lease: 1,
        }));

        let sweeper_state = state.clone();
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                Self::expire_overdue(&sweeper_state);
            }
        });

        Arc::new(Self { state, sweeper })
    }

    fn expire_overdue(state: &Mutex<StoreState>) {
        let mut state = state.lock();
        let now = Instant::now();
        let expired: Vec<u64> = state
            .leases
            .iter()
            .filter(|(_, record)| record.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            tracing::debug!("Lease {} expired, deleting bound keys", id);
            state.leases.remove(&id);
            state.drop_lease_keys(LeaseId(id));
        }
    }
}

impl Drop for MemoryCoordination {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

#[async_trait::async_trait]
impl CoordinationClient for MemoryCoordination {
    async fn scan_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> CoordResult<ScanPage> {
        let state = self.state.lock();
        let mut kvs = Vec::new();
        let mut more = false;

        for (key, stored) in state.kv.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(after) = start_after {
                if key.as_str() <= after {
                    continue;
                }
            }
            if limit > 0 && kvs.len() == limit {
                more = true;
                break;
            }
            kvs.push(KeyValue {
                key: key.clone(),
                value: stored.value.clone(),
                mod_revision: stored.mod_revision,
            });
        }

        Ok(ScanPage { kvs, more })
    }

    async fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>) -> CoordResult<Revision> {
        let mut state = self.state.lock();

        if let Some(lease) = lease {
            if !state.leases.contains_key(&lease.0) {
                return Err(CoordError::UnknownLease(lease));
            }
        }

        state.revision += 1;
        let revision = state.revision;
        state.kv.insert(
            key.to_string(),
            StoredValue {
                value: value.clone(),
                mod_revision: revision,
                lease,
            },
        );
        state.publish(WatchEvent {
            kind: EventKind::Put,
            key: key.to_string(),
            value,
            revision,
        });

        Ok(revision)
    }

    async fn delete(&self, key: &str) -> CoordResult<()> {
        let mut state = self.state.lock();
        state.remove_key(key);
        Ok(())
    }

    async fn watch_prefix(
        &self,
        prefix: &str,
        from_revision: Revision,
    ) -> CoordResult<WatchSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Replay and registration happen under one lock acquisition, so no
        // event published in between can be missed.
        let mut state = self.state.lock();

        if from_revision > 0 {
            for event in &state.history {
                if event.revision >= from_revision && event.key.starts_with(prefix) {
                    let _ = tx.send(event.clone());
                }
            }
        }

        state.watchers.push(Watcher {
            prefix: prefix.to_string(),
            tx,
        });

        Ok(WatchSubscription::new(rx))
    }

    async fn lease_grant(&self, ttl: Duration) -> CoordResult<LeaseId> {
        let mut state = self.state.lock();
        let id = state.next_lease;
        state.next_lease += 1;
        state.leases.insert(
            id,
            LeaseRecord {
                ttl,
                deadline: Instant::now() + ttl,
            },
        );
        tracing::debug!("Granted lease {} with ttl {:?}", id, ttl);
        Ok(LeaseId(id))
    }

    async fn lease_keep_alive(&self, lease: LeaseId) -> CoordResult<()> {
        let mut state = self.state.lock();
        match state.leases.get_mut(&lease.0) {
            Some(record) => {
                record.deadline = Instant::now() + record.ttl;
                Ok(())
            }
            None => Err(CoordError::UnknownLease(lease)),
        }
    }

    async fn lease_revoke(&self, lease: LeaseId) -> CoordResult<()> {
        let mut state = self.state.lock();
        if state.leases.remove(&lease.0).is_none() {
            return Err(CoordError::UnknownLease(lease));
        }
        state.drop_lease_keys(lease);
        tracing::debug!("Revoked lease {}", lease);
        Ok(())
    }
}
