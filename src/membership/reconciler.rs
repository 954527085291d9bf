//! Membership Change Reconciler
//!
//! Consumes the watch stream for the member namespace on a background task
//! and folds each event into the local view. Handling is pure map mutation,
//! so the consumer never falls behind on I/O.

use crate::coordination::client::{CoordinationClient, EventKind, Revision, WatchEvent};
use crate::membership::error::{Fault, MembershipError};
use crate::membership::store::MembershipStore;
use crate::membership::types::{member_id_from_key, Member, NODES_PREFIX};

use std::sync::Arc;
use tokio::sync::mpsc;

/// Background watch consumer. Aborted on stop or drop.
pub struct ChangeReconciler {
    handle: tokio::task::JoinHandle<()>,
}

impl ChangeReconciler {
    /// Opens the watch at `from_revision` and starts consuming.
    ///
    /// The watch delivers every retained event at or past `from_revision`.
    /// That overlaps the snapshot by at most one event per key, which the
    /// store's idempotent mutations absorb.
    pub async fn start(
        client: Arc<dyn CoordinationClient>,
        store: Arc<MembershipStore>,
        from_revision: Revision,
        faults: mpsc::UnboundedSender<Fault>,
    ) -> Result<Self, MembershipError> {
        let mut subscription = client
            .watch_prefix(NODES_PREFIX, from_revision)
            .await
            .map_err(MembershipError::WatchOpen)?;

        tracing::info!("Watching membership changes from revision {}", from_revision);

        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                apply_event(&store, &faults, event);
            }
            tracing::error!("Membership watch stream closed");
            let _ = faults.send(Fault::WatchClosed);
        });

        Ok(Self { handle })
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ChangeReconciler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn apply_event(store: &MembershipStore, faults: &mpsc::UnboundedSender<Fault>, event: WatchEvent) {
    match event.kind {
        EventKind::Put => match serde_json::from_slice::<Member>(&event.value) {
            Ok(member) => {
                tracing::info!("PUT {}", member.id());
                store.apply_put(member);
            }
            Err(error) => {
                tracing::warn!("Skipping undecodable record under {}: {}", event.key, error);
                let _ = faults.send(Fault::Decode {
                    key: event.key,
                    error,
                });
            }
        },
        EventKind::Delete => match member_id_from_key(&event.key) {
            Some(id) => {
                tracing::info!("DELETE {}", id);
                store.apply_delete(&id);
            }
            None => {
                tracing::warn!("Ignoring delete of malformed key {}", event.key);
            }
        },
    }
}
