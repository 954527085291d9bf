//! Membership Snapshot Loader
//!
//! Bootstraps the local view with one paginated read of the member namespace
//! and reports the highest revision observed, which is where the watch
//! resumes.

use crate::coordination::client::{CoordError, CoordinationClient, Revision};
use crate::membership::error::{Fault, MembershipError};
use crate::membership::store::MembershipStore;
use crate::membership::types::{Member, NODES_PREFIX};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Page size for the bootstrap scan.
const SNAPSHOT_PAGE_LIMIT: usize = 128;

/// Loads every member record under the namespace into `store`.
///
/// Returns the maximum `mod_revision` seen, or 0 when the namespace is empty.
/// Undecodable records are reported on the fault channel and skipped; a
/// failed or timed-out page read aborts the load.
pub async fn load_snapshot(
    client: &Arc<dyn CoordinationClient>,
    store: &MembershipStore,
    operation_timeout: Duration,
    faults: &mpsc::UnboundedSender<Fault>,
) -> Result<Revision, MembershipError> {
    let mut max_revision: Revision = 0;
    let mut start_after: Option<String> = None;
    let mut loaded = 0usize;

    loop {
        let page = tokio::time::timeout(
            operation_timeout,
            client.scan_prefix(NODES_PREFIX, start_after.as_deref(), SNAPSHOT_PAGE_LIMIT),
        )
        .await
        .map_err(|_| MembershipError::SnapshotLoad(CoordError::Timeout(operation_timeout)))?
        .map_err(MembershipError::SnapshotLoad)?;

        for kv in &page.kvs {
            max_revision = max_revision.max(kv.mod_revision);
            match serde_json::from_slice::<Member>(&kv.value) {
                Ok(member) => {
                    tracing::info!("LOAD {}", member.id());
                    store.apply_put(member);
                    loaded += 1;
                }
                Err(error) => {
                    tracing::warn!("Skipping undecodable record under {}: {}", kv.key, error);
                    let _ = faults.send(Fault::Decode {
                        key: kv.key.clone(),
                        error,
                    });
                }
            }
        }

        if !page.more {
            break;
        }
        start_after = page.kvs.last().map(|kv| kv.key.clone());
    }

    tracing::debug!(
        "Snapshot loaded {} members up to revision {}",
        loaded,
        max_revision
    );
    Ok(max_revision)
}
