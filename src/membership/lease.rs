//! Presence Lease Manager
//!
//! Owns the node's single presence lease: grants it, keeps it alive from a
//! sidecar task, and revokes it on leave. A stopped keep-alive lets the lease
//! expire server-side, which is the failure-detection path for a dead node.

use crate::coordination::client::{CoordError, CoordinationClient, LeaseId};
use crate::membership::error::{Fault, MembershipError};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Lower bound on the keep-alive cadence, for very short leases.
const MIN_KEEP_ALIVE_INTERVAL: Duration = Duration::from_millis(200);

struct ActiveLease {
    id: LeaseId,
    keeper: tokio::task::JoinHandle<()>,
}

pub struct LeaseManager {
    client: Arc<dyn CoordinationClient>,
    operation_timeout: Duration,
    faults: mpsc::UnboundedSender<Fault>,
    active: tokio::sync::Mutex<Option<ActiveLease>>,
}

impl LeaseManager {
    pub fn new(
        client: Arc<dyn CoordinationClient>,
        operation_timeout: Duration,
        faults: mpsc::UnboundedSender<Fault>,
    ) -> Self {
        Self {
            client,
            operation_timeout,
            faults,
            active: tokio::sync::Mutex::new(None),
        }
    }

    /// Grants a lease with the given time-to-live and starts its keep-alive
    /// sidecar. At most one lease may be active at a time.
    pub async fn grant(&self, ttl: Duration) -> Result<LeaseId, MembershipError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(MembershipError::LeaseAlreadyActive);
        }

        let id = tokio::time::timeout(self.operation_timeout, self.client.lease_grant(ttl))
            .await
            .map_err(|_| MembershipError::LeaseGrant(CoordError::Timeout(self.operation_timeout)))?
            .map_err(MembershipError::LeaseGrant)?;

        tracing::debug!("Granted presence lease {}", id);

        let keeper = self.spawn_keep_alive(id, ttl);
        *active = Some(ActiveLease { id, keeper });
        Ok(id)
    }

    /// Pings the lease at a third of its time-to-live. A failed ping stops
    /// the sidecar; the lease then expires server-side on its own.
    fn spawn_keep_alive(&self, id: LeaseId, ttl: Duration) -> tokio::task::JoinHandle<()> {
        let client = self.client.clone();
        let faults = self.faults.clone();
        let cadence = (ttl / 3).max(MIN_KEEP_ALIVE_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                match client.lease_keep_alive(id).await {
                    Ok(()) => {
                        tracing::trace!("Renewed presence lease {}", id);
                    }
                    Err(error) => {
                        tracing::error!("Keep-alive for lease {} failed: {}", id, error);
                        let _ = faults.send(Fault::LeaseKeepAlive(error));
                        break;
                    }
                }
            }
        })
    }

    /// Stops the keep-alive and revokes the active lease. A no-op when no
    /// lease is active. On revoke failure the lease stays recorded, since the
    /// record may still be registered server-side.
    pub async fn revoke(&self) -> Result<(), MembershipError> {
        let mut active = self.active.lock().await;
        let Some(lease) = active.as_ref() else {
            return Ok(());
        };

        lease.keeper.abort();
        let id = lease.id;

        tokio::time::timeout(self.operation_timeout, self.client.lease_revoke(id))
            .await
            .map_err(|_| MembershipError::LeaseRevoke(CoordError::Timeout(self.operation_timeout)))?
            .map_err(MembershipError::LeaseRevoke)?;

        tracing::debug!("Revoked presence lease {}", id);
        *active = None;
        Ok(())
    }

    pub async fn lease_id(&self) -> Option<LeaseId> {
        self.active.lock().await.as_ref().map(|lease| lease.id)
    }
}

impl Drop for LeaseManager {
    fn drop(&mut self) {
        if let Some(lease) = self.active.get_mut() {
            lease.keeper.abort();
        }
    }
}
