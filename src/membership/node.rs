//! Membership Node
//!
//! The lifecycle orchestrator. Construction bootstraps the local view
//! (snapshot, then watch); `join` publishes the node's own lease-backed
//! record; `leave` revokes it; `close` tears the node down. Callers read the
//! converging view through `members()` at any time.

use crate::coordination::client::{CoordError, CoordinationClient, LeaseId};
use crate::membership::error::{Fault, MembershipError};
use crate::membership::lease::LeaseManager;
use crate::membership::reconciler::ChangeReconciler;
use crate::membership::snapshot::load_snapshot;
use crate::membership::store::MembershipStore;
use crate::membership::types::{Member, MemberId, NodeConfig};

use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Constructed,
    Joined,
    Left,
    Closed,
}

pub struct Node {
    member: Member,
    config: NodeConfig,
    client: Arc<dyn CoordinationClient>,
    store: Arc<MembershipStore>,
    reconciler: ChangeReconciler,
    lease: LeaseManager,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
    faults: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<Fault>>>,
}

impl Node {
    /// Builds a node against a connected coordination client: loads the
    /// member snapshot, then opens the watch at the snapshot revision. Any
    /// failure tears down what was opened and propagates.
    pub async fn new(
        client: Arc<dyn CoordinationClient>,
        config: NodeConfig,
    ) -> Result<Self, MembershipError> {
        let member = Member::new(MemberId::new());
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        let store = Arc::new(MembershipStore::new());

        tracing::info!("Constructing membership node {}", member.id());

        let revision =
            load_snapshot(&client, &store, config.operation_timeout, &fault_tx).await?;
        let reconciler =
            ChangeReconciler::start(client.clone(), store.clone(), revision, fault_tx.clone())
                .await?;
        let lease = LeaseManager::new(client.clone(), config.operation_timeout, fault_tx);

        Ok(Self {
            member,
            config,
            client,
            store,
            reconciler,
            lease,
            lifecycle: tokio::sync::Mutex::new(Lifecycle::Constructed),
            faults: parking_lot::Mutex::new(Some(fault_rx)),
        })
    }

    pub fn identity(&self) -> MemberId {
        self.member.id()
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    /// Point-in-time copy of the membership view. Never blocks on I/O.
    pub fn members(&self) -> Vec<Member> {
        self.store.snapshot()
    }

    /// Takes the background-fault receiver. Returns `None` after the first
    /// call.
    pub fn faults(&self) -> Option<mpsc::UnboundedReceiver<Fault>> {
        self.faults.lock().take()
    }

    /// Registers this node in the cluster: grants the presence lease and
    /// publishes the member record bound to it.
    pub async fn join(&self) -> Result<(), MembershipError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Constructed => {}
            Lifecycle::Joined => {
                return Err(MembershipError::AlreadyJoined {
                    member: self.identity(),
                })
            }
            Lifecycle::Left => {
                return Err(MembershipError::AlreadyLeft {
                    member: self.identity(),
                })
            }
            Lifecycle::Closed => {
                return Err(MembershipError::Closing {
                    member: self.identity(),
                })
            }
        }

        tracing::info!("Node {} joining the cluster", self.identity());

        match self.try_join().await {
            Ok(()) => {
                *lifecycle = Lifecycle::Joined;
                tracing::info!("Node {} joined the cluster", self.identity());
                Ok(())
            }
            Err(source) => Err(MembershipError::JoinFailed {
                member: self.identity(),
                source: Box::new(source),
            }),
        }
    }

    async fn try_join(&self) -> Result<(), MembershipError> {
        let lease_id = self.lease.grant(self.config.lease_ttl).await?;

        if let Err(error) = self.publish_record(lease_id).await {
            // The lease was granted but the record never landed. Revoke it so
            // nothing leaks; the publish error is what the caller sees.
            if let Err(revoke_error) = self.lease.revoke().await {
                tracing::warn!(
                    "Could not revoke lease after failed join of {}: {}",
                    self.identity(),
                    revoke_error
                );
            }
            return Err(error);
        }
        Ok(())
    }

    async fn publish_record(&self, lease_id: LeaseId) -> Result<(), MembershipError> {
        let value = serde_json::to_vec(&self.member)?;
        tokio::time::timeout(
            self.config.operation_timeout,
            self.client.put(&self.member.key(), value, Some(lease_id)),
        )
        .await
        .map_err(|_| {
            MembershipError::PublishRecord(CoordError::Timeout(self.config.operation_timeout))
        })?
        .map_err(MembershipError::PublishRecord)?;
        Ok(())
    }

    /// Deregisters this node: stops the keep-alive and revokes the lease,
    /// which deletes the record server-side.
    pub async fn leave(&self) -> Result<(), MembershipError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Joined => {}
            Lifecycle::Constructed => {
                return Err(MembershipError::NotJoined {
                    member: self.identity(),
                })
            }
            Lifecycle::Left => {
                return Err(MembershipError::AlreadyLeft {
                    member: self.identity(),
                })
            }
            Lifecycle::Closed => {
                return Err(MembershipError::Closing {
                    member: self.identity(),
                })
            }
        }

        tracing::info!("Node {} leaving the cluster", self.identity());

        match self.lease.revoke().await {
            Ok(()) => {
                *lifecycle = Lifecycle::Left;
                tracing::info!("Node {} left the cluster", self.identity());
                Ok(())
            }
            Err(source) => Err(MembershipError::LeaveFailed {
                member: self.identity(),
                source: Box::new(source),
            }),
        }
    }

    /// Shuts the node down: best-effort leave when still joined, then stops
    /// the reconciler. Safe to call more than once.
    pub async fn close(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if *lifecycle == Lifecycle::Closed {
            return;
        }

        if *lifecycle == Lifecycle::Joined {
            if let Err(error) = self.lease.revoke().await {
                tracing::warn!("Leave during close of {} failed: {}", self.identity(), error);
            }
        }

        *lifecycle = Lifecycle::Closed;
        self.reconciler.stop();
        tracing::info!("Node {} closed", self.identity());
    }
}
