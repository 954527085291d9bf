//! Membership Error Taxonomy
//!
//! Synchronous failures surface as `MembershipError` to the caller.
//! Failures on background tasks (watch stream, keep-alive sidecar) surface as
//! `Fault` reports on the node's fault channel.

use crate::coordination::client::CoordError;
use crate::membership::types::MemberId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("failed to load membership snapshot")]
    SnapshotLoad(#[source] CoordError),

    #[error("failed to open membership watch")]
    WatchOpen(#[source] CoordError),

    #[error("failed to grant presence lease")]
    LeaseGrant(#[source] CoordError),

    #[error("a presence lease is already active")]
    LeaseAlreadyActive,

    #[error("failed to revoke presence lease")]
    LeaseRevoke(#[source] CoordError),

    #[error("failed to publish member record")]
    PublishRecord(#[source] CoordError),

    #[error("failed to encode or decode member record")]
    Codec(#[from] serde_json::Error),

    #[error("node {member} failed to join the cluster")]
    JoinFailed {
        member: MemberId,
        #[source]
        source: Box<MembershipError>,
    },

    #[error("node {member} failed to leave the cluster")]
    LeaveFailed {
        member: MemberId,
        #[source]
        source: Box<MembershipError>,
    },

    #[error("node {member} has already joined")]
    AlreadyJoined { member: MemberId },

    #[error("node {member} has already left")]
    AlreadyLeft { member: MemberId },

    #[error("node {member} has not joined")]
    NotJoined { member: MemberId },

    #[error("node {member} is closing")]
    Closing { member: MemberId },
}

/// Failures observed on background tasks. Delivered on the fault channel and
/// logged; the node keeps running.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("membership watch stream closed")]
    WatchClosed,

    #[error("undecodable member record under {key}")]
    Decode {
        key: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("lease keep-alive failed")]
    LeaseKeepAlive(#[source] CoordError),
}
