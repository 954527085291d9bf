//! Membership Data Types
//!
//! Identity, member records, the key layout of the member namespace, and the
//! node configuration knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Key prefix reserved for member records. Nothing else may live under it.
pub const NODES_PREFIX: &str = "/nodes/";

/// Default lease time-to-live.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(5);

/// Default bound on every coordination store call.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Unique identifier for a cluster member. Random per process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new() -> Self {
        MemberId(Uuid::new_v4())
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record a member publishes about itself. Stored as JSON under the
/// member's key; the id is the only mandatory field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub uuid: MemberId,
}

impl Member {
    pub fn new(uuid: MemberId) -> Self {
        Self { uuid }
    }

    pub fn id(&self) -> MemberId {
        self.uuid
    }

    /// The coordination store key this member's record lives under.
    pub fn key(&self) -> String {
        member_key(self.uuid)
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Member {}

impl std::hash::Hash for Member {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

/// Builds the membership key for an id.
pub fn member_key(id: MemberId) -> String {
    format!("{}{}", NODES_PREFIX, id)
}

/// Extracts the member id from a membership key. Returns `None` for keys
/// outside the namespace or with a malformed id segment.
pub fn member_id_from_key(key: &str) -> Option<MemberId> {
    let suffix = key.strip_prefix(NODES_PREFIX)?;
    Uuid::parse_str(suffix).ok().map(MemberId)
}

/// Tunables for a membership node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Time-to-live of the presence lease. Also drives the keep-alive cadence.
    pub lease_ttl: Duration,
    /// Upper bound applied to every coordination store call.
    pub operation_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            lease_ttl: DEFAULT_LEASE_TTL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}
