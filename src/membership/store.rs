//! Membership View
//!
//! The locally mirrored set of cluster members. Written by the snapshot
//! loader and the reconciler, read by any caller thread.

use crate::membership::types::{Member, MemberId};
use dashmap::DashMap;

/// Concurrent projection of the member namespace.
///
/// Mutations are idempotent, so the same event applied twice leaves the view
/// unchanged. This is what makes the watch resume boundary safe.
pub struct MembershipStore {
    members: DashMap<MemberId, Member>,
}

impl MembershipStore {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
        }
    }

    /// Inserts or overwrites the record for its id.
    pub fn apply_put(&self, member: Member) {
        self.members.insert(member.id(), member);
    }

    /// Removes the record for `id`. Returns whether it was present.
    pub fn apply_delete(&self, id: &MemberId) -> bool {
        self.members.remove(id).is_some()
    }

    pub fn contains(&self, id: &MemberId) -> bool {
        self.members.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Point-in-time copy of the current view.
    pub fn snapshot(&self) -> Vec<Member> {
        self.members.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl Default for MembershipStore {
    fn default() -> Self {
        Self::new()
    }
}
