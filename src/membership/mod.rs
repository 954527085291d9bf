//! Cluster Membership Module
//!
//! Implements a lease-backed membership protocol on top of the coordination
//! store. Each node registers its own record under a lease and mirrors the
//! member namespace into a local view that callers can read at any time.
//!
//! ## Core Mechanisms
//! - **Lease-Backed Presence**: A node's record lives only as long as its lease
//!   is kept alive, so crashed nodes disappear without any cooperation.
//! - **Snapshot + Watch Hand-Off**: Construction loads a paginated snapshot and
//!   resumes the watch at the snapshot revision, so no change falls in a gap.
//! - **Idempotent Reconciliation**: Watch events are applied as idempotent
//!   upserts/removes, which absorbs the duplicate at the resume boundary.

pub mod error;
pub mod lease;
pub mod node;
pub mod reconciler;
pub mod snapshot;
pub mod store;
pub mod types;
