//! Coordination Store Client Module
//!
//! Defines the narrow interface the membership layer needs from a coordination
//! key-value store, plus an in-process implementation for tests and demos.
//!
//! ## Core Mechanisms
//! - **Revisioned Keyspace**: Every mutation carries a monotonically increasing
//!   revision, so readers can order observations and resume watches.
//! - **Prefix Watches**: Subscribers receive an ordered stream of PUT/DELETE
//!   events for a key prefix, optionally replayed from a past revision.
//! - **Leases**: Keys can be bound to a time-bounded lease. When the lease
//!   expires or is revoked, the store deletes the bound keys itself.

pub mod client;
pub mod memory;

#[cfg(test)]
mod tests;
