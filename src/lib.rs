//! Cluster Membership Library
//!
//! This library crate defines the building blocks of a lease-backed cluster
//! membership node. It serves as the foundation for the binary executable
//! (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of two loosely coupled subsystems:
//!
//! - **`coordination`**: The client seam to the coordination key-value store.
//!   Defines the `CoordinationClient` trait (prefix scans, revisioned watches,
//!   leases) plus an in-process implementation used by tests and demos.
//! - **`membership`**: The membership lifecycle layer. A `Node` registers its
//!   own record under a lease, bootstraps a snapshot of the member namespace,
//!   and reconciles watch events into a thread-safe membership view.

pub mod coordination;
pub mod membership;
