//! Remote label synchronization.
//!
//! # Responsibility
//! - Push locally saved labels to the remote label-commit service.
//! - Implement the commit service's read-merge-write request handling.
//!
//! # Invariants
//! - One write attempt per request; conflicts surface to the caller.

pub mod label_client;
pub mod label_commit;
