//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for per-person display metadata.
//! - Isolate SQLite query details from navigation orchestration.
//!
//! # Invariants
//! - Read paths recover from corrupt records instead of propagating errors.

pub mod meta_repo;
