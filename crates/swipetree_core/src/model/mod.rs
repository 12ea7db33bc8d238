//! Domain model for identifier-derived family navigation.
//!
//! # Responsibility
//! - Define the identifier encoding and the pure relationship algebra.
//! - Define display records (cards, person metadata).
//!
//! # Invariants
//! - Relationships are computed from identifier digits; no graph is stored.
//!
//! # See also
//! - `crate::service::navigation` for how candidates become grids.

pub mod card;
pub mod identifier;
pub mod meta;
pub mod relation;
