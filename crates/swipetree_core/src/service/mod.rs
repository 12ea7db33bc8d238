//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate algebra, probes and metadata into navigation use cases.
//! - Keep gesture and location plumbing decoupled from display layers.

pub mod card_resolver;
pub mod gesture;
pub mod location;
pub mod meta_service;
pub mod navigation;
