//! Artifact existence probing.
//!
//! # Responsibility
//! - Answer "does the primary artifact for this id exist" with a plain bool.
//! - Own the artifact naming convention shared by every probe backend.
//!
//! # Invariants
//! - Probes never return errors; any failure or timeout is `false`.
//! - Every probe carries a fresh cache-defeating token.
//!
//! # See also
//! - `crate::service::card_resolver` for fan-out over candidates.

mod directory;
mod http;

pub use directory::DirectoryExistenceProbe;
pub use http::HttpExistenceProbe;

use crate::model::identifier::Identifier;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use uuid::Uuid;

/// Extension order the display layer walks when an image fails to load.
pub const ARTIFACT_EXTENSION_FALLBACKS: &[&str] = &[".jpg", ".JPG", ".jpeg", ".png"];

/// Existence check for the artifact addressed by an identifier.
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    /// Resolves `true` only when the artifact is retrievable.
    async fn probe(&self, id: &Identifier) -> bool;
}

/// Returns the flat artifact name for `id`, e.g. `140000.1.jpg`.
pub fn artifact_name(id: &Identifier, extension: &str) -> String {
    format!("{id}.{}", extension.trim_start_matches('.'))
}

/// Returns a fresh cache-busting query token, e.g. `v=3f2a...`.
pub fn cache_token() -> String {
    format!("v={}", Uuid::new_v4().simple())
}

/// Returns the extension tried after `current` on load failure, if any.
pub fn next_fallback_extension(current: &str) -> Option<&'static str> {
    let index = ARTIFACT_EXTENSION_FALLBACKS
        .iter()
        .position(|candidate| *candidate == current)?;
    ARTIFACT_EXTENSION_FALLBACKS.get(index + 1).copied()
}

/// Runs one probe bounded by `timeout`; expiry counts as absent.
pub async fn probe_within<P>(probe: &P, id: &Identifier, timeout: Duration) -> bool
where
    P: ExistenceProbe + ?Sized,
{
    match tokio::time::timeout(timeout, probe.probe(id)).await {
        Ok(exists) => exists,
        Err(_) => {
            debug!(
                "event=probe module=probe status=timeout id={} timeout_ms={}",
                id,
                timeout.as_millis()
            );
            false
        }
    }
}
