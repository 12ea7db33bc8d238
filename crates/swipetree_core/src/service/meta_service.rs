//! Local-first metadata use cases.
//!
//! # Responsibility
//! - Serve display labels from the local store.
//! - Persist soft-edit results locally, then hand them to the optional
//!   remote label collaborator.
//!
//! # Invariants
//! - A local write always happens before any remote attempt.
//! - Remote failure never rolls back the local write.

use crate::model::identifier::Identifier;
use crate::model::meta::PersonMeta;
use crate::repo::meta_repo::{MetaRepoResult, MetadataStore};
use crate::sync::label_client::{LabelSync, LabelSyncError};
use log::{info, warn};

/// Remote outcome of one metadata save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// No remote collaborator configured.
    LocalOnly,
    Synced,
    /// Saved locally; the single remote attempt failed.
    Failed(LabelSyncError),
}

/// Metadata facade over a local store and optional remote sync.
pub struct MetaService<S: MetadataStore> {
    store: S,
    remote: Option<Box<dyn LabelSync>>,
}

impl<S: MetadataStore> MetaService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: Box<dyn LabelSync>) -> Self {
        self.set_remote(remote);
        self
    }

    pub fn set_remote(&mut self, remote: Box<dyn LabelSync>) {
        self.remote = Some(remote);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current record; unreadable or missing data yields an empty record.
    pub fn meta(&self, id: &Identifier) -> PersonMeta {
        match self.store.get_meta(id) {
            Ok(meta) => meta.unwrap_or_default(),
            Err(err) => {
                warn!(
                    "event=meta_read module=service status=error id={} error={}",
                    id, err
                );
                PersonMeta::default()
            }
        }
    }

    pub fn label(&self, id: &Identifier) -> String {
        self.store.display_name(id)
    }

    /// Saves `meta` locally, then attempts one remote commit.
    ///
    /// # Errors
    /// - Returns the local store error; remote errors are reported through
    ///   `SyncStatus::Failed` instead.
    pub async fn save(&self, id: &Identifier, meta: PersonMeta) -> MetaRepoResult<SyncStatus> {
        let meta = meta.normalized();
        self.store.put_meta(id, &meta)?;
        info!("event=meta_save module=service status=ok id={id}");

        let Some(remote) = self.remote.as_ref() else {
            return Ok(SyncStatus::LocalOnly);
        };
        match remote.commit_label(id, &meta).await {
            Ok(()) => Ok(SyncStatus::Synced),
            Err(err) => {
                warn!(
                    "event=meta_sync module=service status=error id={} error={}",
                    id, err
                );
                Ok(SyncStatus::Failed(err))
            }
        }
    }
}
