//! Local directory existence probe.

use super::{artifact_name, ExistenceProbe};
use crate::model::identifier::Identifier;
use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;

/// Probes `<root>/<id>.<ext>` on the local file system.
pub struct DirectoryExistenceProbe {
    root: PathBuf,
    extension: String,
}

impl DirectoryExistenceProbe {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn artifact_path(&self, id: &Identifier) -> PathBuf {
        self.root.join(artifact_name(id, &self.extension))
    }
}

#[async_trait]
impl ExistenceProbe for DirectoryExistenceProbe {
    async fn probe(&self, id: &Identifier) -> bool {
        let path = self.artifact_path(id);
        let exists = tokio::fs::metadata(&path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        debug!(
            "event=probe module=probe status=ok backend=directory id={} exists={}",
            id, exists
        );
        exists
    }
}
