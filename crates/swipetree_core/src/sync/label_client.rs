//! Client for the remote label-commit service.

use crate::model::identifier::Identifier;
use crate::model::meta::PersonMeta;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upstream detail text emitted when a write used a stale revision token.
const STALE_REVISION_MARKER: &str = "does not match";

pub type LabelSyncResult<T> = Result<T, LabelSyncError>;

/// Remote commit failures, reported with status and upstream detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSyncError {
    /// Another writer changed the document since it was read.
    CommitConflict { status: u16, detail: String },
    /// Transport failure or non-conflict rejection. `status` is `None` when no
    /// response arrived.
    CommitTransportFailure { status: Option<u16>, detail: String },
}

impl Display for LabelSyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommitConflict { status, detail } => {
                write!(f, "label commit conflict (status {status}): {detail}")
            }
            Self::CommitTransportFailure {
                status: Some(status),
                detail,
            } => write!(f, "label commit failed (status {status}): {detail}"),
            Self::CommitTransportFailure {
                status: None,
                detail,
            } => write!(f, "label commit failed: {detail}"),
        }
    }
}

impl Error for LabelSyncError {}

/// Remote collaborator that accepts `{id, meta}` label commits.
#[async_trait]
pub trait LabelSync: Send + Sync {
    async fn commit_label(&self, id: &Identifier, meta: &PersonMeta) -> LabelSyncResult<()>;
}

#[derive(Serialize)]
struct CommitBody<'a> {
    id: &'a Identifier,
    meta: &'a PersonMeta,
}

/// HTTP client posting label commits as JSON.
pub struct HttpLabelSync {
    client: Client,
    endpoint: String,
}

impl HttpLabelSync {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl LabelSync for HttpLabelSync {
    async fn commit_label(&self, id: &Identifier, meta: &PersonMeta) -> LabelSyncResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&CommitBody { id, meta })
            .send()
            .await
            .map_err(|err| LabelSyncError::CommitTransportFailure {
                status: err.status().map(|status| status.as_u16()),
                detail: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            info!("event=label_commit module=sync status=ok id={id}");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let error = classify_failure(status, &text);
        warn!(
            "event=label_commit module=sync status=error id={} http_status={} error={}",
            id,
            status.as_u16(),
            error
        );
        Err(error)
    }
}

/// Maps a failed commit response onto the error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> LabelSyncError {
    let detail = extract_detail(body);
    let code = status.as_u16();
    let conflict_status = matches!(
        status,
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED | StatusCode::UNPROCESSABLE_ENTITY
    );
    if conflict_status || detail.contains(STALE_REVISION_MARKER) {
        LabelSyncError::CommitConflict {
            status: code,
            detail,
        }
    } else {
        LabelSyncError::CommitTransportFailure {
            status: Some(code),
            detail,
        }
    }
}

fn extract_detail(body: &str) -> String {
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let pick = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
    match (pick("error"), pick("detail")) {
        (Some(error), Some(detail)) => format!("{error}: {detail}"),
        (Some(message), None) | (None, Some(message)) => message,
        (None, None) => body.trim().to_string(),
    }
}
