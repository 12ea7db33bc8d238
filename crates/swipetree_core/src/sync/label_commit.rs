//! Label-commit request handling.
//!
//! # Responsibility
//! - Validate `{id, meta}` commit requests and apply CORS/method policy.
//! - Read the current labels document, merge one record, write it back with
//!   the revision token that was read.
//!
//! # Invariants
//! - Exactly one write attempt per request; a stale revision fails the write.
//! - Every response carries the same CORS header set.
//! - Unreadable document content is treated as an empty label map.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_ORIGIN_ALLOW: &str = "https://allofusbhere.github.io";
pub const DEFAULT_LABELS_PATH: &str = "labels.json";
const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = "swipetree";

/// Commit service settings, normally taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCommitConfig {
    /// `owner/name` of the repository holding the labels document.
    pub repo: Option<String>,
    pub token: Option<String>,
    pub branch: String,
    /// Single origin allowed by CORS.
    pub origin_allow: String,
    pub path: String,
}

impl Default for LabelCommitConfig {
    fn default() -> Self {
        Self {
            repo: None,
            token: None,
            branch: DEFAULT_BRANCH.to_string(),
            origin_allow: DEFAULT_ORIGIN_ALLOW.to_string(),
            path: DEFAULT_LABELS_PATH.to_string(),
        }
    }
}

impl LabelCommitConfig {
    /// Reads `REPO`, `GITHUB_TOKEN`, `BRANCH` and `ORIGIN_ALLOW`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from an arbitrary variable lookup; blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            repo: read("REPO"),
            token: read("GITHUB_TOKEN"),
            branch: read("BRANCH").unwrap_or(defaults.branch),
            origin_allow: read("ORIGIN_ALLOW").unwrap_or(defaults.origin_allow),
            path: defaults.path,
        }
    }

    fn is_complete(&self) -> bool {
        self.repo.is_some() && self.token.is_some()
    }
}

/// Minimal HTTP request view handed to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub method: String,
    pub body: Option<String>,
}

/// Handler response: status, headers and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

/// Document snapshot as read from the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Raw UTF-8 document bytes.
    pub content: Vec<u8>,
    /// Revision token required for a conditional write.
    pub revision: String,
}

/// Store failure carrying the upstream status and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub status: u16,
    pub detail: String,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "label store error (status {}): {}", self.status, self.detail)
    }
}

impl Error for StoreError {}

/// Versioned document storage used by the commit handler.
#[async_trait]
pub trait LabelDocumentStore: Send + Sync {
    /// Returns `Ok(None)` when the document does not exist yet.
    async fn read(&self) -> Result<Option<StoredDocument>, StoreError>;
    /// Conditionally writes `content`; `revision` is `None` for a new document.
    async fn write(
        &self,
        content: &str,
        revision: Option<&str>,
        message: &str,
    ) -> Result<(), StoreError>;
}

/// Handles one label-commit request.
///
/// # Status mapping
/// - `OPTIONS` -> 200; any method other than `POST` -> 405.
/// - Missing repo/token -> 500; malformed body or missing `id`/`meta` -> 400.
/// - Read failure -> upstream status; write failure -> 500.
pub async fn handle_save_label<S>(
    config: &LabelCommitConfig,
    store: &S,
    request: &CommitRequest,
) -> CommitResponse
where
    S: LabelDocumentStore + ?Sized,
{
    let method = request.method.trim().to_ascii_uppercase();
    if method == "OPTIONS" {
        return respond(config, 200, json!({ "ok": true }));
    }
    if method != "POST" {
        return respond(config, 405, json!({ "error": "Method not allowed" }));
    }
    if !config.is_complete() {
        return respond(
            config,
            500,
            json!({ "error": "Missing GITHUB_TOKEN or REPO env var" }),
        );
    }

    let Some((id, meta)) = parse_commit_body(request.body.as_deref()) else {
        return respond(config, 400, json!({ "error": "Missing id/meta" }));
    };

    let (mut labels, revision) = match store.read().await {
        Ok(Some(document)) => (decode_labels(&document.content), Some(document.revision)),
        Ok(None) => (Map::new(), None),
        Err(err) => {
            warn!(
                "event=label_commit module=sync status=error stage=read http_status={}",
                err.status
            );
            return respond(
                config,
                err.status,
                json!({ "error": "GitHub read failed", "detail": err.detail }),
            );
        }
    };

    labels.insert(id.clone(), meta);
    let content = match serde_json::to_string_pretty(&Value::Object(labels)) {
        Ok(content) => content,
        Err(err) => {
            return respond(
                config,
                500,
                json!({ "error": "Unhandled error", "detail": err.to_string() }),
            );
        }
    };

    let message = format!("chore(labels): update {id}");
    if let Err(err) = store.write(&content, revision.as_deref(), &message).await {
        warn!(
            "event=label_commit module=sync status=error stage=write http_status={}",
            err.status
        );
        return respond(
            config,
            500,
            json!({ "error": "GitHub commit failed", "detail": err.detail }),
        );
    }

    info!("event=label_commit module=sync status=ok id={id}");
    respond(config, 200, json!({ "ok": true }))
}

/// CORS and content-type headers attached to every response.
pub fn cors_headers(config: &LabelCommitConfig) -> Vec<(String, String)> {
    vec![
        (
            "Access-Control-Allow-Origin".to_string(),
            config.origin_allow.clone(),
        ),
        (
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type, Authorization".to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            "POST, OPTIONS".to_string(),
        ),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}

fn respond(config: &LabelCommitConfig, status: u16, body: Value) -> CommitResponse {
    CommitResponse {
        status,
        headers: cors_headers(config),
        body,
    }
}

fn parse_commit_body(body: Option<&str>) -> Option<(String, Value)> {
    let raw = body.map(str::trim).filter(|raw| !raw.is_empty()).unwrap_or("{}");
    let Value::Object(mut fields) = serde_json::from_str::<Value>(raw).ok()? else {
        return None;
    };
    let id = match fields.remove("id")? {
        Value::String(id) if !id.trim().is_empty() => id.trim().to_string(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    match fields.remove("meta")? {
        meta @ Value::Object(_) => Some((id, meta)),
        _ => None,
    }
}

fn decode_labels(content: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(content) {
        Ok(Value::Object(labels)) => labels,
        _ => Map::new(),
    }
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct ContentsWrite<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

/// Labels document stored in a GitHub repository via the contents API.
pub struct GithubContentsStore {
    client: Client,
    api_url: String,
    token: String,
    branch: String,
}

impl GithubContentsStore {
    /// Builds a store from a complete config; `None` when repo/token is unset.
    pub fn from_config(config: &LabelCommitConfig) -> Option<Self> {
        let repo = config.repo.as_deref()?;
        let token = config.token.clone()?;
        Some(Self {
            client: Client::new(),
            api_url: contents_url(repo, &config.path),
            token,
            branch: config.branch.clone(),
        })
    }

    fn authorization(&self) -> String {
        format!("token {}", self.token)
    }
}

#[async_trait]
impl LabelDocumentStore for GithubContentsStore {
    async fn read(&self) -> Result<Option<StoredDocument>, StoreError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("ref", self.branch.as_str())])
            .header("Authorization", self.authorization())
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError {
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        let current: ContentsResponse = response.json().await.map_err(transport_error)?;
        Ok(Some(StoredDocument {
            content: decode_contents(&current.content, current.encoding.as_deref()),
            revision: current.sha,
        }))
    }

    async fn write(
        &self,
        content: &str,
        revision: Option<&str>,
        message: &str,
    ) -> Result<(), StoreError> {
        let body = ContentsWrite {
            message,
            content: BASE64.encode(content.as_bytes()),
            sha: revision,
            branch: &self.branch,
        };
        let response = self
            .client
            .put(&self.api_url)
            .header("Authorization", self.authorization())
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(StoreError {
            status: status.as_u16(),
            detail: response.text().await.unwrap_or_default(),
        })
    }
}

/// Contents API URL for `path` in `repo` (`owner/name`).
pub fn contents_url(repo: &str, path: &str) -> String {
    format!(
        "{GITHUB_API}/repos/{}/contents/{}",
        repo.trim().trim_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Decodes contents API payloads; undecodable input yields empty bytes.
pub fn decode_contents(content: &str, encoding: Option<&str>) -> Vec<u8> {
    match encoding.unwrap_or("base64") {
        "base64" => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64.decode(compact).unwrap_or_default()
        }
        _ => content.as_bytes().to_vec(),
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError {
        status: err.status().map_or(500, |status| status.as_u16()),
        detail: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{contents_url, decode_contents, parse_commit_body, LabelCommitConfig};
    use serde_json::json;

    #[test]
    fn from_lookup_applies_defaults_for_blank_values() {
        let config = LabelCommitConfig::from_lookup(|key| match key {
            "REPO" => Some("owner/images".to_string()),
            "BRANCH" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.repo.as_deref(), Some("owner/images"));
        assert_eq!(config.token, None);
        assert_eq!(config.branch, "main");
        assert_eq!(config.origin_allow, "https://allofusbhere.github.io");
    }

    #[test]
    fn parse_commit_body_requires_id_and_object_meta() {
        assert!(parse_commit_body(None).is_none());
        assert!(parse_commit_body(Some("not json")).is_none());
        assert!(parse_commit_body(Some(r#"{"id":"","meta":{}}"#)).is_none());
        assert!(parse_commit_body(Some(r#"{"id":"140000","meta":"x"}"#)).is_none());

        let (id, meta) =
            parse_commit_body(Some(r#"{"id":"140000","meta":{"name":"Ada"}}"#)).unwrap();
        assert_eq!(id, "140000");
        assert_eq!(meta, json!({"name": "Ada"}));
    }

    #[test]
    fn contents_url_normalizes_slashes() {
        assert_eq!(
            contents_url("/owner/images/", "/labels.json"),
            "https://api.github.com/repos/owner/images/contents/labels.json"
        );
    }

    #[test]
    fn decode_contents_ignores_line_breaks() {
        assert_eq!(decode_contents("eyJh\nIjox\nfQ==\n", None), br#"{"a":1}"#.to_vec());
        assert!(decode_contents("%%%", Some("base64")).is_empty());
    }
}
