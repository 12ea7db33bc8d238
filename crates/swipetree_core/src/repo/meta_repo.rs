//! Local metadata store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist `PersonMeta` records under `<namespace>.meta.<id>` keys.
//! - Keep SQL and JSON encoding inside the repository boundary.
//!
//! # Invariants
//! - Malformed stored JSON reads as "no metadata", never as an error.
//! - Writes overwrite the whole record for one identifier.

use crate::db::DbError;
use crate::model::identifier::Identifier;
use crate::model::meta::PersonMeta;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub type MetaRepoResult<T> = Result<T, MetaRepoError>;

/// Errors from metadata persistence.
#[derive(Debug)]
pub enum MetaRepoError {
    Db(DbError),
    Encode(serde_json::Error),
}

impl Display for MetaRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode metadata: {err}"),
        }
    }
}

impl Error for MetaRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for MetaRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for MetaRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key-value access to per-person display metadata.
pub trait MetadataStore {
    /// Loads metadata for `id`; corrupt records read as `None`.
    fn get_meta(&self, id: &Identifier) -> MetaRepoResult<Option<PersonMeta>>;
    /// Overwrites metadata for `id`.
    fn put_meta(&self, id: &Identifier, meta: &PersonMeta) -> MetaRepoResult<()>;

    /// Display label for `id`; empty when absent or unreadable.
    fn display_name(&self, id: &Identifier) -> String {
        match self.get_meta(id) {
            Ok(meta) => meta.map(|meta| meta.display_name()).unwrap_or_default(),
            Err(err) => {
                warn!(
                    "event=meta_read module=repo status=error id={} error={}",
                    id, err
                );
                String::new()
            }
        }
    }
}

/// Builds the storage key for one identifier.
pub fn meta_key(namespace: &str, id: &Identifier) -> String {
    format!("{}.meta.{id}", namespace.trim())
}

/// SQLite-backed metadata store over the `kv_store` table.
pub struct SqliteMetaRepository<'conn> {
    conn: &'conn Connection,
    namespace: String,
}

impl<'conn> SqliteMetaRepository<'conn> {
    /// Creates a repository over a migrated connection.
    pub fn new(conn: &'conn Connection, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Writes a raw value under a key; used to seed or repair records.
    pub fn put_raw(&self, key: &str, value: &str) -> MetaRepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value, now_epoch_ms()],
        )?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> MetaRepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl MetadataStore for SqliteMetaRepository<'_> {
    fn get_meta(&self, id: &Identifier) -> MetaRepoResult<Option<PersonMeta>> {
        let key = meta_key(&self.namespace, id);
        let Some(raw) = self.get_raw(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<PersonMeta>(&raw) {
            Ok(meta) => Ok(Some(meta.normalized())),
            Err(err) => {
                warn!(
                    "event=meta_read module=repo status=degraded id={} reason=malformed_json error={}",
                    id, err
                );
                Ok(None)
            }
        }
    }

    fn put_meta(&self, id: &Identifier, meta: &PersonMeta) -> MetaRepoResult<()> {
        let encoded = serde_json::to_string(meta).map_err(MetaRepoError::Encode)?;
        self.put_raw(&meta_key(&self.namespace, id), &encoded)
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
