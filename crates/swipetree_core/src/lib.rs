//! Core domain logic for SwipeTree.
//! Identifier algebra, navigation state and label persistence live here;
//! front-ends only render and forward gestures.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod probe;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{ConfigError, EngineConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_with, logging_status, LogSettings};
pub use model::card::Card;
pub use model::identifier::{format, parse, IdError, IdResult, Identifier};
pub use model::meta::PersonMeta;
pub use probe::{DirectoryExistenceProbe, ExistenceProbe, HttpExistenceProbe};
pub use repo::meta_repo::{MetaRepoError, MetaRepoResult, MetadataStore, SqliteMetaRepository};
pub use service::card_resolver::CardResolver;
pub use service::gesture::{GestureEvent, GestureTracker, SwipeDirection};
pub use service::meta_service::{MetaService, SyncStatus};
pub use service::navigation::{
    DispatchOutcome, EditResult, GridKind, Intent, NavResult, NavState, NavigationEngine,
    NavigationError, SoftEditor,
};
pub use sync::label_client::{HttpLabelSync, LabelSync, LabelSyncError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
