//! Error types shared by the store, the gateway and the sync layer.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the remote API.
///
/// Every variant means the same thing to callers: assume the request did not
/// take effect.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("server responded with status {0}")]
  Status(u16),

  #[error("server returned errors: {0}")]
  Graphql(String),

  #[error("malformed response: {0}")]
  Malformed(String),
}

/// Failures of the local store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to {action}: {source}")]
  Sqlite {
    action: &'static str,
    #[source]
    source: rusqlite::Error,
  },

  #[error("failed to {action} {collection} record: {source}")]
  Serde {
    action: &'static str,
    collection: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to create store directory {}: {source}", path.display())]
  Directory {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("store schema version {found} is newer than supported version {supported}")]
  NewerSchema { found: i64, supported: i64 },

  #[error("collection {collection} has no index named {field}")]
  UnknownIndex {
    collection: &'static str,
    field: String,
  },

  #[error("{collection} records must carry their own key")]
  MissingKey { collection: &'static str },

  #[error("store lock poisoned")]
  Poisoned,
}

impl StoreError {
  pub fn sqlite(action: &'static str, source: rusqlite::Error) -> Self {
    Self::Sqlite { action, source }
  }

  pub fn serde(action: &'static str, collection: &'static str, source: serde_json::Error) -> Self {
    Self::Serde {
      action,
      collection,
      source,
    }
  }
}

/// Errors surfaced by the sync layer to the UI.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error("network error: {0}")]
  Network(#[from] GatewayError),

  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: i64 },

  #[error("invalid review: {0}")]
  Validation(&'static str),

  #[error("local store error: {0}")]
  Store(#[from] StoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
