//! SQLite implementation of the local store.

use rusqlite::{params, Connection, Params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

use super::traits::{Collection, Entity, LocalStore};

/// Additive schema steps. Entry `n` upgrades a store to version `n + 1`.
const MIGRATIONS: &[&str] = &[
  r#"
-- Records of every collection (stores serialized JSON)
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    record_key INTEGER NOT NULL,
    index_value INTEGER,
    data BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (collection, record_key)
);

-- Key generators for auto-increment collections, untouched by clear
CREATE TABLE IF NOT EXISTS key_generators (
    collection TEXT PRIMARY KEY,
    next_key INTEGER NOT NULL
);
"#,
  r#"
CREATE INDEX IF NOT EXISTS idx_records_index_value
    ON records(collection, index_value);
"#,
];

/// Schema version written by this build.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

/// SQLite-based local store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at `path`, upgrading its schema if needed.
  pub fn open(path: &Path) -> StoreResult<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let conn = Connection::open(path).map_err(|e| StoreError::sqlite("open store database", e))?;
    debug!(path = %path.display(), "opened local store");
    Self::from_connection(conn)
  }

  /// Create a throwaway store that lives as long as the value.
  #[cfg(test)]
  pub fn open_in_memory() -> StoreResult<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| StoreError::sqlite("open in-memory store", e))?;
    Self::from_connection(conn)
  }

  /// Wrap an existing connection, upgrading its schema if needed.
  pub fn from_connection(mut conn: Connection) -> StoreResult<Self> {
    migrate(&mut conn)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| StoreError::Poisoned)
  }
}

fn schema_version(conn: &Connection) -> StoreResult<i64> {
  conn
    .query_row("PRAGMA user_version", [], |row| row.get(0))
    .map_err(|e| StoreError::sqlite("read schema version", e))
}

/// Bring the schema up to `SCHEMA_VERSION` without touching existing rows.
fn migrate(conn: &mut Connection) -> StoreResult<()> {
  let current = schema_version(conn)?;
  if current > SCHEMA_VERSION {
    return Err(StoreError::NewerSchema {
      found: current,
      supported: SCHEMA_VERSION,
    });
  }
  if current == SCHEMA_VERSION {
    return Ok(());
  }

  let tx = conn
    .transaction()
    .map_err(|e| StoreError::sqlite("begin migration", e))?;
  for step in MIGRATIONS.iter().skip(current as usize) {
    tx.execute_batch(step)
      .map_err(|e| StoreError::sqlite("apply schema migration", e))?;
  }
  tx.pragma_update(None, "user_version", SCHEMA_VERSION)
    .map_err(|e| StoreError::sqlite("record schema version", e))?;
  tx.commit()
    .map_err(|e| StoreError::sqlite("commit migration", e))?;

  info!(from = current, to = SCHEMA_VERSION, "upgraded local store schema");
  Ok(())
}

fn encode<T: Entity>(entity: &T) -> StoreResult<Vec<u8>> {
  serde_json::to_vec(entity).map_err(|e| StoreError::serde("serialize", T::COLLECTION.name(), e))
}

fn decode<T: Entity>(key: i64, data: &[u8]) -> StoreResult<T> {
  let mut entity: T = serde_json::from_slice(data)
    .map_err(|e| StoreError::serde("deserialize", T::COLLECTION.name(), e))?;
  entity.set_key(key);
  Ok(entity)
}

fn load_records<T: Entity>(conn: &Connection, sql: &str, params: impl Params) -> StoreResult<Vec<T>> {
  let mut stmt = conn
    .prepare(sql)
    .map_err(|e| StoreError::sqlite("prepare record query", e))?;

  let rows = stmt
    .query_map(params, |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))
    .map_err(|e| StoreError::sqlite("query records", e))?
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| StoreError::sqlite("read record row", e))?;

  rows.into_iter().map(|(key, data)| decode(key, &data)).collect()
}

/// Hand out the next key of an auto-increment collection.
fn next_key(conn: &Connection, collection: Collection) -> StoreResult<i64> {
  conn
    .execute(
      "INSERT INTO key_generators (collection, next_key) VALUES (?1, 1)
       ON CONFLICT(collection) DO NOTHING",
      params![collection.name()],
    )
    .map_err(|e| StoreError::sqlite("initialize key generator", e))?;

  let key: i64 = conn
    .query_row(
      "SELECT next_key FROM key_generators WHERE collection = ?1",
      params![collection.name()],
      |row| row.get(0),
    )
    .map_err(|e| StoreError::sqlite("read key generator", e))?;

  conn
    .execute(
      "UPDATE key_generators SET next_key = next_key + 1 WHERE collection = ?1",
      params![collection.name()],
    )
    .map_err(|e| StoreError::sqlite("advance key generator", e))?;

  Ok(key)
}

/// Keep the generator ahead of a key that was supplied explicitly.
fn reserve_key(conn: &Connection, collection: Collection, key: i64) -> StoreResult<()> {
  conn
    .execute(
      "INSERT INTO key_generators (collection, next_key) VALUES (?1, ?2 + 1)
       ON CONFLICT(collection) DO UPDATE SET next_key = MAX(next_key, excluded.next_key)",
      params![collection.name(), key],
    )
    .map_err(|e| StoreError::sqlite("reserve key", e))?;
  Ok(())
}

fn put_record<T: Entity>(conn: &Connection, entity: &T) -> StoreResult<i64> {
  let collection = T::COLLECTION;
  let key = match entity.key() {
    Some(key) => {
      if collection.auto_increment() {
        reserve_key(conn, collection, key)?;
      }
      key
    }
    None if collection.auto_increment() => next_key(conn, collection)?,
    None => {
      return Err(StoreError::MissingKey {
        collection: collection.name(),
      })
    }
  };

  conn
    .execute(
      "INSERT OR REPLACE INTO records (collection, record_key, index_value, data, stored_at)
       VALUES (?1, ?2, ?3, ?4, datetime('now'))",
      params![collection.name(), key, entity.index_value(), encode(entity)?],
    )
    .map_err(|e| StoreError::sqlite("store record", e))?;

  Ok(key)
}

impl LocalStore for SqliteStore {
  fn get_all<T: Entity>(&self) -> StoreResult<Vec<T>> {
    let conn = self.lock()?;
    load_records(
      &conn,
      "SELECT record_key, data FROM records WHERE collection = ?1 ORDER BY record_key",
      params![T::COLLECTION.name()],
    )
  }

  fn get_by_key<T: Entity>(&self, key: i64) -> StoreResult<Option<T>> {
    let conn = self.lock()?;
    let mut found: Vec<T> = load_records(
      &conn,
      "SELECT record_key, data FROM records WHERE collection = ?1 AND record_key = ?2",
      params![T::COLLECTION.name(), key],
    )?;
    Ok(found.pop())
  }

  fn get_by_index<T: Entity>(&self, field: &str, value: i64) -> StoreResult<Vec<T>> {
    let collection = T::COLLECTION;
    if collection.index() != Some(field) {
      return Err(StoreError::UnknownIndex {
        collection: collection.name(),
        field: field.to_string(),
      });
    }

    let conn = self.lock()?;
    load_records(
      &conn,
      "SELECT record_key, data FROM records
       WHERE collection = ?1 AND index_value = ?2
       ORDER BY record_key",
      params![collection.name(), value],
    )
  }

  fn put<T: Entity>(&self, entity: &T) -> StoreResult<i64> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| StoreError::sqlite("begin transaction", e))?;
    let key = put_record(&tx, entity)?;
    tx.commit()
      .map_err(|e| StoreError::sqlite("commit transaction", e))?;
    Ok(key)
  }

  fn put_many<T: Entity>(&self, entities: &[T]) -> StoreResult<Vec<i64>> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| StoreError::sqlite("begin transaction", e))?;
    let keys = entities
      .iter()
      .map(|entity| put_record(&tx, entity))
      .collect::<StoreResult<Vec<_>>>()?;
    tx.commit()
      .map_err(|e| StoreError::sqlite("commit transaction", e))?;
    Ok(keys)
  }

  fn delete<T: Entity>(&self, key: i64) -> StoreResult<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "DELETE FROM records WHERE collection = ?1 AND record_key = ?2",
        params![T::COLLECTION.name(), key],
      )
      .map_err(|e| StoreError::sqlite("delete record", e))?;
    Ok(())
  }

  fn clear<T: Entity>(&self) -> StoreResult<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "DELETE FROM records WHERE collection = ?1",
        params![T::COLLECTION.name()],
      )
      .map_err(|e| StoreError::sqlite("clear collection", e))?;
    Ok(())
  }
}
