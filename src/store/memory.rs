//! In-memory local store.
//!
//! Records are kept as JSON values so that reads hand out fresh copies, the
//! same way the SQLite store does. Nothing survives the process.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};

use super::traits::{Collection, Entity, LocalStore};

#[derive(Clone, Default)]
struct MemoryState {
  records: HashMap<Collection, BTreeMap<i64, Value>>,
  next_keys: HashMap<Collection, i64>,
}

impl MemoryState {
  fn put<T: Entity>(&mut self, entity: &T) -> StoreResult<i64> {
    let collection = T::COLLECTION;
    let next = self.next_keys.entry(collection).or_insert(1);
    let key = match entity.key() {
      Some(key) => {
        if collection.auto_increment() {
          *next = (*next).max(key + 1);
        }
        key
      }
      None if collection.auto_increment() => {
        let key = *next;
        *next += 1;
        key
      }
      None => {
        return Err(StoreError::MissingKey {
          collection: collection.name(),
        })
      }
    };

    let value = serde_json::to_value(entity)
      .map_err(|e| StoreError::serde("serialize", collection.name(), e))?;
    self.records.entry(collection).or_default().insert(key, value);
    Ok(key)
  }

  fn records<T: Entity>(&self) -> StoreResult<Vec<T>> {
    self
      .records
      .get(&T::COLLECTION)
      .into_iter()
      .flatten()
      .map(|(key, value)| decode(*key, value))
      .collect()
  }
}

fn decode<T: Entity>(key: i64, value: &Value) -> StoreResult<T> {
  let mut entity: T = serde_json::from_value(value.clone())
    .map_err(|e| StoreError::serde("deserialize", T::COLLECTION.name(), e))?;
  entity.set_key(key);
  Ok(entity)
}

/// Store that keeps every collection in process memory.
#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<MemoryState>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
    self.state.lock().map_err(|_| StoreError::Poisoned)
  }
}

impl LocalStore for MemoryStore {
  fn get_all<T: Entity>(&self) -> StoreResult<Vec<T>> {
    self.lock()?.records()
  }

  fn get_by_key<T: Entity>(&self, key: i64) -> StoreResult<Option<T>> {
    let state = self.lock()?;
    state
      .records
      .get(&T::COLLECTION)
      .and_then(|records| records.get(&key))
      .map(|value| decode(key, value))
      .transpose()
  }

  fn get_by_index<T: Entity>(&self, field: &str, value: i64) -> StoreResult<Vec<T>> {
    let collection = T::COLLECTION;
    if collection.index() != Some(field) {
      return Err(StoreError::UnknownIndex {
        collection: collection.name(),
        field: field.to_string(),
      });
    }

    let all: Vec<T> = self.lock()?.records()?;
    Ok(
      all
        .into_iter()
        .filter(|entity| entity.index_value() == Some(value))
        .collect(),
    )
  }

  fn put<T: Entity>(&self, entity: &T) -> StoreResult<i64> {
    self.lock()?.put(entity)
  }

  fn put_many<T: Entity>(&self, entities: &[T]) -> StoreResult<Vec<i64>> {
    let mut state = self.lock()?;
    // Stage on a copy so a failing record leaves nothing behind
    let mut staged = state.clone();
    let keys = entities
      .iter()
      .map(|entity| staged.put(entity))
      .collect::<StoreResult<Vec<i64>>>()?;
    *state = staged;
    Ok(keys)
  }

  fn delete<T: Entity>(&self, key: i64) -> StoreResult<()> {
    if let Some(records) = self.lock()?.records.get_mut(&T::COLLECTION) {
      records.remove(&key);
    }
    Ok(())
  }

  fn clear<T: Entity>(&self) -> StoreResult<()> {
    self.lock()?.records.remove(&T::COLLECTION);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{PendingReview, Restaurant, Review};
  use crate::testutil::{new_review, restaurant, review};
  use serde::{Deserialize, Serialize};

  /// Restaurant-like record whose key may be missing
  #[derive(Debug, Clone, Serialize, Deserialize)]
  struct Draft {
    id: Option<i64>,
  }

  impl Entity for Draft {
    const COLLECTION: Collection = Collection::Restaurants;

    fn key(&self) -> Option<i64> {
      self.id
    }
  }

  #[test]
  fn test_get_all_is_ordered_by_key() {
    let store = MemoryStore::new();
    store
      .put_many(&[restaurant(2, "Hometown BBQ"), restaurant(1, "Superiority Burger")])
      .unwrap();

    let all: Vec<Restaurant> = store.get_all().unwrap();
    assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
  }

  #[test]
  fn test_index_lookup_and_unknown_index() {
    let store = MemoryStore::new();
    store.put_many(&[review(1, 7), review(2, 8)]).unwrap();

    let found: Vec<Review> = store.get_by_index("restaurant_id", 8).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 2);

    assert!(matches!(
      store.get_by_index::<Restaurant>("restaurant_id", 8),
      Err(StoreError::UnknownIndex { .. })
    ));
  }

  #[test]
  fn test_pending_slots_survive_clear() {
    let store = MemoryStore::new();
    store.put(&PendingReview::new(new_review(1, "Ana"))).unwrap();
    store.clear::<PendingReview>().unwrap();

    let slot = store.put(&PendingReview::new(new_review(1, "Bo"))).unwrap();
    assert_eq!(slot, 2);

    let pending: Option<PendingReview> = store.get_by_key(2).unwrap();
    assert_eq!(pending.and_then(|p| p.slot), Some(2));
  }

  #[test]
  fn test_reads_return_copies() {
    let store = MemoryStore::new();
    store.put(&restaurant(1, "Sweet Chick")).unwrap();

    let mut copy: Restaurant = store.get_by_key(1).unwrap().unwrap();
    copy.is_favorite = true;

    let stored: Restaurant = store.get_by_key(1).unwrap().unwrap();
    assert!(!stored.is_favorite);
  }

  #[test]
  fn test_put_many_writes_nothing_when_a_record_fails() {
    let store = MemoryStore::new();
    let batch = [Draft { id: Some(1) }, Draft { id: None }, Draft { id: Some(3) }];

    assert!(matches!(
      store.put_many(&batch),
      Err(StoreError::MissingKey { .. })
    ));
    assert!(store.get_all::<Draft>().unwrap().is_empty());

    store.put_many(&[Draft { id: Some(4) }]).unwrap();
    assert_eq!(store.get_all::<Draft>().unwrap().len(), 1);
  }
}
