//! Core traits for the local store.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreResult;

/// The named collections of the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Restaurants,
  Reviews,
  PendingReviews,
  /// Marker that the restaurant list was fetched in full
  LoadedRestaurants,
  /// Per-restaurant markers that its reviews were fetched in full
  LoadedReviews,
}

impl Collection {
  /// Name the collection is stored under
  pub fn name(self) -> &'static str {
    match self {
      Self::Restaurants => "restaurants",
      Self::Reviews => "reviews",
      Self::PendingReviews => "pending-reviews",
      Self::LoadedRestaurants => "loaded-restaurants",
      Self::LoadedReviews => "loaded-reviews",
    }
  }

  /// The secondary index this collection declares, if any.
  pub fn index(self) -> Option<&'static str> {
    match self {
      Self::Reviews => Some("restaurant_id"),
      _ => None,
    }
  }

  /// Whether the store assigns keys on insert.
  pub fn auto_increment(self) -> bool {
    matches!(self, Self::PendingReviews)
  }
}

/// Trait for values that live in one of the store's collections.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Collection this entity type belongs to
  const COLLECTION: Collection;

  /// Primary key. `None` asks an auto-increment collection for a new one.
  fn key(&self) -> Option<i64>;

  /// Value of the collection's secondary index for this entity.
  fn index_value(&self) -> Option<i64> {
    None
  }

  /// Attach the key a record was stored under after it is read back.
  fn set_key(&mut self, _key: i64) {}
}

/// Trait for local store backends.
///
/// Single-record operations are atomic and so is `put_many`: either every
/// record is written or none is. Records come back in ascending key order.
pub trait LocalStore: Send + Sync {
  /// Every record in the entity's collection.
  fn get_all<T: Entity>(&self) -> StoreResult<Vec<T>>;

  /// A single record by primary key.
  fn get_by_key<T: Entity>(&self, key: i64) -> StoreResult<Option<T>>;

  /// Records whose secondary index `field` equals `value`.
  fn get_by_index<T: Entity>(&self, field: &str, value: i64) -> StoreResult<Vec<T>>;

  /// Insert or replace a record, returning the key it is stored under.
  fn put<T: Entity>(&self, entity: &T) -> StoreResult<i64>;

  /// Insert or replace several records.
  fn put_many<T: Entity>(&self, entities: &[T]) -> StoreResult<Vec<i64>>;

  /// Remove a record; removing a missing key is not an error.
  fn delete<T: Entity>(&self, key: i64) -> StoreResult<()>;

  /// Remove every record of the collection.
  fn clear<T: Entity>(&self) -> StoreResult<()>;
}
