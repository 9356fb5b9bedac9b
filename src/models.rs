//! Domain types for restaurants and reviews.
//!
//! The same shapes are used on the wire and in the local store. Timestamps
//! travel as epoch milliseconds, which is how the API serializes its `Date`
//! scalar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::SyncError;

/// Geographic position of a restaurant
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
  #[serde(default, deserialize_with = "null_as_default")]
  pub lat: f64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub lng: f64,
}

/// A restaurant as listed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
  pub id: i64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub address: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub cuisine_type: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub neighborhood: String,
  #[serde(default)]
  pub latlng: Option<LatLng>,
  /// Weekday name to opening hours, days without hours are omitted
  #[serde(default, deserialize_with = "hours_without_gaps")]
  pub operating_hours: BTreeMap<String, String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub is_favorite: bool,
  #[serde(default)]
  pub photograph: Option<String>,
  #[serde(
    rename = "createdAt",
    default,
    with = "chrono::serde::ts_milliseconds_option"
  )]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(
    rename = "updatedAt",
    default,
    with = "chrono::serde::ts_milliseconds_option"
  )]
  pub updated_at: Option<DateTime<Utc>>,
}

/// A review confirmed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  /// Server-assigned identity
  pub id: i64,
  pub restaurant_id: i64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub rating: i32,
  #[serde(default, deserialize_with = "null_as_default")]
  pub comments: String,
  #[serde(
    rename = "createdAt",
    default,
    with = "chrono::serde::ts_milliseconds_option"
  )]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(
    rename = "updatedAt",
    default,
    with = "chrono::serde::ts_milliseconds_option"
  )]
  pub updated_at: Option<DateTime<Utc>>,
}

/// A review written by the user that has no server identity yet.
///
/// This is exactly the `ReviewInput` payload the API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
  pub restaurant_id: i64,
  pub name: String,
  pub rating: i32,
  pub comments: String,
}

impl NewReview {
  /// Check the fields a review form requires before anything is submitted.
  pub fn validate(&self) -> Result<(), SyncError> {
    if self.name.trim().is_empty() {
      return Err(SyncError::Validation("a reviewer name is required"));
    }
    if !(1..=5).contains(&self.rating) {
      return Err(SyncError::Validation("a rating from 1 to 5 is required"));
    }
    if self.comments.trim().is_empty() {
      return Err(SyncError::Validation("comments are required"));
    }
    Ok(())
  }
}

/// A review waiting in the local queue for the next flush
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingReview {
  /// Local queue slot, assigned by the store on insert
  #[serde(skip)]
  pub slot: Option<i64>,
  #[serde(flatten)]
  pub review: NewReview,
}

impl PendingReview {
  pub fn new(review: NewReview) -> Self {
    Self { slot: None, review }
  }
}

/// One entry of the review list shown for a restaurant
#[derive(Debug, Clone, PartialEq)]
pub enum ListedReview {
  Confirmed(Review),
  Pending(PendingReview),
}

impl ListedReview {
  /// Server id, absent while the review is still queued
  pub fn id(&self) -> Option<i64> {
    match self {
      Self::Confirmed(review) => Some(review.id),
      Self::Pending(_) => None,
    }
  }

  pub fn author(&self) -> &str {
    match self {
      Self::Confirmed(review) => &review.name,
      Self::Pending(pending) => &pending.review.name,
    }
  }

  pub fn rating(&self) -> i32 {
    match self {
      Self::Confirmed(review) => review.rating,
      Self::Pending(pending) => pending.review.rating,
    }
  }

  pub fn comments(&self) -> &str {
    match self {
      Self::Confirmed(review) => &review.comments,
      Self::Pending(pending) => &pending.review.comments,
    }
  }

  pub fn is_pending(&self) -> bool {
    matches!(self, Self::Pending(_))
  }
}

/// Marks the local restaurant list as a full copy of the server's
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantsLoaded {
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub loaded_at: DateTime<Utc>,
}

impl RestaurantsLoaded {
  /// The list has a single marker record
  pub const KEY: i64 = 0;

  pub fn now() -> Self {
    Self {
      loaded_at: Utc::now(),
    }
  }
}

/// Marks the local reviews of one restaurant as a full copy of the server's
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewsLoaded {
  pub restaurant_id: i64,
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub loaded_at: DateTime<Utc>,
}

impl ReviewsLoaded {
  pub fn now(restaurant_id: i64) -> Self {
    Self {
      restaurant_id,
      loaded_at: Utc::now(),
    }
  }
}

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn hours_without_gaps<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
  D: Deserializer<'de>,
{
  let hours: Option<BTreeMap<String, Option<String>>> = Option::deserialize(deserializer)?;
  Ok(
    hours
      .unwrap_or_default()
      .into_iter()
      .filter_map(|(day, value)| value.map(|v| (day, v)))
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_restaurant_from_api_payload() {
    let restaurant: Restaurant = serde_json::from_value(json!({
      "id": 3,
      "name": "Kang Ho Dong Baekjeong",
      "address": "1 E 32nd St, New York, NY 10016",
      "cuisine_type": "Asian",
      "neighborhood": "Manhattan",
      "is_favorite": null,
      "photograph": "3.jpg",
      "latlng": { "lat": 40.747143, "lng": -73.985414 },
      "operating_hours": { "Monday": "11:30 am - 2:00 am", "Sunday": null },
      "createdAt": 1504095563444i64,
      "updatedAt": null
    }))
    .unwrap();

    assert_eq!(restaurant.id, 3);
    assert!(!restaurant.is_favorite);
    assert_eq!(restaurant.operating_hours.len(), 1);
    assert_eq!(
      restaurant.created_at.map(|t| t.timestamp_millis()),
      Some(1504095563444)
    );
    assert_eq!(restaurant.updated_at, None);
  }

  #[test]
  fn test_partial_restaurant_uses_defaults() {
    // setFavorite only selects a few fields
    let restaurant: Restaurant =
      serde_json::from_value(json!({ "id": 1, "name": "Mission Chinese Food", "is_favorite": true }))
        .unwrap();

    assert!(restaurant.is_favorite);
    assert!(restaurant.address.is_empty());
    assert!(restaurant.latlng.is_none());
  }

  #[test]
  fn test_review_timestamps_roundtrip_as_millis() {
    let review: Review = serde_json::from_value(json!({
      "id": 7,
      "restaurant_id": 2,
      "name": "Steve",
      "rating": 4,
      "comments": "Great pizza",
      "createdAt": 1504095567183i64,
      "updatedAt": 1504095567183i64
    }))
    .unwrap();

    let value = serde_json::to_value(&review).unwrap();
    assert_eq!(value["createdAt"], json!(1504095567183i64));
  }

  #[test]
  fn test_pending_review_serializes_as_review_input() {
    let pending = PendingReview {
      slot: Some(4),
      review: NewReview {
        restaurant_id: 2,
        name: "Ana".to_string(),
        rating: 5,
        comments: "Lovely".to_string(),
      },
    };

    let value = serde_json::to_value(&pending).unwrap();
    assert_eq!(
      value,
      json!({ "restaurant_id": 2, "name": "Ana", "rating": 5, "comments": "Lovely" })
    );
  }

  #[test]
  fn test_validate_required_fields() {
    let mut review = NewReview {
      restaurant_id: 1,
      name: "  ".to_string(),
      rating: 3,
      comments: "ok".to_string(),
    };
    assert!(matches!(review.validate(), Err(SyncError::Validation(_))));

    review.name = "Lee".to_string();
    review.comments = String::new();
    assert!(matches!(review.validate(), Err(SyncError::Validation(_))));

    review.comments = "ok".to_string();
    assert!(review.validate().is_ok());

    review.rating = 0;
    assert!(matches!(review.validate(), Err(SyncError::Validation(_))));
  }

  #[test]
  fn test_listed_review_pending_has_no_id() {
    let pending = ListedReview::Pending(PendingReview::new(NewReview {
      restaurant_id: 1,
      name: "Lee".to_string(),
      rating: 2,
      comments: "meh".to_string(),
    }));
    assert_eq!(pending.id(), None);
    assert!(pending.is_pending());
    assert_eq!(pending.author(), "Lee");
  }
}
