//! Builders and an in-process gateway shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::error::GatewayError;
use crate::models::{NewReview, Restaurant, Review};
use crate::remote::RemoteGateway;

pub fn restaurant(id: i64, name: &str) -> Restaurant {
  Restaurant {
    id,
    name: name.to_string(),
    address: format!("{} Main St", id),
    cuisine_type: "Asian".to_string(),
    neighborhood: "Manhattan".to_string(),
    latlng: None,
    operating_hours: BTreeMap::new(),
    is_favorite: false,
    photograph: Some(id.to_string()),
    created_at: None,
    updated_at: None,
  }
}

pub fn review(id: i64, restaurant_id: i64) -> Review {
  Review {
    id,
    restaurant_id,
    name: format!("Reviewer {}", id),
    rating: 4,
    comments: "Good food".to_string(),
    created_at: None,
    updated_at: None,
  }
}

pub fn new_review(restaurant_id: i64, name: &str) -> NewReview {
  NewReview {
    restaurant_id,
    name: name.to_string(),
    rating: 5,
    comments: format!("{} liked it", name),
  }
}

/// Lets a test park `submit_reviews` while the batch is in flight.
#[derive(Default)]
pub struct BatchGate {
  /// Signalled once the batch has reached the gateway
  pub entered: Notify,
  /// Lets the parked batch complete
  pub release: Notify,
}

/// Gateway backed by in-memory data that can be switched offline.
///
/// While offline every call fails with a 503 after being recorded.
pub struct FakeGateway {
  online: AtomicBool,
  next_id: AtomicI64,
  restaurants: Mutex<Vec<Restaurant>>,
  reviews: Mutex<Vec<Review>>,
  calls: Mutex<Vec<&'static str>>,
  batches: Mutex<Vec<Vec<NewReview>>>,
  gate: Mutex<Option<Arc<BatchGate>>>,
}

impl FakeGateway {
  fn with_state(online: bool) -> Self {
    Self {
      online: AtomicBool::new(online),
      next_id: AtomicI64::new(100),
      restaurants: Mutex::new(Vec::new()),
      reviews: Mutex::new(Vec::new()),
      calls: Mutex::new(Vec::new()),
      batches: Mutex::new(Vec::new()),
      gate: Mutex::new(None),
    }
  }

  pub fn online() -> Self {
    Self::with_state(true)
  }

  pub fn offline() -> Self {
    Self::with_state(false)
  }

  pub fn with_restaurants(self, restaurants: Vec<Restaurant>) -> Self {
    *self.restaurants.lock().unwrap() = restaurants;
    self
  }

  pub fn with_reviews(self, reviews: Vec<Review>) -> Self {
    *self.reviews.lock().unwrap() = reviews;
    self
  }

  /// Park the next accepted `submit_reviews` call until the gate is released.
  pub fn hold_next_batch(&self) -> Arc<BatchGate> {
    let gate = Arc::new(BatchGate::default());
    *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
    gate
  }

  pub fn set_online(&self, online: bool) {
    self.online.store(online, Ordering::SeqCst);
  }

  /// Names of the gateway methods called so far, in order.
  pub fn calls(&self) -> Vec<&'static str> {
    self.calls.lock().unwrap().clone()
  }

  /// Every batch passed to `submit_reviews`, including failed ones.
  pub fn batches(&self) -> Vec<Vec<NewReview>> {
    self.batches.lock().unwrap().clone()
  }

  /// Server-side copy of a restaurant.
  pub fn restaurant(&self, id: i64) -> Option<Restaurant> {
    self
      .restaurants
      .lock()
      .unwrap()
      .iter()
      .find(|r| r.id == id)
      .cloned()
  }

  fn enter(&self, call: &'static str) -> Result<(), GatewayError> {
    self.calls.lock().unwrap().push(call);
    if self.online.load(Ordering::SeqCst) {
      Ok(())
    } else {
      Err(GatewayError::Status(503))
    }
  }

  fn create(&self, review: &NewReview) -> Review {
    let created = Review {
      id: self.next_id.fetch_add(1, Ordering::SeqCst),
      restaurant_id: review.restaurant_id,
      name: review.name.clone(),
      rating: review.rating,
      comments: review.comments.clone(),
      created_at: None,
      updated_at: None,
    };
    self.reviews.lock().unwrap().push(created.clone());
    created
  }
}

impl RemoteGateway for FakeGateway {
  async fn fetch_all_restaurants(&self) -> Result<Vec<Restaurant>, GatewayError> {
    self.enter("fetch_all_restaurants")?;
    Ok(self.restaurants.lock().unwrap().clone())
  }

  async fn fetch_restaurant(&self, id: i64) -> Result<Option<Restaurant>, GatewayError> {
    self.enter("fetch_restaurant")?;
    Ok(self.restaurant(id))
  }

  async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, GatewayError> {
    self.enter("fetch_reviews")?;
    Ok(
      self
        .reviews
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.restaurant_id == restaurant_id)
        .cloned()
        .collect(),
    )
  }

  async fn submit_review(&self, review: &NewReview) -> Result<Review, GatewayError> {
    self.enter("submit_review")?;
    Ok(self.create(review))
  }

  async fn submit_reviews(&self, reviews: &[NewReview]) -> Result<Vec<Review>, GatewayError> {
    self.batches.lock().unwrap().push(reviews.to_vec());
    self.enter("submit_reviews")?;

    let gate = self.gate.lock().unwrap().take();
    if let Some(gate) = gate {
      gate.entered.notify_one();
      gate.release.notified().await;
    }
    Ok(reviews.iter().map(|r| self.create(r)).collect())
  }

  async fn set_favorite(&self, id: i64, is_favorite: bool) -> Result<Restaurant, GatewayError> {
    self.enter("set_favorite")?;
    let mut restaurants = self.restaurants.lock().unwrap();
    let restaurant = restaurants
      .iter_mut()
      .find(|r| r.id == id)
      .ok_or_else(|| GatewayError::Malformed(format!("no restaurant {}", id)))?;
    restaurant.is_favorite = is_favorite;
    Ok(restaurant.clone())
  }
}
