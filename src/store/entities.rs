//! Store implementations for the domain types.

use crate::models::{PendingReview, Restaurant, RestaurantsLoaded, Review, ReviewsLoaded};

use super::traits::{Collection, Entity};

impl Entity for Restaurant {
  const COLLECTION: Collection = Collection::Restaurants;

  fn key(&self) -> Option<i64> {
    Some(self.id)
  }
}

impl Entity for Review {
  const COLLECTION: Collection = Collection::Reviews;

  fn key(&self) -> Option<i64> {
    Some(self.id)
  }

  fn index_value(&self) -> Option<i64> {
    Some(self.restaurant_id)
  }
}

impl Entity for PendingReview {
  const COLLECTION: Collection = Collection::PendingReviews;

  fn key(&self) -> Option<i64> {
    self.slot
  }

  fn set_key(&mut self, key: i64) {
    self.slot = Some(key);
  }
}

impl Entity for RestaurantsLoaded {
  const COLLECTION: Collection = Collection::LoadedRestaurants;

  fn key(&self) -> Option<i64> {
    Some(RestaurantsLoaded::KEY)
  }
}

impl Entity for ReviewsLoaded {
  const COLLECTION: Collection = Collection::LoadedReviews;

  fn key(&self) -> Option<i64> {
    Some(self.restaurant_id)
  }
}
