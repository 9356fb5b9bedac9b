//! Network side of the client: typed operations against the GraphQL API.

mod api_types;
mod client;
mod queries;

pub use client::ApiClient;

use std::future::Future;

use crate::error::GatewayError;
use crate::models::{NewReview, Restaurant, Review};

/// Typed read/write operations against the remote API.
///
/// Any error means the operation must be assumed not to have happened.
pub trait RemoteGateway: Send + Sync + 'static {
  fn fetch_all_restaurants(
    &self,
  ) -> impl Future<Output = Result<Vec<Restaurant>, GatewayError>> + Send;

  /// `Ok(None)` when the server knows no restaurant with this id.
  fn fetch_restaurant(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Restaurant>, GatewayError>> + Send;

  fn fetch_reviews(
    &self,
    restaurant_id: i64,
  ) -> impl Future<Output = Result<Vec<Review>, GatewayError>> + Send;

  /// Create one review; the server assigns its id.
  fn submit_review(
    &self,
    review: &NewReview,
  ) -> impl Future<Output = Result<Review, GatewayError>> + Send;

  /// Create several reviews in one request.
  ///
  /// The result is in request order. Any failure fails the whole batch.
  fn submit_reviews(
    &self,
    reviews: &[NewReview],
  ) -> impl Future<Output = Result<Vec<Review>, GatewayError>> + Send;

  fn set_favorite(
    &self,
    id: i64,
    is_favorite: bool,
  ) -> impl Future<Output = Result<Restaurant, GatewayError>> + Send;
}
