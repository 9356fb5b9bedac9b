//! Serde types for the GraphQL request/response envelope.
//!
//! Payload types are the domain types themselves; only the envelope lives
//! here.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayError;

/// Body of every request: an operation document plus its variables
#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a> {
  pub query: &'a str,
  pub variables: Value,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
  #[serde(default)]
  pub message: String,
}

/// Response envelope. Data is keyed by operation name.
#[derive(Debug, Default, Deserialize)]
pub struct GraphqlResponse {
  #[serde(default)]
  pub data: Option<Map<String, Value>>,
  #[serde(default)]
  pub errors: Option<Vec<ApiError>>,
  /// Some servers report a single `error` value instead of `errors`
  #[serde(default)]
  pub error: Option<Value>,
}

impl GraphqlResponse {
  /// Pull the payload of `operation` out of the envelope.
  ///
  /// Error payloads, a missing `data` object and a missing operation key are
  /// all failures. An explicit `null` is handed to `T`, so `Option<T>` can
  /// model "not found".
  pub fn into_operation<T: DeserializeOwned>(self, operation: &str) -> Result<T, GatewayError> {
    if let Some(errors) = self.errors.filter(|errors| !errors.is_empty()) {
      let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
      return Err(GatewayError::Graphql(messages.join("; ")));
    }
    if let Some(error) = self.error.filter(|error| !error.is_null()) {
      return Err(GatewayError::Graphql(error.to_string()));
    }

    let mut data = self
      .data
      .ok_or_else(|| GatewayError::Malformed("response has no data".to_string()))?;
    let payload = data
      .remove(operation)
      .ok_or_else(|| GatewayError::Malformed(format!("response has no {} field", operation)))?;

    serde_json::from_value(payload)
      .map_err(|e| GatewayError::Malformed(format!("could not parse {}: {}", operation, e)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Restaurant, Review};
  use serde_json::json;

  fn envelope(value: Value) -> GraphqlResponse {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_extracts_operation_payload() {
    let response = envelope(json!({
      "data": { "getReviews": [
        { "id": 1, "restaurant_id": 4, "name": "Ana", "rating": 5, "comments": "Yum" }
      ]}
    }));

    let reviews: Vec<Review> = response.into_operation("getReviews").unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].restaurant_id, 4);
  }

  #[test]
  fn test_null_payload_is_none() {
    let response = envelope(json!({ "data": { "getRestaurant": null } }));
    let restaurant: Option<Restaurant> = response.into_operation("getRestaurant").unwrap();
    assert!(restaurant.is_none());
  }

  #[test]
  fn test_errors_array_fails() {
    let response = envelope(json!({
      "data": null,
      "errors": [{ "message": "boom" }, { "message": "again" }]
    }));
    let result: Result<Vec<Review>, _> = response.into_operation("getReviews");
    assert!(matches!(result, Err(GatewayError::Graphql(msg)) if msg == "boom; again"));
  }

  #[test]
  fn test_legacy_error_field_fails() {
    let response = envelope(json!({ "error": "bad request" }));
    let result: Result<Vec<Review>, _> = response.into_operation("getReviews");
    assert!(matches!(result, Err(GatewayError::Graphql(_))));
  }

  #[test]
  fn test_missing_operation_is_malformed() {
    let response = envelope(json!({ "data": { "somethingElse": [] } }));
    let result: Result<Vec<Review>, _> = response.into_operation("getReviews");
    assert!(matches!(result, Err(GatewayError::Malformed(_))));
  }

  #[test]
  fn test_wrong_shape_is_malformed() {
    let response = envelope(json!({ "data": { "getReviews": { "id": 1 } } }));
    let result: Result<Vec<Review>, _> = response.into_operation("getReviews");
    assert!(matches!(result, Err(GatewayError::Malformed(_))));
  }
}
