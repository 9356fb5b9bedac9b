use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::GatewayError;
use crate::models::{NewReview, Restaurant, Review};

use super::api_types::{GraphqlRequest, GraphqlResponse};
use super::queries;
use super::RemoteGateway;

/// GraphQL API client wrapper
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  endpoint: Url,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let endpoint = config.endpoint()?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, endpoint })
  }

  /// Send one operation and decode the payload stored under `operation`.
  async fn request<T: DeserializeOwned>(
    &self,
    operation: &str,
    query: &str,
    variables: Value,
  ) -> Result<T, GatewayError> {
    debug!(operation, endpoint = %self.endpoint, "sending graphql request");

    let response = self
      .http
      .post(self.endpoint.clone())
      .json(&GraphqlRequest { query, variables })
      .send()
      .await?;

    let status = response.status();
    let body = response.bytes().await?;

    let envelope: GraphqlResponse = match serde_json::from_slice(&body) {
      Ok(envelope) => envelope,
      Err(_) if !status.is_success() => return Err(GatewayError::Status(status.as_u16())),
      Err(e) => return Err(GatewayError::Malformed(e.to_string())),
    };

    // Error payloads carry a better message than the bare status
    if !status.is_success() && envelope.errors.is_none() && envelope.error.is_none() {
      return Err(GatewayError::Status(status.as_u16()));
    }

    envelope.into_operation(operation)
  }
}

impl RemoteGateway for ApiClient {
  async fn fetch_all_restaurants(&self) -> Result<Vec<Restaurant>, GatewayError> {
    self
      .request("getAllRestaurants", queries::GET_ALL_RESTAURANTS, json!({}))
      .await
  }

  async fn fetch_restaurant(&self, id: i64) -> Result<Option<Restaurant>, GatewayError> {
    self
      .request("getRestaurant", queries::GET_RESTAURANT, json!({ "id": id }))
      .await
  }

  async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, GatewayError> {
    self
      .request(
        "getReviews",
        queries::GET_REVIEWS,
        json!({ "restaurant_id": restaurant_id }),
      )
      .await
  }

  async fn submit_review(&self, review: &NewReview) -> Result<Review, GatewayError> {
    let variables =
      serde_json::to_value(review).map_err(|e| GatewayError::Malformed(e.to_string()))?;

    // createReview is nullable in the schema
    let created: Option<Review> = self
      .request("createReview", queries::CREATE_REVIEW, variables)
      .await?;
    created.ok_or_else(|| GatewayError::Malformed("createReview returned null".to_string()))
  }

  async fn submit_reviews(&self, reviews: &[NewReview]) -> Result<Vec<Review>, GatewayError> {
    let created: Vec<Review> = self
      .request(
        "createReviews",
        queries::CREATE_REVIEWS,
        json!({ "reviews": reviews }),
      )
      .await?;

    if created.len() != reviews.len() {
      return Err(GatewayError::Malformed(format!(
        "createReviews returned {} reviews for a batch of {}",
        created.len(),
        reviews.len()
      )));
    }
    Ok(created)
  }

  async fn set_favorite(&self, id: i64, is_favorite: bool) -> Result<Restaurant, GatewayError> {
    let updated: Option<Restaurant> = self
      .request(
        "setFavorite",
        queries::SET_FAVORITE,
        json!({ "id": id, "is_favorite": is_favorite }),
      )
      .await?;
    updated.ok_or_else(|| GatewayError::Malformed(format!("setFavorite({}) returned null", id)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::{TcpListener, TcpStream};
  use tokio::task::JoinHandle;

  /// Answer a single HTTP request with a canned response; resolves to the
  /// request body.
  async fn serve_once(status: &'static str, body: &'static str) -> (ApiClient, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let request = read_body(&mut socket).await;
      let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      socket.shutdown().await.unwrap();
      request
    });

    let config = ApiConfig {
      url: format!("http://{}/graphql", addr),
      timeout_secs: 5,
    };
    (ApiClient::new(&config).unwrap(), handle)
  }

  async fn read_body(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
      let n = socket.read(&mut chunk).await.unwrap();
      if n == 0 {
        return String::new();
      }
      buf.extend_from_slice(&chunk[..n]);

      let text = String::from_utf8_lossy(&buf).to_string();
      if let Some(end) = text.find("\r\n\r\n") {
        let length = text[..end]
          .lines()
          .find_map(|line| {
            let line = line.to_ascii_lowercase();
            line
              .strip_prefix("content-length:")
              .map(|v| v.trim().parse::<usize>().unwrap())
          })
          .unwrap_or(0);
        if buf.len() >= end + 4 + length {
          return text[end + 4..].to_string();
        }
      }
    }
  }

  #[tokio::test]
  async fn test_fetch_restaurant_sends_variables() {
    let (client, server) = serve_once(
      "200 OK",
      r#"{"data":{"getRestaurant":{"id":3,"name":"Kang Ho Dong Baekjeong","is_favorite":true}}}"#,
    )
    .await;

    let restaurant = client.fetch_restaurant(3).await.unwrap().unwrap();
    assert_eq!(restaurant.name, "Kang Ho Dong Baekjeong");
    assert!(restaurant.is_favorite);

    let body: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(body["variables"], json!({ "id": 3 }));
    assert!(body["query"].as_str().unwrap().contains("getRestaurant"));
  }

  #[tokio::test]
  async fn test_null_restaurant_is_none() {
    let (client, _server) = serve_once("200 OK", r#"{"data":{"getRestaurant":null}}"#).await;
    assert_eq!(client.fetch_restaurant(99).await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_error_status_without_payload() {
    let (client, _server) = serve_once("502 Bad Gateway", "upstream down").await;
    let result = client.fetch_all_restaurants().await;
    assert!(matches!(result, Err(GatewayError::Status(502))));
  }

  #[tokio::test]
  async fn test_graphql_errors_fail_the_call() {
    let (client, _server) = serve_once(
      "200 OK",
      r#"{"data":null,"errors":[{"message":"restaurant_id is required"}]}"#,
    )
    .await;
    let result = client.submit_review(&NewReview {
      restaurant_id: 1,
      name: "Ana".to_string(),
      rating: 5,
      comments: "Lovely".to_string(),
    })
    .await;
    assert!(matches!(result, Err(GatewayError::Graphql(ref m)) if m == "restaurant_id is required"));
  }

  #[tokio::test]
  async fn test_short_batch_is_malformed() {
    let (client, server) = serve_once(
      "200 OK",
      r#"{"data":{"createReviews":[{"id":10,"restaurant_id":1,"name":"Ana","rating":5,"comments":"Lovely"}]}}"#,
    )
    .await;
    let batch = vec![
      NewReview {
        restaurant_id: 1,
        name: "Ana".to_string(),
        rating: 5,
        comments: "Lovely".to_string(),
      },
      NewReview {
        restaurant_id: 2,
        name: "Bo".to_string(),
        rating: 3,
        comments: "Fine".to_string(),
      },
    ];

    let result = client.submit_reviews(&batch).await;
    assert!(matches!(result, Err(GatewayError::Malformed(_))));

    let body: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(body["variables"]["reviews"].as_array().unwrap().len(), 2);
    assert_eq!(body["variables"]["reviews"][1]["name"], "Bo");
  }

  #[tokio::test]
  async fn test_unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ApiConfig {
      url: format!("http://{}/graphql", addr),
      timeout_secs: 5,
    };
    let client = ApiClient::new(&config).unwrap();
    let result = client.fetch_reviews(1).await;
    assert!(matches!(result, Err(GatewayError::Transport(_))));
  }
}
