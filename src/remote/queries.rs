//! GraphQL operation documents.

pub const GET_ALL_RESTAURANTS: &str = r#"
query {
  getAllRestaurants {
    id
    name
    address
    cuisine_type
    neighborhood
    is_favorite
    photograph
    latlng { lat lng }
    operating_hours { Monday Tuesday Wednesday Thursday Friday Saturday Sunday }
    createdAt
    updatedAt
  }
}
"#;

pub const GET_RESTAURANT: &str = r#"
query($id: Int!) {
  getRestaurant(id: $id) {
    id
    name
    address
    cuisine_type
    neighborhood
    is_favorite
    photograph
    latlng { lat lng }
    operating_hours { Monday Tuesday Wednesday Thursday Friday Saturday Sunday }
    createdAt
    updatedAt
  }
}
"#;

pub const GET_REVIEWS: &str = r#"
query($restaurant_id: Int!) {
  getReviews(restaurant_id: $restaurant_id) {
    id
    name
    rating
    comments
    createdAt
    updatedAt
    restaurant_id
  }
}
"#;

pub const CREATE_REVIEW: &str = r#"
mutation($name: String!, $restaurant_id: Int!, $rating: Int!, $comments: String!) {
  createReview(name: $name, restaurant_id: $restaurant_id, rating: $rating, comments: $comments) {
    id
    name
    rating
    comments
    restaurant_id
    createdAt
    updatedAt
  }
}
"#;

pub const CREATE_REVIEWS: &str = r#"
mutation($reviews: [ReviewInput!]!) {
  createReviews(reviews: $reviews) {
    id
    name
    rating
    comments
    restaurant_id
    createdAt
    updatedAt
  }
}
"#;

pub const SET_FAVORITE: &str = r#"
mutation($id: Int!, $is_favorite: Boolean!) {
  setFavorite(id: $id, is_favorite: $is_favorite) {
    id
    name
    is_favorite
  }
}
"#;
