//! Plain-text formatting for command output.

use crate::models::{ListedReview, PendingReview, Restaurant};
use crate::notify::Notification;

const WEEKDAYS: [&str; 7] = [
  "Monday",
  "Tuesday",
  "Wednesday",
  "Thursday",
  "Friday",
  "Saturday",
  "Sunday",
];

const MAX_RATING: i32 = 5;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Rating as filled and empty stars, clamped to 0..=5
pub fn stars(rating: i32) -> String {
  let filled = rating.clamp(0, MAX_RATING) as usize;
  let empty = MAX_RATING as usize - filled;
  format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

pub fn restaurant_line(restaurant: &Restaurant) -> String {
  let favorite = if restaurant.is_favorite { "♥" } else { " " };
  format!(
    "{:>4} {} {:<32} {} / {}",
    restaurant.id,
    favorite,
    truncate(&restaurant.name, 32),
    restaurant.cuisine_type,
    restaurant.neighborhood
  )
}

pub fn restaurant_detail(restaurant: &Restaurant) -> String {
  let mut lines = vec![restaurant_line(restaurant), format!("     {}", restaurant.address)];
  if let Some(latlng) = restaurant.latlng {
    lines.push(format!("     ({:.6}, {:.6})", latlng.lat, latlng.lng));
  }
  for (day, hours) in hours_by_weekday(restaurant) {
    lines.push(format!("     {:<10} {}", day, hours));
  }
  lines.join("\n")
}

/// Opening hours Monday first; unrecognised day names go last.
fn hours_by_weekday(restaurant: &Restaurant) -> Vec<(&str, &str)> {
  let hours = &restaurant.operating_hours;
  let known = WEEKDAYS
    .iter()
    .filter_map(|day| hours.get(*day).map(|h| (*day, h.as_str())));
  let other = hours
    .iter()
    .filter(|(day, _)| !WEEKDAYS.contains(&day.as_str()))
    .map(|(day, h)| (day.as_str(), h.as_str()));
  known.chain(other).collect()
}

pub fn review_line(review: &ListedReview) -> String {
  let marker = if review.is_pending() {
    "[pending]".to_string()
  } else {
    review
      .id()
      .map(|id| format!("#{}", id))
      .unwrap_or_default()
  };
  format!(
    "{:<9} {} {}: {}",
    marker,
    stars(review.rating()),
    review.author(),
    truncate(review.comments(), 80)
  )
}

pub fn pending_line(pending: &PendingReview) -> String {
  format!(
    "{:>4}  restaurant {}  {} {}",
    pending
      .slot
      .map(|slot| slot.to_string())
      .unwrap_or_default(),
    pending.review.restaurant_id,
    stars(pending.review.rating),
    pending.review.name
  )
}

pub fn notification_line(notification: &Notification) -> String {
  format!("[{}] {}", notification.severity.label(), notification.message)
}
