//! Durable local mirror of restaurants, reviews and queued reviews.
//!
//! The store knows nothing about the network. It exposes three collections:
//! - `restaurants` keyed by restaurant id
//! - `reviews` keyed by review id, indexed by `restaurant_id`
//! - `pending-reviews` keyed by a local auto-incrementing slot

mod entities;
mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Entity, LocalStore};
