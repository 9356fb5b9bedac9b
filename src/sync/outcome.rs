//! Result types returned by the sync layer.

use crate::models::{PendingReview, Review};

/// Data returned by a read, with where it came from.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: FetchSource,
}

impl<T> Fetched<T> {
  /// Data served from the local store.
  pub fn from_store(data: T) -> Self {
    Self {
      data,
      source: FetchSource::Store,
    }
  }

  /// Data fetched from the network and now mirrored locally.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: FetchSource::Network,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
    Fetched {
      data: f(self.data),
      source: self.source,
    }
  }
}

/// Indicates where read data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
  /// Served from the local store without touching the network
  Store,
  /// Local store was empty, data came from the remote API
  Network,
}

/// What happened to a submitted review.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
  /// The server accepted it and assigned an id
  Confirmed(Review),
  /// The server could not be reached; it waits in the pending queue
  Queued(PendingReview),
}

/// Result of draining the pending queue.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
  /// Nothing was waiting
  Idle,
  /// Every queued review was accepted
  Flushed(Vec<Review>),
  /// The batch could not be sent; the queue is untouched
  Deferred { pending: usize, reason: String },
}
