//! Local-first cache that sits between the UI, the local store and the API.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, SyncError};
use crate::models::{
  ListedReview, NewReview, PendingReview, Restaurant, RestaurantsLoaded, Review, ReviewsLoaded,
};
use crate::remote::RemoteGateway;
use crate::store::{Entity, LocalStore};

use super::outcome::{Fetched, FlushOutcome, Submission};

/// Filter value that matches every restaurant.
pub const MATCH_ALL: &str = "all";

const RESTAURANT_INDEX: &str = "restaurant_id";

/// Cache that serves reads from the local store and queues failed writes.
///
/// Lists fetched in full are the source of truth: reads never revalidate
/// against the network once a complete copy is cached.
pub struct SyncCache<S: LocalStore, G: RemoteGateway> {
  store: Arc<S>,
  gateway: Arc<G>,
  /// Held while the pending queue is drained
  flush_lock: Arc<Mutex<()>>,
}

impl<S: LocalStore, G: RemoteGateway> SyncCache<S, G> {
  /// Create a new cache over the given store and gateway.
  pub fn new(store: S, gateway: G) -> Self {
    Self::from_shared(Arc::new(store), Arc::new(gateway))
  }

  /// Create a cache over a store and gateway that are also used elsewhere.
  pub fn from_shared(store: Arc<S>, gateway: Arc<G>) -> Self {
    Self {
      store,
      gateway,
      flush_lock: Arc::new(Mutex::new(())),
    }
  }

  /// Read-through fetch of a list.
  ///
  /// 1. A complete local copy (one with a marker) is returned as is
  /// 2. Otherwise fetch from the network
  /// 3. Mirror the network result locally, then write the marker
  ///
  /// Records stored one at a time never make a list complete. If the network
  /// fails, whatever is cached locally is still better than nothing.
  async fn read_through<T, M, F, Fut>(
    &self,
    cached: Vec<T>,
    marker: M,
    fetcher: F,
  ) -> Result<Fetched<Vec<T>>, SyncError>
  where
    T: Entity,
    M: Entity,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, GatewayError>>,
  {
    let collection = T::COLLECTION.name();
    let complete = match marker.key() {
      Some(key) => self.store.get_by_key::<M>(key)?.is_some(),
      None => false,
    };
    if complete && !cached.is_empty() {
      debug!(collection, count = cached.len(), "serving from local store");
      return Ok(Fetched::from_store(cached));
    }

    debug!(collection, cached = cached.len(), "local copy incomplete, fetching from network");
    let data = match fetcher().await {
      Ok(data) => data,
      Err(err) if !cached.is_empty() => {
        warn!(collection, error = %err, "network fetch failed, serving partial local copy");
        return Ok(Fetched::from_store(cached));
      }
      Err(err) => return Err(err.into()),
    };

    if let Err(err) = self.store.put_many(&data).and_then(|_| self.store.put(&marker)) {
      warn!(collection, error = %err, "could not mirror network data locally");
    }
    Ok(Fetched::from_network(data))
  }

  /// All restaurants.
  pub async fn fetch_restaurants(&self) -> Result<Fetched<Vec<Restaurant>>, SyncError> {
    let cached = self.store.get_all::<Restaurant>()?;
    self
      .read_through(cached, RestaurantsLoaded::now(), || {
        self.gateway.fetch_all_restaurants()
      })
      .await
  }

  /// A single restaurant by id.
  pub async fn fetch_restaurant(&self, id: i64) -> Result<Fetched<Restaurant>, SyncError> {
    if let Some(restaurant) = self.store.get_by_key::<Restaurant>(id)? {
      debug!(id, "serving restaurant from local store");
      return Ok(Fetched::from_store(restaurant));
    }

    match self.gateway.fetch_restaurant(id).await? {
      Some(restaurant) => {
        if let Err(err) = self.store.put(&restaurant) {
          warn!(id, error = %err, "could not mirror restaurant locally");
        }
        Ok(Fetched::from_network(restaurant))
      }
      None => Err(SyncError::NotFound {
        entity: "restaurant",
        id,
      }),
    }
  }

  /// Reviews to show for a restaurant: confirmed ones first, then the ones
  /// still waiting in the pending queue.
  pub async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Fetched<Vec<ListedReview>>, SyncError> {
    let cached = self
      .store
      .get_by_index::<Review>(RESTAURANT_INDEX, restaurant_id)?;
    let confirmed = self
      .read_through(cached, ReviewsLoaded::now(restaurant_id), || {
        self.gateway.fetch_reviews(restaurant_id)
      })
      .await?;
    let pending = self.pending_for(restaurant_id)?;

    Ok(confirmed.map(|reviews| {
      reviews
        .into_iter()
        .map(ListedReview::Confirmed)
        .chain(pending.into_iter().map(ListedReview::Pending))
        .collect()
    }))
  }

  /// Every review waiting to be sent, oldest first.
  pub fn pending_reviews(&self) -> Result<Vec<PendingReview>, SyncError> {
    Ok(self.store.get_all::<PendingReview>()?)
  }

  fn pending_for(&self, restaurant_id: i64) -> Result<Vec<PendingReview>, SyncError> {
    // The pending collection has no index; it is expected to stay small
    let mut pending = self.pending_reviews()?;
    pending.retain(|p| p.review.restaurant_id == restaurant_id);
    Ok(pending)
  }

  /// Submit a review, queueing it locally when the server can't be reached.
  ///
  /// Either way the returned value can be shown right away.
  pub async fn submit_review(&self, review: NewReview) -> Result<Submission, SyncError> {
    match self.gateway.submit_review(&review).await {
      Ok(confirmed) => {
        info!(id = confirmed.id, restaurant_id = confirmed.restaurant_id, "review posted");
        if let Err(err) = self.store.put(&confirmed) {
          warn!(id = confirmed.id, error = %err, "could not mirror posted review locally");
        }
        Ok(Submission::Confirmed(confirmed))
      }
      Err(err) => {
        warn!(
          restaurant_id = review.restaurant_id,
          error = %err,
          "review submission failed, queueing it"
        );
        let mut pending = PendingReview::new(review);
        let slot = self.store.put(&pending)?;
        pending.slot = Some(slot);
        Ok(Submission::Queued(pending))
      }
    }
  }

  /// Flip a restaurant's favorite flag.
  ///
  /// The caller's value and the local store change immediately. The remote
  /// update runs in the background and is never rolled back; the returned
  /// handle resolves once it has finished.
  pub fn toggle_favorite(&self, restaurant: &mut Restaurant) -> JoinHandle<()> {
    restaurant.is_favorite = !restaurant.is_favorite;
    let (id, is_favorite) = (restaurant.id, restaurant.is_favorite);

    if let Err(err) = self.store.put(&*restaurant) {
      warn!(id, error = %err, "could not store favorite locally");
    }

    let gateway = Arc::clone(&self.gateway);
    tokio::spawn(async move {
      match gateway.set_favorite(id, is_favorite).await {
        Ok(_) => debug!(id, is_favorite, "favorite updated remotely"),
        Err(err) => warn!(id, is_favorite, error = %err, "remote favorite update failed"),
      }
    })
  }

  /// Send every queued review to the server in one batch.
  ///
  /// On success the confirmed reviews are stored and exactly the submitted
  /// queue entries are removed. On failure nothing changes and the queue is
  /// retried on the next call.
  pub async fn flush_pending(&self) -> FlushOutcome {
    let _flushing = self.flush_lock.lock().await;

    let pending = match self.pending_reviews() {
      Ok(pending) => pending,
      Err(err) => {
        warn!(error = %err, "could not read pending reviews");
        return FlushOutcome::Deferred {
          pending: 0,
          reason: err.to_string(),
        };
      }
    };

    if pending.is_empty() {
      debug!("no pending reviews to flush");
      return FlushOutcome::Idle;
    }

    let batch: Vec<NewReview> = pending.iter().map(|p| p.review.clone()).collect();
    info!(count = batch.len(), "flushing pending reviews");

    let confirmed = match self.gateway.submit_reviews(&batch).await {
      Ok(confirmed) => confirmed,
      Err(err) => {
        warn!(count = batch.len(), error = %err, "flush failed, keeping pending reviews");
        return FlushOutcome::Deferred {
          pending: batch.len(),
          reason: err.to_string(),
        };
      }
    };

    // The server has the reviews now, so the queue entries go regardless
    if let Err(err) = self.store.put_many(&confirmed) {
      warn!(error = %err, "could not mirror flushed reviews locally");
    }
    for slot in pending.iter().filter_map(|p| p.slot) {
      if let Err(err) = self.store.delete::<PendingReview>(slot) {
        warn!(slot, error = %err, "could not remove flushed review from queue");
      }
    }

    info!(count = confirmed.len(), "pending reviews flushed");
    FlushOutcome::Flushed(confirmed)
  }

  /// Restaurants filtered by cuisine and neighborhood.
  ///
  /// `None` or [`MATCH_ALL`] disables a filter.
  pub async fn restaurants_matching(
    &self,
    cuisine: Option<&str>,
    neighborhood: Option<&str>,
  ) -> Result<Fetched<Vec<Restaurant>>, SyncError> {
    let all = self.fetch_restaurants().await?;
    Ok(all.map(|restaurants| {
      restaurants
        .into_iter()
        .filter(|r| matches_filter(&r.cuisine_type, cuisine))
        .filter(|r| matches_filter(&r.neighborhood, neighborhood))
        .collect()
    }))
  }

  /// Distinct neighborhoods in the order they first appear.
  pub async fn neighborhoods(&self) -> Result<Vec<String>, SyncError> {
    let restaurants = self.fetch_restaurants().await?.data;
    Ok(distinct(restaurants.iter().map(|r| r.neighborhood.as_str())))
  }

  /// Distinct cuisines in the order they first appear.
  pub async fn cuisines(&self) -> Result<Vec<String>, SyncError> {
    let restaurants = self.fetch_restaurants().await?.data;
    Ok(distinct(restaurants.iter().map(|r| r.cuisine_type.as_str())))
  }
}

impl<S: LocalStore, G: RemoteGateway> Clone for SyncCache<S, G> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      gateway: Arc::clone(&self.gateway),
      flush_lock: Arc::clone(&self.flush_lock),
    }
  }
}

fn matches_filter(value: &str, filter: Option<&str>) -> bool {
  match filter {
    None => true,
    Some(MATCH_ALL) => true,
    Some(wanted) => value == wanted,
  }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
  let mut seen: Vec<String> = Vec::new();
  for value in values.filter(|v| !v.is_empty()) {
    if !seen.iter().any(|s| s == value) {
      seen.push(value.to_string());
    }
  }
  seen
}
