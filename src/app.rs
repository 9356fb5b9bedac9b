use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, warn};

use crate::config::NotificationConfig;
use crate::error::SyncError;
use crate::models::NewReview;
use crate::notify::{Notification, Notifier};
use crate::remote::RemoteGateway;
use crate::render;
use crate::store::LocalStore;
use crate::sync::{
  parse_state, ChannelSignal, ConnectivityMonitor, ConnectivitySignal, Fetched, FlushOutcome,
  Submission, SyncCache, Transition,
};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
  /// List restaurants, optionally filtered ("all" disables a filter)
  Restaurants {
    #[arg(long)]
    cuisine: Option<String>,
    #[arg(long)]
    neighborhood: Option<String>,
  },
  /// Show a restaurant together with its reviews
  Restaurant { id: i64 },
  /// List the reviews of a restaurant
  Reviews { restaurant_id: i64 },
  /// Post a review; it is queued while the server is unreachable
  Review {
    restaurant_id: i64,
    #[arg(long)]
    name: String,
    #[arg(long)]
    rating: i32,
    #[arg(long)]
    comments: String,
  },
  /// Toggle a restaurant's favorite flag
  Favorite { id: i64 },
  /// List known neighborhoods
  Neighborhoods,
  /// List known cuisines
  Cuisines,
  /// List reviews waiting to be posted
  Pending,
  /// Post queued reviews now
  Sync,
  /// Read "online"/"offline" lines from stdin and sync on reconnect
  Watch,
}

/// Command runner over the sync layer
pub struct App<S: LocalStore, G: RemoteGateway, N: Notifier + Clone> {
  cache: SyncCache<S, G>,
  notifier: N,
  online_dismiss: Duration,
}

impl<S: LocalStore, G: RemoteGateway, N: Notifier + Clone> App<S, G, N> {
  pub fn new(cache: SyncCache<S, G>, notifier: N, notifications: &NotificationConfig) -> Self {
    Self {
      cache,
      notifier,
      online_dismiss: notifications.online_dismiss(),
    }
  }

  pub async fn run(&self, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
      Command::Restaurants {
        cuisine,
        neighborhood,
      } => {
        self
          .list_restaurants(cuisine.as_deref(), neighborhood.as_deref(), out)
          .await
      }
      Command::Restaurant { id } => self.show_restaurant(id, out).await,
      Command::Reviews { restaurant_id } => self.list_reviews(restaurant_id, out).await,
      Command::Review {
        restaurant_id,
        name,
        rating,
        comments,
      } => {
        let review = NewReview {
          restaurant_id,
          name,
          rating,
          comments,
        };
        self.post_review(review, out).await
      }
      Command::Favorite { id } => self.toggle_favorite(id, out).await,
      Command::Neighborhoods => {
        let neighborhoods = self.or_report("neighborhoods", self.cache.neighborhoods().await);
        write_values(out, neighborhoods.unwrap_or_default(), "No neighborhoods")
      }
      Command::Cuisines => {
        let cuisines = self.or_report("cuisines", self.cache.cuisines().await);
        write_values(out, cuisines.unwrap_or_default(), "No cuisines")
      }
      Command::Pending => self.list_pending(out),
      Command::Sync => {
        let outcome = self.cache.flush_pending().await;
        writeln!(out, "{}", flush_summary(&outcome))?;
        Ok(())
      }
      Command::Watch => self.watch(stdin_signal(), out).await,
    }
  }

  /// Unwrap a read, turning a failure into an error notification.
  fn or_report<T>(&self, what: &str, result: Result<T, SyncError>) -> Option<T> {
    match result {
      Ok(value) => Some(value),
      Err(err) => {
        error!(what, error = %err, "read failed");
        self
          .notifier
          .show(Notification::error(format!("Could not load {}: {}", what, err)));
        None
      }
    }
  }

  async fn list_restaurants(
    &self,
    cuisine: Option<&str>,
    neighborhood: Option<&str>,
    out: &mut impl Write,
  ) -> Result<()> {
    let restaurants = self
      .or_report(
        "restaurants",
        self.cache.restaurants_matching(cuisine, neighborhood).await,
      )
      .map(|fetched| loaded("restaurants", fetched))
      .unwrap_or_default();

    if restaurants.is_empty() {
      writeln!(out, "No restaurants")?;
    }
    for restaurant in &restaurants {
      writeln!(out, "{}", render::restaurant_line(restaurant))?;
    }
    Ok(())
  }

  async fn show_restaurant(&self, id: i64, out: &mut impl Write) -> Result<()> {
    let Some(fetched) = self.or_report("restaurant", self.cache.fetch_restaurant(id).await) else {
      return Ok(());
    };
    writeln!(out, "{}", render::restaurant_detail(&loaded("restaurant", fetched)))?;
    writeln!(out)?;
    self.list_reviews(id, out).await
  }

  async fn list_reviews(&self, restaurant_id: i64, out: &mut impl Write) -> Result<()> {
    let reviews = self
      .or_report("reviews", self.cache.fetch_reviews(restaurant_id).await)
      .map(|fetched| loaded("reviews", fetched))
      .unwrap_or_default();

    if reviews.is_empty() {
      writeln!(out, "No reviews yet")?;
    }
    for review in &reviews {
      writeln!(out, "{}", render::review_line(review))?;
    }
    Ok(())
  }

  async fn post_review(&self, review: NewReview, out: &mut impl Write) -> Result<()> {
    review.validate()?;

    match self.cache.submit_review(review).await? {
      Submission::Confirmed(review) => {
        writeln!(out, "Posted review #{}", review.id)?;
      }
      Submission::Queued(pending) => {
        writeln!(
          out,
          "Saved review for restaurant {}; it will be posted once you're back online",
          pending.review.restaurant_id
        )?;
      }
    }
    Ok(())
  }

  async fn toggle_favorite(&self, id: i64, out: &mut impl Write) -> Result<()> {
    let Some(fetched) = self.or_report("restaurant", self.cache.fetch_restaurant(id).await) else {
      return Ok(());
    };
    let mut restaurant = loaded("restaurant", fetched);

    let remote = self.cache.toggle_favorite(&mut restaurant);
    writeln!(out, "{}", render::restaurant_line(&restaurant))?;

    // Let the remote update finish before the process exits
    remote
      .await
      .map_err(|e| eyre!("Favorite update task failed: {}", e))?;
    Ok(())
  }

  fn list_pending(&self, out: &mut impl Write) -> Result<()> {
    let pending = self
      .or_report("pending reviews", self.cache.pending_reviews())
      .unwrap_or_default();

    if pending.is_empty() {
      writeln!(out, "No pending reviews")?;
    }
    for review in &pending {
      writeln!(out, "{}", render::pending_line(review))?;
    }
    Ok(())
  }

  /// Follow connectivity reports until the signal closes.
  ///
  /// Starts out assuming the network is reachable, so anything already
  /// queued is sent before the first report arrives.
  async fn watch<C: ConnectivitySignal>(&self, signal: C, out: &mut impl Write) -> Result<()> {
    let startup = self.cache.flush_pending().await;
    let mut written = report_flush(&mut *out, &startup);

    let mut monitor = ConnectivityMonitor::new(
      self.cache.clone(),
      self.notifier.clone(),
      true,
      self.online_dismiss,
    );
    monitor
      .run(signal, |transition| {
        if let Transition::Online(outcome) = transition {
          if written.is_ok() {
            written = report_flush(&mut *out, &outcome);
          }
        }
      })
      .await;

    written?;
    Ok(())
  }
}

fn loaded<T>(what: &str, fetched: Fetched<T>) -> T {
  debug!(what, source = ?fetched.source, "loaded");
  fetched.data
}

fn write_values(out: &mut impl Write, values: Vec<String>, empty: &str) -> Result<()> {
  if values.is_empty() {
    writeln!(out, "{}", empty)?;
  }
  for value in values {
    writeln!(out, "{}", value)?;
  }
  Ok(())
}

/// Print a flush result unless there was nothing to send.
fn report_flush(out: &mut impl Write, outcome: &FlushOutcome) -> std::io::Result<()> {
  if *outcome == FlushOutcome::Idle {
    return Ok(());
  }
  writeln!(out, "{}", flush_summary(outcome))
}

fn flush_summary(outcome: &FlushOutcome) -> String {
  match outcome {
    FlushOutcome::Idle => "Nothing to sync".to_string(),
    FlushOutcome::Flushed(reviews) => format!("Posted {} queued review(s)", reviews.len()),
    FlushOutcome::Deferred { pending, reason } => {
      format!("Kept {} queued review(s) for later: {}", pending, reason)
    }
  }
}

/// Connectivity reports read line by line from stdin.
fn stdin_signal() -> ChannelSignal {
  let (tx, signal) = ChannelSignal::channel();

  tokio::spawn(async move {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
      match lines.next_line().await {
        Ok(Some(line)) => match parse_state(&line) {
          Some(online) => {
            if tx.send(online).is_err() {
              break;
            }
          }
          None if line.trim().is_empty() => {}
          None => {
            warn!(line, "unrecognised connectivity report");
            eprintln!("expected 'online' or 'offline', got '{}'", line.trim());
          }
        },
        Ok(None) => break,
        Err(err) => {
          warn!(error = %err, "failed to read connectivity reports");
          break;
        }
      }
    }
  });

  signal
}
