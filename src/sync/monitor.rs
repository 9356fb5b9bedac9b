//! Connectivity monitoring: flush the pending queue when the network returns.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::notify::{Notification, Notifier};
use crate::remote::RemoteGateway;
use crate::store::LocalStore;

use super::cache::SyncCache;
use super::outcome::FlushOutcome;

const BACK_ONLINE: &str = "Seems you're back online";
const GONE_OFFLINE: &str = "Seems you're offline";

/// Source of online/offline reports.
///
/// Reports are taken at face value; nothing checks the network itself.
pub trait ConnectivitySignal: Send {
  /// Next reported state (`true` = online), or `None` once the source closes.
  fn next_state(&mut self) -> impl Future<Output = Option<bool>> + Send;
}

/// Signal fed through a channel, one report per message.
pub struct ChannelSignal {
  rx: mpsc::UnboundedReceiver<bool>,
}

impl ChannelSignal {
  pub fn channel() -> (mpsc::UnboundedSender<bool>, Self) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Self { rx })
  }
}

impl ConnectivitySignal for ChannelSignal {
  async fn next_state(&mut self) -> Option<bool> {
    self.rx.recv().await
  }
}

/// Parse a textual connectivity report such as `online` or `offline`.
pub fn parse_state(line: &str) -> Option<bool> {
  match line.trim().to_lowercase().as_str() {
    "online" | "on" | "up" => Some(true),
    "offline" | "off" | "down" => Some(false),
    _ => None,
  }
}

/// What a reported state changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
  /// Went online; carries the result of the queue flush it triggered
  Online(FlushOutcome),
  Offline,
}

/// Watches connectivity reports and reacts to transitions.
pub struct ConnectivityMonitor<S: LocalStore, G: RemoteGateway, N: Notifier> {
  cache: SyncCache<S, G>,
  notifier: N,
  online: bool,
  online_dismiss: Duration,
}

impl<S: LocalStore, G: RemoteGateway, N: Notifier> ConnectivityMonitor<S, G, N> {
  pub fn new(cache: SyncCache<S, G>, notifier: N, online: bool, online_dismiss: Duration) -> Self {
    Self {
      cache,
      notifier,
      online,
      online_dismiss,
    }
  }

  /// React to reports until the signal closes, passing every transition on.
  pub async fn run<C, F>(&mut self, mut signal: C, mut on_transition: F)
  where
    C: ConnectivitySignal,
    F: FnMut(Transition),
  {
    while let Some(online) = signal.next_state().await {
      if let Some(transition) = self.observe(online).await {
        on_transition(transition);
      }
    }
    debug!("connectivity signal closed");
  }

  /// Handle one report. Reports that repeat the current state do nothing.
  pub async fn observe(&mut self, online: bool) -> Option<Transition> {
    if online == self.online {
      debug!(online, "connectivity unchanged");
      return None;
    }
    self.online = online;

    if online {
      info!("connectivity restored");
      self
        .notifier
        .show(Notification::success(BACK_ONLINE, self.online_dismiss));
      let outcome = self.cache.flush_pending().await;
      Some(Transition::Online(outcome))
    } else {
      info!("connectivity lost");
      self.notifier.show(Notification::warning(GONE_OFFLINE));
      Some(Transition::Offline)
    }
  }
}
