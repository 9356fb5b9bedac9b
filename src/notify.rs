//! Notifications shown to the user.

use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Success,
  Warning,
  Error,
}

impl Severity {
  pub fn label(self) -> &'static str {
    match self {
      Self::Success => "ok",
      Self::Warning => "warning",
      Self::Error => "error",
    }
  }
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub message: String,
  pub severity: Severity,
  /// `None` keeps the notification up until the user dismisses it
  pub auto_dismiss: Option<Duration>,
}

impl Notification {
  pub fn success(message: impl Into<String>, dismiss_after: Duration) -> Self {
    Self {
      message: message.into(),
      severity: Severity::Success,
      auto_dismiss: Some(dismiss_after),
    }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: Severity::Warning,
      auto_dismiss: None,
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: Severity::Error,
      auto_dismiss: None,
    }
  }
}

/// Channel through which the sync layer talks to the user.
pub trait Notifier: Send + Sync {
  fn show(&self, notification: Notification);
}

/// Prints notifications on stderr so they never mix with command output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
  fn show(&self, notification: Notification) {
    info!(
      severity = notification.severity.label(),
      auto_dismiss_ms = notification.auto_dismiss.map(|d| d.as_millis() as u64),
      "{}",
      notification.message
    );
    eprintln!("{}", crate::render::notification_line(&notification));
  }
}

#[cfg(test)]
pub use recording::RecordingNotifier;
