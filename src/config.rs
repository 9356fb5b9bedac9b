use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_DIR: &str = "restoreview";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub store: StoreConfig,
  pub notifications: NotificationConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// GraphQL endpoint
  pub url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: "http://localhost:4000/graphql".to_string(),
      timeout_secs: 10,
    }
  }
}

impl ApiConfig {
  pub fn endpoint(&self) -> Result<Url> {
    Url::parse(&self.url).map_err(|e| eyre!("Invalid API url '{}': {}", self.url, e))
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Location of the local store (defaults to the user data directory)
  pub path: Option<PathBuf>,
}

impl StoreConfig {
  pub fn resolve_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("store.db")),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  /// How long the "back online" notice stays up
  pub online_dismiss_ms: u64,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      online_dismiss_ms: 3000,
    }
  }
}

impl NotificationConfig {
  pub fn online_dismiss(&self) -> Duration {
    Duration::from_millis(self.online_dismiss_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Directory for log files (defaults to the user data directory)
  pub directory: Option<PathBuf>,
  /// Filter directive used when RUST_LOG is unset
  pub filter: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      directory: None,
      filter: "info".to_string(),
    }
  }
}

impl LogConfig {
  pub fn resolve_directory(&self) -> Result<PathBuf> {
    match &self.directory {
      Some(dir) => Ok(dir.clone()),
      None => Ok(data_dir()?.join("logs")),
    }
  }
}

/// Per-user data directory for the store and logs
fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join(APP_DIR))
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./restoreview.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/restoreview/config.yaml
  ///
  /// Without any file the defaults apply. `RESTOREVIEW_API_URL` overrides
  /// the configured endpoint.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    Ok(config.with_api_url(std::env::var("RESTOREVIEW_API_URL").ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("restoreview.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_DIR).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Replace the API url when an override is given.
  pub fn with_api_url(self, url: Option<String>) -> Self {
    match url {
      Some(url) => Config {
        api: ApiConfig { url, ..self.api },
        ..self
      },
      None => self,
    }
  }
}
