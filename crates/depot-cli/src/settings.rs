//! Application settings: an optional TOML file overlaid with `DEPOT_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use depot_net::NetConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite file backing the preference store.
  pub store_path:          PathBuf,
  /// Directory holding the profile photo.
  pub photo_dir:           PathBuf,
  /// Answer given to the notification permission prompt.
  pub grant_notifications: bool,
  pub net:                 NetConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path:          PathBuf::from("~/.local/share/depot/depot.sqlite"),
      photo_dir:           PathBuf::from("~/.local/share/depot"),
      grant_notifications: true,
      net:                 NetConfig::default(),
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then apply the environment. Nested keys use a
  /// double underscore, e.g. `DEPOT_NET__REQUEST_TIMEOUT_MS`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("DEPOT")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    settings.photo_dir = expand_tilde(&settings.photo_dir);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
