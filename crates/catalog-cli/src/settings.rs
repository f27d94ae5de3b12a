//! Runtime configuration, read from `catalog.toml` and `CATALOG_*` variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

fn default_store_path() -> PathBuf { PathBuf::from("catalog.db") }

fn default_busy_timeout_ms() -> u64 { 5_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
  /// SQLite file holding the catalog; `~/` expands to `$HOME`.
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// How long a write waits on a locked database before failing.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

impl CatalogConfig {
  /// Layer the optional config file under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CATALOG"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise CatalogConfig")
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = CatalogConfig::load(Path::new("/nonexistent/catalog.toml")).unwrap();
    assert_eq!(cfg.busy_timeout(), Duration::from_secs(5));
  }

  #[test]
  fn absolute_paths_are_left_alone() {
    assert_eq!(expand_tilde(Path::new("/var/lib/catalog.db")), PathBuf::from("/var/lib/catalog.db"));
  }
}
