use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Preferences persisted in `prefs.toml` under the platform config directory.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub api_key: Option<String>,
  /// Overrides the Data API base URL (proxies, local mocks).
  pub api_base_url: Option<String>,
}

fn config_file() -> Option<PathBuf> {
  ProjectDirs::from("", "", "ypl").map(|dirs| dirs.config_dir().join("prefs.toml"))
}

impl Config {
  pub fn load() -> Self {
    config_file().map(|path| Self::load_from(&path)).unwrap_or_default()
  }

  pub fn load_from(path: &Path) -> Self {
    if let Ok(content) = std::fs::read_to_string(path) {
      match toml::from_str(&content) {
        Ok(config) => return config,
        Err(e) => warn!(path = %path.display(), err = %e, "config: ignoring malformed prefs"),
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(path) = config_file() {
      self.save_to(&path);
    }
  }

  pub fn save_to(&self, path: &Path) {
    if let Some(dir) = path.parent()
      && let Err(e) = std::fs::create_dir_all(dir)
    {
      warn!(dir = %dir.display(), err = %e, "config: cannot create config dir");
      return;
    }
    match toml::to_string(self) {
      Ok(content) => {
        if let Err(e) = std::fs::write(path, content) {
          warn!(path = %path.display(), err = %e, "config: failed to write prefs");
        }
      }
      Err(e) => warn!(err = %e, "config: failed to serialize prefs"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ypl-config-test-{}-{}", std::process::id(), name)).join("prefs.toml")
  }

  #[test]
  fn missing_file_gives_defaults() {
    let config = Config::load_from(&scratch_path("missing"));
    assert_eq!(config, Config::default());
  }

  #[test]
  fn save_then_load_keeps_theme() {
    let path = scratch_path("roundtrip");
    let config = Config { theme_name: Some("light".into()), ..Config::default() };
    config.save_to(&path);
    assert_eq!(Config::load_from(&path).theme_name.as_deref(), Some("light"));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
  }

  #[test]
  fn malformed_file_falls_back_to_defaults() {
    let path = scratch_path("malformed");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "theme_name = [").unwrap();
    assert_eq!(Config::load_from(&path), Config::default());
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
  }
}
