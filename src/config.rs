use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::backend::ContentType;
use crate::handoff::HandoffMode;

const APP_NAME: &str = "tube-snatch";

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", APP_NAME)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PreviewConfig {
  /// Open resolved streams in mpv.
  pub launch_mpv: bool,
}

impl Default for PreviewConfig {
  fn default() -> Self {
    Self { launch_mpv: true }
  }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub base_url: Option<String>,
  pub page_size: Option<usize>,
  pub resolution: Option<String>,
  pub content_type: Option<ContentType>,
  pub handoff: Option<HandoffMode>,
  pub downloads_dir: Option<PathBuf>,
  pub theme_name: Option<String>,
  #[serde(default)]
  pub preview: PreviewConfig,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = project_dirs() {
      let config_file = proj_dirs.config_dir().join("config.toml");
      if let Ok(content) = std::fs::read_to_string(&config_file) {
        match toml::from_str(&content) {
          Ok(config) => return config,
          Err(e) => warn!(path = %config_file.display(), err = %e, "config: invalid file, using defaults"),
        }
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = project_dirs() {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("config.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }

  /// Where downloads land in direct handoff mode.
  pub fn downloads_dir(&self) -> PathBuf {
    if let Some(dir) = &self.downloads_dir {
      return dir.clone();
    }
    directories::UserDirs::new()
      .and_then(|u| u.download_dir().map(|d| d.to_path_buf()))
      .unwrap_or_else(|| PathBuf::from("."))
  }
}

/// Per-user data directory for history and logs.
pub fn data_dir() -> PathBuf {
  project_dirs().map(|d| d.data_dir().to_path_buf()).unwrap_or_else(|| std::env::temp_dir().join(APP_NAME))
}

pub fn history_path() -> PathBuf {
  data_dir().join("recent_channels.json")
}
