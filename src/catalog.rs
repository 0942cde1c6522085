use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// A single video as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
  #[serde(rename = "video_id")]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub thumbnail_url: Option<String>,
  #[serde(default)]
  pub duration: String,
  /// Quality labels offered for download, in backend order.
  #[serde(default, rename = "resolutions")]
  pub available_resolutions: Vec<String>,
  #[serde(default)]
  pub channel_name: String,
  /// Set by server state only.
  #[serde(default)]
  pub downloaded: bool,
  /// 0-100, informational only.
  #[serde(default)]
  pub download_progress: f32,
}

/// The video collection of the most recent channel fetch.
///
/// Only ever replaced wholesale: a fetch either swaps the whole snapshot or
/// leaves the previous one untouched.
#[derive(Debug, Default)]
pub struct CatalogStore {
  videos: Vec<Video>,
  channel_name: String,
}

impl CatalogStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Swap in a new snapshot. Duplicate ids keep their first occurrence.
  pub fn replace(&mut self, videos: Vec<Video>, channel_name: impl Into<String>) {
    let mut seen = HashSet::with_capacity(videos.len());
    let total = videos.len();
    let videos: Vec<Video> = videos.into_iter().filter(|v| seen.insert(v.id.clone())).collect();
    if videos.len() != total {
      warn!(dropped = total - videos.len(), "catalog: duplicate video ids in snapshot");
    }
    self.videos = videos;
    self.channel_name = channel_name.into();
  }

  pub fn clear(&mut self) {
    self.videos.clear();
    self.channel_name.clear();
  }

  pub fn videos(&self) -> &[Video] {
    &self.videos
  }

  pub fn channel_name(&self) -> &str {
    &self.channel_name
  }

  pub fn get(&self, id: &str) -> Option<&Video> {
    self.videos.iter().find(|v| v.id == id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.get(id).is_some()
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.videos.iter().map(|v| v.id.as_str())
  }

  pub fn len(&self) -> usize {
    self.videos.len()
  }

  pub fn is_empty(&self) -> bool {
    self.videos.is_empty()
  }
}

#[cfg(test)]
pub(crate) fn make_video(id: &str, title: &str, channel: &str) -> Video {
  Video {
    id: id.to_string(),
    title: title.to_string(),
    thumbnail_url: None,
    duration: "3:21".to_string(),
    available_resolutions: vec!["1080p".to_string(), "720p".to_string()],
    channel_name: channel.to_string(),
    downloaded: false,
    download_progress: 0.0,
  }
}
