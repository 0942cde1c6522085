//! Recently fetched channels, persisted across sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChannel {
  pub url: String,
  pub name: String,
  pub video_count: usize,
  #[serde(rename = "lastFetched")]
  pub last_fetched_at: DateTime<Utc>,
}

/// Newest-first, unique by url, bounded to `capacity` entries.
///
/// Single writer: the list is overwritten wholesale on each `record`.
pub struct RecentChannelHistory {
  entries: Vec<RecentChannel>,
  path: Option<PathBuf>,
  capacity: usize,
}

impl RecentChannelHistory {
  /// An in-memory history that never touches disk.
  pub fn ephemeral(capacity: usize) -> Self {
    Self { entries: Vec::new(), path: None, capacity }
  }

  /// Restore the list persisted at `path`. Missing or unreadable state
  /// yields an empty history.
  pub fn load(path: PathBuf, capacity: usize) -> Self {
    let entries = match std::fs::read_to_string(&path) {
      Ok(content) => match serde_json::from_str::<Vec<RecentChannel>>(&content) {
        Ok(mut entries) => {
          entries.truncate(capacity);
          entries
        }
        Err(e) => {
          warn!(path = %path.display(), err = %e, "history: ignoring unreadable recent channels");
          Vec::new()
        }
      },
      Err(_) => Vec::new(),
    };
    debug!(count = entries.len(), "history: loaded recent channels");
    Self { entries, path: Some(path), capacity }
  }

  pub fn record(&mut self, url: &str, name: &str, video_count: usize) {
    self.record_at(url, name, video_count, Utc::now());
  }

  pub fn record_at(&mut self, url: &str, name: &str, video_count: usize, at: DateTime<Utc>) {
    self.entries.retain(|e| e.url != url);
    self.entries.insert(
      0,
      RecentChannel { url: url.to_string(), name: name.to_string(), video_count, last_fetched_at: at },
    );
    self.entries.truncate(self.capacity);

    if let Some(path) = &self.path
      && let Err(e) = save(path, &self.entries)
    {
      warn!(path = %path.display(), err = %e, "history: failed to persist recent channels");
    }
  }

  pub fn entries(&self) -> &[RecentChannel] {
    &self.entries
  }

  pub fn get(&self, idx: usize) -> Option<&RecentChannel> {
    self.entries.get(idx)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

fn save(path: &Path, entries: &[RecentChannel]) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  let json = serde_json::to_string_pretty(entries).context("Failed to serialize recent channels")?;
  std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tube-snatch-test-{}-{}", std::process::id(), name)).join("recent.json")
  }

  #[test]
  fn never_exceeds_capacity() {
    let mut h = RecentChannelHistory::ephemeral(10);
    for i in 0..25 {
      h.record(&format!("https://youtube.com/@c{i}"), "C", i);
    }
    assert_eq!(h.len(), 10);
    assert_eq!(h.entries()[0].url, "https://youtube.com/@c24");
  }

  #[test]
  fn rerecording_moves_to_front_and_updates() {
    let mut h = RecentChannelHistory::ephemeral(10);
    h.record("a", "Alpha", 1);
    h.record("b", "Beta", 2);
    h.record("c", "Gamma", 3);
    h.record("a", "Alpha Renamed", 9);
    let urls: Vec<&str> = h.entries().iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, vec!["a", "c", "b"]);
    assert_eq!(h.entries()[0].name, "Alpha Renamed");
    assert_eq!(h.entries()[0].video_count, 9);
  }

  #[test]
  fn urls_stay_unique() {
    let mut h = RecentChannelHistory::ephemeral(10);
    for url in ["a", "b", "a", "c", "b", "a"] {
      h.record(url, "n", 0);
    }
    let mut urls: Vec<&str> = h.entries().iter().map(|e| e.url.as_str()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), h.len());
  }

  #[test]
  fn persists_and_restores() {
    let path = temp_file("roundtrip");
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    {
      let mut h = RecentChannelHistory::load(path.clone(), 10);
      assert!(h.is_empty());
      h.record_at("https://youtube.com/@rust", "Rust", 42, at);
    }
    let restored = RecentChannelHistory::load(path.clone(), 10);
    assert_eq!(restored.len(), 1);
    assert_eq!(restored.entries()[0].video_count, 42);
    assert_eq!(restored.entries()[0].last_fetched_at, at);

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"videoCount\""));
    assert!(raw.contains("\"lastFetched\""));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
  }

  #[test]
  fn corrupt_file_loads_empty() {
    let path = temp_file("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "not json").unwrap();
    assert!(RecentChannelHistory::load(path.clone(), 10).is_empty());
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
  }

  #[test]
  fn decodes_browser_shaped_entries() {
    let json = r#"[{"url":"u","name":"n","videoCount":3,"lastFetched":"2025-01-02T03:04:05.678Z"}]"#;
    let entries: Vec<RecentChannel> = serde_json::from_str(json).unwrap();
    assert_eq!(entries[0].video_count, 3);
  }
}
