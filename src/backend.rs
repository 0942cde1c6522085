//! The backend service: connectivity, channel fetch, stored videos, download
//! handoff, quality discovery and stream resolution.
//!
//! [`Backend`] is the seam the rest of the crate talks to; [`HttpBackend`] is
//! the reqwest implementation against the JSON API.

use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::Video;
use crate::constants::constants;
use crate::handoff::{self, HandoffMode};

#[derive(Debug, Error)]
pub enum BackendError {
  #[error("Cannot connect to backend at {base_url}. Make sure the server is running.")]
  Unreachable {
    base_url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("Backend request timed out")]
  Timeout,

  #[error("{message}")]
  Server { status: u16, message: String },

  #[error("{0}")]
  Rejected(String),

  #[error("Unexpected backend response: {0}")]
  Decode(String),

  #[error("{0}")]
  Handoff(String),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Which tab of the channel to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
  #[default]
  Videos,
  Shorts,
  Streams,
}

impl ContentType {
  pub const ALL: [ContentType; 3] = [ContentType::Videos, ContentType::Shorts, ContentType::Streams];

  pub fn label(self) -> &'static str {
    match self {
      ContentType::Videos => "videos",
      ContentType::Shorts => "shorts",
      ContentType::Streams => "streams",
    }
  }

  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

/// Result of a successful channel fetch.
#[derive(Debug, Clone)]
pub struct ChannelListing {
  pub channel_name: String,
  pub videos: Vec<Video>,
}

#[async_trait]
pub trait Backend: Send + Sync {
  async fn check_connectivity(&self) -> Result<(), BackendError>;

  async fn fetch_channel(&self, channel_url: &str, content_type: ContentType) -> Result<ChannelListing, BackendError>;

  async fn stored_videos(&self) -> Result<Vec<Video>, BackendError>;

  /// Start a file transfer for `id`. Returns once the transfer is initiated.
  async fn trigger_download(&self, id: &str, title: &str, resolution: &str) -> Result<(), BackendError>;

  async fn list_qualities(&self, id: &str) -> Result<Vec<String>, BackendError>;

  async fn resolve_stream(&self, id: &str, quality: &str) -> Result<String, BackendError>;
}

// --- Wire types ---

#[derive(Deserialize)]
struct ErrorBody {
  error: Option<String>,
}

#[derive(Deserialize)]
struct TestResponse {
  #[serde(default)]
  status: Option<String>,
  #[serde(default)]
  message: Option<String>,
}

#[derive(Serialize)]
struct FetchRequest<'a> {
  channel_url: &'a str,
  content_type: ContentType,
}

#[derive(Deserialize)]
struct FetchResponse {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  channel_name: String,
  #[serde(default)]
  videos: Vec<Video>,
  #[serde(default)]
  error: Option<String>,
}

#[derive(Deserialize)]
struct StoredResponse {
  #[serde(default)]
  videos: Vec<Video>,
}

#[derive(Deserialize)]
struct QualitiesResponse {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  qualities: Vec<String>,
  #[serde(default)]
  error: Option<String>,
}

#[derive(Deserialize)]
struct StreamResponse {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  stream_url: Option<String>,
  #[serde(default)]
  error: Option<String>,
}

// --- HTTP implementation ---

pub struct HttpBackend {
  client: Client,
  base_url: String,
  handoff: HandoffMode,
  downloads_dir: PathBuf,
}

impl HttpBackend {
  pub fn new(base_url: &str, handoff: HandoffMode, downloads_dir: PathBuf) -> Self {
    Self { client: Client::new(), base_url: base_url.trim_end_matches('/').to_string(), handoff, downloads_dir }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  pub fn download_url(&self, id: &str, resolution: &str) -> String {
    self.url(&format!(
      "/api/stream-download/{}?resolution={}",
      urlencoding::encode(id),
      urlencoding::encode(resolution)
    ))
  }

  fn transport(&self, e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
      BackendError::Timeout
    } else if e.is_connect() {
      BackendError::Unreachable { base_url: self.base_url.clone(), source: e }
    } else if e.is_decode() {
      BackendError::Decode(e.to_string())
    } else {
      BackendError::Rejected(e.to_string())
    }
  }

  /// Send `req`, surface the server's `error` field on non-2xx, decode `T`.
  async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
    let resp = req.send().await.map_err(|e| self.transport(e))?;
    let status = resp.status();
    if !status.is_success() {
      let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| format!("Backend returned HTTP {}", status.as_u16()));
      return Err(BackendError::Server { status: status.as_u16(), message });
    }
    resp.json::<T>().await.map_err(|e| BackendError::Decode(e.to_string()))
  }
}

#[async_trait]
impl Backend for HttpBackend {
  async fn check_connectivity(&self) -> Result<(), BackendError> {
    let req =
      self.client.get(self.url("/api/test")).timeout(Duration::from_secs(constants().connectivity_timeout_secs));
    let body: TestResponse = self.send_json(req).await?;
    if body.status.as_deref() == Some("error") {
      return Err(BackendError::Rejected(body.message.unwrap_or_else(|| "Backend reported an error".to_string())));
    }
    debug!(base_url = %self.base_url, "backend: connectivity ok");
    Ok(())
  }

  async fn fetch_channel(&self, channel_url: &str, content_type: ContentType) -> Result<ChannelListing, BackendError> {
    info!(url = %channel_url, content_type = content_type.label(), "backend: fetching channel");
    let req = self
      .client
      .post(self.url("/api/fetch-channel"))
      .json(&FetchRequest { channel_url, content_type })
      .timeout(Duration::from_secs(constants().fetch_timeout_secs));
    let body: FetchResponse = self.send_json(req).await?;
    if !body.success {
      return Err(BackendError::Rejected(body.error.unwrap_or_else(|| "Failed to fetch channel videos".to_string())));
    }
    Ok(ChannelListing { channel_name: body.channel_name, videos: body.videos })
  }

  async fn stored_videos(&self) -> Result<Vec<Video>, BackendError> {
    let body: StoredResponse = self.send_json(self.client.get(self.url("/api/videos"))).await?;
    Ok(body.videos)
  }

  async fn trigger_download(&self, id: &str, title: &str, resolution: &str) -> Result<(), BackendError> {
    let url = self.download_url(id, resolution);
    match self.handoff {
      HandoffMode::Browser => {
        info!(id, url = %url, "backend: handing download to browser");
        handoff::open_in_browser(&url)
      }
      HandoffMode::Direct => {
        let dest = handoff::start_direct(&self.client, &url, title, &self.downloads_dir).await?;
        info!(id, path = %dest.display(), "backend: direct transfer started");
        Ok(())
      }
    }
  }

  async fn list_qualities(&self, id: &str) -> Result<Vec<String>, BackendError> {
    let req = self
      .client
      .get(self.url(&format!("/api/video-qualities/{}", urlencoding::encode(id))))
      .timeout(Duration::from_secs(constants().player_timeout_secs));
    let body: QualitiesResponse = self.send_json(req).await?;
    if !body.success {
      return Err(BackendError::Rejected(body.error.unwrap_or_else(|| "Failed to list video qualities".to_string())));
    }
    Ok(body.qualities)
  }

  async fn resolve_stream(&self, id: &str, quality: &str) -> Result<String, BackendError> {
    let req = self
      .client
      .get(self.url(&format!("/api/play-video/{}?quality={}", urlencoding::encode(id), urlencoding::encode(quality))))
      .timeout(Duration::from_secs(constants().player_timeout_secs));
    let body: StreamResponse = self.send_json(req).await?;
    match (body.success, body.stream_url) {
      (true, Some(url)) if !url.is_empty() => Ok(url),
      _ => Err(BackendError::Rejected(body.error.unwrap_or_else(|| "Failed to get stream URL".to_string()))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn content_type_cycles_and_serializes_lowercase() {
    assert_eq!(ContentType::Videos.next(), ContentType::Shorts);
    assert_eq!(ContentType::Streams.next(), ContentType::Videos);
    let body = serde_json::to_string(&FetchRequest { channel_url: "u", content_type: ContentType::Shorts }).unwrap();
    assert_eq!(body, r#"{"channel_url":"u","content_type":"shorts"}"#);
  }

  #[test]
  fn download_url_encodes_components() {
    let b = HttpBackend::new("http://127.0.0.1:8000/", HandoffMode::Browser, PathBuf::from("."));
    assert_eq!(b.base_url(), "http://127.0.0.1:8000");
    assert_eq!(b.download_url("ab c", "highest"), "http://127.0.0.1:8000/api/stream-download/ab%20c?resolution=highest");
  }

  #[test]
  fn fetch_response_decodes() {
    let json = r#"{"success": true, "channel_name": "Chan", "video_count": 1,
      "videos": [{"video_id": "x", "title": "T", "channel_name": "Chan", "resolutions": ["720p"]}]}"#;
    let body: FetchResponse = serde_json::from_str(json).unwrap();
    assert!(body.success);
    assert_eq!(body.videos.len(), 1);
    assert_eq!(body.channel_name, "Chan");
  }

  #[test]
  fn error_body_decodes() {
    let body: ErrorBody = serde_json::from_str(r#"{"error": "Channel not found."}"#).unwrap();
    assert_eq!(body.error.as_deref(), Some("Channel not found."));
  }

  #[test]
  fn server_error_displays_message_verbatim() {
    let e = BackendError::Server { status: 500, message: "Channel not found. Please check the URL.".to_string() };
    assert_eq!(e.to_string(), "Channel not found. Please check the URL.");
  }
}
