//! Initiating a file transfer to the user's environment.
//!
//! A handoff only starts the transfer. Whatever happens after the first
//! successful response is not tracked by the caller.

use clap::ValueEnum;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::backend::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HandoffMode {
  /// Let the system browser perform the save.
  #[default]
  Browser,
  /// Stream the response body into the downloads directory.
  Direct,
}

impl HandoffMode {
  pub fn label(self) -> &'static str {
    match self {
      HandoffMode::Browser => "browser",
      HandoffMode::Direct => "direct",
    }
  }
}

/// Replace everything outside `[A-Za-z0-9 ]` with `_`.
pub fn sanitize_file_name(title: &str) -> String {
  title.chars().map(|c| if c.is_ascii_alphanumeric() || c == ' ' { c } else { '_' }).collect()
}

/// Open `url` in the user's default browser.
pub fn open_in_browser(url: &str) -> Result<(), BackendError> {
  webbrowser::open(url).map_err(|e| BackendError::Handoff(format!("Failed to open the download in a browser: {}", e)))?;
  info!(url, "handoff: opened in browser");
  Ok(())
}

/// First free `<stem>.mp4`, `<stem> (1).mp4`, ... inside `dir`.
fn destination(dir: &Path, stem: &str) -> PathBuf {
  let first = dir.join(format!("{}.mp4", stem));
  if !first.exists() {
    return first;
  }
  (1..)
    .map(|n| dir.join(format!("{} ({}).mp4", stem, n)))
    .find(|p| !p.exists())
    .unwrap_or(first)
}

/// Request `url` and, once the backend answers successfully, spawn a detached
/// task writing the body to `downloads_dir`. Returns the destination path.
pub async fn start_direct(
  client: &Client,
  url: &str,
  title: &str,
  downloads_dir: &Path,
) -> Result<PathBuf, BackendError> {
  let response = client.get(url).send().await.map_err(|e| BackendError::Handoff(e.to_string()))?;
  let status = response.status();
  if !status.is_success() {
    return Err(BackendError::Server {
      status: status.as_u16(),
      message: format!("Download request failed with HTTP {}", status.as_u16()),
    });
  }

  tokio::fs::create_dir_all(downloads_dir).await?;
  let dest = destination(downloads_dir, &sanitize_file_name(title));
  let mut file = tokio::fs::File::create(&dest).await?;

  let task_dest = dest.clone();
  tokio::spawn(async move {
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
      let result = match chunk {
        Ok(bytes) => {
          written += bytes.len() as u64;
          file.write_all(&bytes).await.map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
      };
      if let Err(e) = result {
        warn!(path = %task_dest.display(), err = %e, "handoff: transfer aborted");
        return;
      }
    }
    if let Err(e) = file.flush().await {
      warn!(path = %task_dest.display(), err = %e, "handoff: flush failed");
      return;
    }
    info!(path = %task_dest.display(), bytes = written, "handoff: transfer finished");
  });

  Ok(dest)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sanitize_keeps_alnum_and_spaces() {
    assert_eq!(sanitize_file_name("My Video 2"), "My Video 2");
    assert_eq!(sanitize_file_name("a/b:c?"), "a_b_c_");
    assert_eq!(sanitize_file_name("Café!"), "Caf__");
  }

  #[test]
  fn destination_avoids_existing_files() {
    let dir = std::env::temp_dir().join(format!("tube-snatch-test-{}-dest", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let first = destination(&dir, "clip");
    assert_eq!(first, dir.join("clip.mp4"));
    std::fs::write(&first, b"x").unwrap();
    assert_eq!(destination(&dir, "clip"), dir.join("clip (1).mp4"));
    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn browser_handoff_reports_unopenable_target() {
    let missing = std::env::temp_dir().join(format!("tube-snatch-test-{}-missing", std::process::id()));
    let err = open_in_browser(&missing.display().to_string()).unwrap_err();
    assert!(matches!(err, BackendError::Handoff(msg) if msg.starts_with("Failed to open")));
  }

  #[test]
  fn mode_deserializes_lowercase() {
    #[derive(Deserialize)]
    struct Wrap {
      mode: HandoffMode,
    }
    let w: Wrap = toml::from_str("mode = \"direct\"").unwrap();
    assert_eq!(w.mode, HandoffMode::Direct);
  }
}
