use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use tokio::{
  io::AsyncBufReadExt,
  io::BufReader as TokioBufReader,
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info};

/// External mpv window showing the resolved preview stream.
#[derive(Default)]
pub struct PreviewWindow {
  process: Option<TokioChild>,
  monitor: Option<JoinHandle<()>>,
  status_rx: Option<mpsc::Receiver<String>>,
  last_status: Option<String>,
}

impl PreviewWindow {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_running(&self) -> bool {
    self.process.is_some()
  }

  /// Drain status lines from mpv; also notices when the window was closed.
  pub fn poll(&mut self) {
    if let Some(rx) = &mut self.status_rx {
      while let Ok(status) = rx.try_recv() {
        self.last_status = Some(status);
      }
    }
    if let Some(child) = &mut self.process
      && let Ok(Some(status)) = child.try_wait()
    {
      debug!(?status, "preview: mpv exited");
      self.process = None;
      self.status_rx = None;
      self.last_status = None;
    }
  }

  pub fn last_status(&self) -> Option<&str> {
    self.last_status.as_deref()
  }

  /// Show `url`, replacing whatever the window was playing.
  pub async fn show(&mut self, url: &str, title: &str) -> Result<()> {
    self.stop().await.context("Failed to stop previous preview")?;

    let mut cmd = Command::new("mpv");
    cmd.args([
      "--force-window=immediate",
      &format!("--title={}", title),
      "--term-status-msg=${time-pos/full} / ${duration/full} (${percent-pos}%)",
      url,
    ]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // Piped but undrained stderr would eventually block mpv.
    cmd.stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let stdout = child.stdout.take().context("Failed to get mpv stdout")?;
    let (tx, rx) = mpsc::channel::<String>(10);
    let monitor = tokio::spawn(async move {
      let mut lines = TokioBufReader::new(stdout).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
          break;
        }
      }
    });

    info!(title, "preview: mpv started");
    self.process = Some(child);
    self.monitor = Some(monitor);
    self.status_rx = Some(rx);
    Ok(())
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.monitor.take() {
      handle.abort();
      let _ = handle.await;
    }
    self.status_rx = None;
    self.last_status = None;

    if let Some(mut child) = self.process.take() {
      // The user may already have closed the window.
      if child.try_wait().ok().flatten().is_none() {
        child.kill().await.context("Failed to kill mpv process")?;
      }
      let _ = child.wait().await;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn stop_without_process_is_noop() {
    let mut preview = PreviewWindow::new();
    assert!(!preview.is_running());
    preview.stop().await.unwrap();
    preview.poll();
    assert!(preview.last_status().is_none());
  }
}
