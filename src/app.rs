use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError, ChannelListing, ContentType};
use crate::catalog::Video;
use crate::config::{self, Config};
use crate::constants::constants;
use crate::download::{DownloadEvent, DownloadOrchestrator};
use crate::history::RecentChannelHistory;
use crate::notify::NotificationBus;
use crate::player::{PlayerController, PlayerReply, PlayerRequest};
use crate::preview::PreviewWindow;
use crate::state::{BrowserState, PlayerEffect};
use crate::theme::THEMES;

// --- Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Browse,
  Search,
  Recent,
}

/// Outcome of the connectivity re-check plus fetch pair.
pub(crate) enum FetchOutcome {
  Unreachable(BackendError),
  Finished(Result<ChannelListing, BackendError>),
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) connectivity_rx: Option<oneshot::Receiver<Result<(), BackendError>>>,
  pub(crate) fetch_rx: Option<oneshot::Receiver<(String, FetchOutcome)>>,
  pub(crate) stored_rx: Option<oneshot::Receiver<Result<Vec<Video>, BackendError>>>,
}

/// Startup settings after config and command line are merged.
pub struct Settings {
  pub base_url: String,
  pub content_type: ContentType,
  pub page_size: usize,
  pub resolution: String,
  pub launch_mpv: bool,
  pub theme_name: Option<String>,
}

impl Settings {
  pub fn from_config(config: &Config) -> Self {
    let c = constants();
    let page_size = config.page_size.filter(|s| c.page_size_options.contains(s)).unwrap_or(c.default_page_size);
    Self {
      base_url: config.base_url.clone().unwrap_or_else(|| c.default_base_url.clone()),
      content_type: config.content_type.unwrap_or_default(),
      page_size,
      resolution: config.resolution.clone().unwrap_or_else(|| c.default_resolution.clone()),
      launch_mpv: config.preview.launch_mpv,
      theme_name: config.theme_name.clone(),
    }
  }
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  /// Search query being typed in Search mode (char cursor at the end).
  pub search_input: String,
  pub mode: AppMode,
  pub theme_index: usize,
  pub state: BrowserState,
  /// Row within the visible page.
  pub cursor: usize,
  pub recent_cursor: usize,
  pub preview: PreviewWindow,
  pub base_url: String,
  pub should_quit: bool,
  launch_mpv: bool,
  backend: Arc<dyn Backend>,
  download_rx: mpsc::UnboundedReceiver<DownloadEvent>,
  player_tx: mpsc::UnboundedSender<PlayerReply>,
  player_rx: mpsc::UnboundedReceiver<PlayerReply>,
  pub(crate) tasks: AsyncTasks,
}

impl App {
  /// Must be called inside the tokio runtime; spawns the download worker.
  pub fn new(settings: Settings, backend: Arc<dyn Backend>) -> Self {
    let c = constants();
    let theme_index =
      if let Some(ref name) = settings.theme_name { THEMES.iter().position(|t| t.name == name).unwrap_or(0) } else { 0 };

    let (downloads, download_rx) =
      DownloadOrchestrator::spawn(Arc::clone(&backend), c.dispatch_throttle(), c.in_flight_marker());
    let mut state = BrowserState::new(
      NotificationBus::new(c.notification_lifetime()),
      RecentChannelHistory::load(config::history_path(), c.history_capacity),
      downloads,
      PlayerController::new(c.default_quality.clone()),
      settings.page_size,
      c.page_size_options.clone(),
    );
    state.content_type = settings.content_type;
    state.resolution = settings.resolution;

    let (player_tx, player_rx) = mpsc::unbounded_channel();

    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      search_input: String::new(),
      mode: AppMode::Input,
      theme_index,
      state,
      cursor: 0,
      recent_cursor: 0,
      preview: PreviewWindow::new(),
      base_url: settings.base_url,
      should_quit: false,
      launch_mpv: settings.launch_mpv,
      backend,
      download_rx,
      player_tx,
      player_rx,
      tasks: AsyncTasks::default(),
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    // Reload so command-line overrides are not written back.
    let mut config = Config::load();
    config.theme_name = Some(self.theme().name.to_string());
    config.save();
  }

  // --- Background work ---

  pub fn trigger_connectivity(&mut self) {
    let backend = Arc::clone(&self.backend);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(backend.check_connectivity().await);
    });
    self.tasks.connectivity_rx = Some(rx);
  }

  pub fn trigger_stored(&mut self) {
    let backend = Arc::clone(&self.backend);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(backend.stored_videos().await);
    });
    self.tasks.stored_rx = Some(rx);
  }

  pub fn trigger_fetch(&mut self) {
    let Some(url) = self.state.begin_fetch(&self.input) else { return };
    let backend = Arc::clone(&self.backend);
    let content_type = self.state.content_type;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let outcome = match backend.check_connectivity().await {
        Err(e) => FetchOutcome::Unreachable(e),
        Ok(()) => FetchOutcome::Finished(backend.fetch_channel(&url, content_type).await),
      };
      let _ = tx.send((url, outcome));
    });
    self.tasks.fetch_rx = Some(rx);
  }

  /// Refetch the recent channel under the cursor.
  pub fn fetch_recent(&mut self) {
    let Some(entry) = self.state.history.get(self.recent_cursor) else { return };
    self.input = entry.url.clone();
    self.cursor_position = self.input.chars().count();
    self.mode = AppMode::Input;
    self.trigger_fetch();
  }

  fn run_player_request(&self, req: PlayerRequest) {
    let backend = Arc::clone(&self.backend);
    let tx = self.player_tx.clone();
    tokio::spawn(async move {
      let _ = tx.send(execute_player_request(backend.as_ref(), req).await);
    });
  }

  pub async fn check_pending(&mut self) -> Result<()> {
    if let Some(mut rx) = self.tasks.connectivity_rx.take() {
      match rx.try_recv() {
        Ok(result) => self.state.set_connectivity(result),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.connectivity_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.state.notifications.error("Connectivity check failed.");
        }
      }
    }

    if let Some(mut rx) = self.tasks.stored_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.state.load_stored(result);
          if !self.state.catalog.is_empty() && self.mode == AppMode::Input && self.input.is_empty() {
            self.mode = AppMode::Browse;
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.stored_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {}
      }
    }

    if let Some(mut rx) = self.tasks.fetch_rx.take() {
      match rx.try_recv() {
        Ok((url, FetchOutcome::Unreachable(e))) => {
          warn!(url = %url, "fetch: backend unreachable");
          self.state.fetch_unreachable(e);
        }
        Ok((url, FetchOutcome::Finished(result))) => {
          self.state.set_connectivity(Ok(()));
          let ok = result.is_ok();
          self.state.finish_fetch(&url, result);
          if ok {
            self.cursor = 0;
            self.mode = AppMode::Browse;
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.fetch_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          let url = self.state.fetching().unwrap_or_default().to_string();
          self.state.finish_fetch(&url, Err(BackendError::Rejected("Fetch task failed.".to_string())));
        }
      }
    }

    let now = Instant::now();
    while let Ok(event) = self.download_rx.try_recv() {
      self.state.apply_download_event(event, now);
    }

    while let Ok(reply) = self.player_rx.try_recv() {
      match self.state.apply_player_reply(reply) {
        PlayerEffect::None => {}
        PlayerEffect::Run(req) => self.run_player_request(req),
        PlayerEffect::Show { title, stream_url } => {
          if self.launch_mpv
            && let Err(e) = self.preview.show(&stream_url, &title).await
          {
            warn!(err = %e, "preview: failed to launch");
            self.state.notifications.error(format!("Preview window unavailable: {:#}", e));
          }
        }
      }
    }

    self.preview.poll();
    self.state.tick(now);
    self.clamp_cursor();
    Ok(())
  }

  // --- Browse actions ---

  pub fn page_len(&self) -> usize {
    self.state.page().map(|p| p.videos.len()).unwrap_or(0)
  }

  pub fn current_video_id(&self) -> Option<String> {
    let page = self.state.page().ok()?;
    page.videos.get(self.cursor).map(|v| v.id.clone())
  }

  pub fn clamp_cursor(&mut self) {
    let len = self.page_len();
    if self.cursor >= len {
      self.cursor = len.saturating_sub(1);
    }
  }

  pub fn move_cursor(&mut self, down: bool) {
    let len = self.page_len();
    if len == 0 {
      return;
    }
    self.cursor = if down { (self.cursor + 1) % len } else { (self.cursor + len - 1) % len };
  }

  /// Step one page; stays put at either end.
  pub fn step_page(&mut self, forward: bool) {
    let page = self.state.view.page();
    let target = if forward { page + 1 } else { page.saturating_sub(1) };
    match self.state.go_to_page(target) {
      Ok(()) => self.cursor = 0,
      Err(e) => debug!(err = %e, "page change ignored"),
    }
  }

  pub fn toggle_current(&mut self) {
    if let Some(id) = self.current_video_id() {
      self.state.toggle(&id);
    }
  }

  pub fn download_current(&mut self) {
    if let Some(id) = self.current_video_id() {
      self.state.download_one(&id, Instant::now());
    }
  }

  pub fn open_preview(&mut self) {
    let Some(id) = self.current_video_id() else { return };
    if let Some(req) = self.state.open_player(&id) {
      self.run_player_request(req);
    }
  }

  pub fn cycle_quality(&mut self) {
    if let Some(req) = self.state.cycle_quality() {
      self.run_player_request(req);
    }
  }

  pub async fn close_preview(&mut self) {
    self.state.close_player();
    if let Err(e) = self.preview.stop().await {
      warn!(err = %e, "preview: failed to stop");
    }
  }

  pub fn apply_search(&mut self) {
    self.state.set_search(self.search_input.clone());
    self.cursor = 0;
  }

  pub fn reset_view(&mut self) {
    self.state.reset_view();
    self.search_input.clear();
    self.cursor = 0;
    info!("view reset");
  }

  pub async fn new_channel(&mut self) {
    self.close_preview().await;
    self.state.new_channel();
    self.search_input.clear();
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.cursor = 0;
    self.mode = AppMode::Input;
  }

  pub async fn shutdown(&mut self) -> Result<()> {
    self.preview.stop().await
  }
}

/// Run one player request against the backend.
pub(crate) async fn execute_player_request(backend: &dyn Backend, req: PlayerRequest) -> PlayerReply {
  match req {
    PlayerRequest::Qualities { generation, video_id } => {
      let result = backend.list_qualities(&video_id).await.map_err(|e| e.to_string());
      PlayerReply::Qualities { generation, result }
    }
    PlayerRequest::Stream { generation, video_id, quality } => {
      let result = backend.resolve_stream(&video_id, &quality).await.map_err(|e| e.to_string());
      PlayerReply::Stream { generation, quality, result }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::download::tests::RecordingBackend;

  #[test]
  fn settings_fall_back_to_constants() {
    let settings = Settings::from_config(&Config::default());
    assert_eq!(settings.base_url, constants().default_base_url);
    assert_eq!(settings.page_size, 12);
    assert_eq!(settings.resolution, "highest");
    assert!(settings.launch_mpv);
  }

  #[test]
  fn settings_reject_unknown_page_size() {
    let config = Config { page_size: Some(7), ..Default::default() };
    assert_eq!(Settings::from_config(&config).page_size, 12);
    let config = Config { page_size: Some(48), ..Default::default() };
    assert_eq!(Settings::from_config(&config).page_size, 48);
  }

  #[tokio::test]
  async fn player_requests_carry_generation_back() {
    let backend = RecordingBackend::default();
    let reply =
      execute_player_request(&backend, PlayerRequest::Qualities { generation: 7, video_id: "a".to_string() }).await;
    assert_eq!(reply, PlayerReply::Qualities { generation: 7, result: Ok(Vec::new()) });

    let reply = execute_player_request(
      &backend,
      PlayerRequest::Stream { generation: 8, video_id: "a".to_string(), quality: "720p".to_string() },
    )
    .await;
    assert!(matches!(reply, PlayerReply::Stream { generation: 8, result: Err(_), .. }));
  }
}
