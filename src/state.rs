//! Everything the browser knows, owned in one place.
//!
//! [`BrowserState`] wires the catalog, view, selection, notifications,
//! history, download queue and preview session together and implements every
//! user-level operation on top of them. It performs no I/O of its own: backend
//! results are passed in, and player work is handed back as requests.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ChannelListing, ContentType};
use crate::catalog::{CatalogStore, Video};
use crate::download::{DownloadCommand, DownloadEvent, DownloadJob, DownloadOrchestrator};
use crate::filter::{self, Category, PageOutOfRange, PageView, ViewState};
use crate::history::RecentChannelHistory;
use crate::notify::NotificationBus;
use crate::player::{PlayerController, PlayerReply, PlayerRequest, PlayerUpdate};
use crate::selection::SelectionModel;

/// Where a persistent banner came from; each source clears its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
  Connectivity,
  Fetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
  pub kind: BannerKind,
  pub message: String,
}

/// What the caller should do after a player reply was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEffect {
  None,
  Run(PlayerRequest),
  /// A stream is ready to be shown.
  Show { title: String, stream_url: String },
}

pub struct BrowserState {
  pub catalog: CatalogStore,
  pub view: ViewState,
  pub selection: SelectionModel,
  pub notifications: NotificationBus,
  pub history: RecentChannelHistory,
  pub downloads: DownloadOrchestrator,
  pub player: PlayerController,
  pub content_type: ContentType,
  pub resolution: String,
  connected: bool,
  banner: Option<Banner>,
  fetching: Option<String>,
  page_size_options: Vec<usize>,
}

impl BrowserState {
  pub fn new(
    notifications: NotificationBus,
    history: RecentChannelHistory,
    downloads: DownloadOrchestrator,
    player: PlayerController,
    page_size: usize,
    page_size_options: Vec<usize>,
  ) -> Self {
    Self {
      catalog: CatalogStore::new(),
      view: ViewState::new(page_size),
      selection: SelectionModel::new(),
      notifications,
      history,
      downloads,
      player,
      content_type: ContentType::default(),
      resolution: "highest".to_string(),
      connected: false,
      banner: None,
      fetching: None,
      page_size_options,
    }
  }

  pub fn is_connected(&self) -> bool {
    self.connected
  }

  pub fn banner(&self) -> Option<&Banner> {
    self.banner.as_ref()
  }

  /// Url of the fetch in progress, if any.
  pub fn fetching(&self) -> Option<&str> {
    self.fetching.as_deref()
  }

  fn clear_banner(&mut self, kind: BannerKind) {
    if self.banner.as_ref().is_some_and(|b| b.kind == kind) {
      self.banner = None;
    }
  }

  // --- Connectivity ---

  pub fn set_connectivity(&mut self, result: Result<(), BackendError>) {
    match result {
      Ok(()) => {
        if !self.connected {
          info!("backend connected");
        }
        self.connected = true;
        self.clear_banner(BannerKind::Connectivity);
      }
      Err(e) => {
        warn!(err = %e, "backend unreachable");
        self.connected = false;
        self.banner = Some(Banner { kind: BannerKind::Connectivity, message: e.to_string() });
      }
    }
  }

  // --- Fetch ---

  /// Validate a fetch request. Returns the trimmed url to fetch, or `None`
  /// when the request was refused (and why is on the banner).
  pub fn begin_fetch(&mut self, url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
      self.banner = Some(Banner { kind: BannerKind::Fetch, message: "Please enter a channel URL".to_string() });
      return None;
    }
    if !self.connected {
      self.notifications.error("Backend is not connected. Press r to retry.");
      return None;
    }
    if self.fetching.is_some() {
      return None;
    }
    self.clear_banner(BannerKind::Fetch);
    self.fetching = Some(url.to_string());
    info!(url, content_type = self.content_type.label(), "fetch: starting");
    Some(url.to_string())
  }

  /// Apply a fetch outcome. Failure leaves the catalog and selection alone.
  pub fn finish_fetch(&mut self, url: &str, result: Result<ChannelListing, BackendError>) {
    self.fetching = None;
    match result {
      Ok(listing) => {
        let count = listing.videos.len();
        let name = listing.channel_name;
        self.catalog.replace(listing.videos, name.clone());
        self.view.catalog_replaced();
        if !name.is_empty() {
          self.view.set_category(name.clone());
        }
        self.selection.prune(&self.catalog);
        self.history.record(url, &name, count);
        self.clear_banner(BannerKind::Fetch);
        self.notifications.success(format!("Found {} {} from {}!", count, self.content_type.label(), name));
        info!(url, channel = %name, count, "fetch: done");
      }
      Err(e) => {
        warn!(url, err = %e, "fetch: failed");
        if matches!(e, BackendError::Unreachable { .. }) {
          self.set_connectivity(Err(e));
        } else {
          self.banner = Some(Banner { kind: BannerKind::Fetch, message: e.to_string() });
        }
      }
    }
  }

  /// The pre-fetch connectivity re-check failed; nothing was fetched.
  pub fn fetch_unreachable(&mut self, error: BackendError) {
    self.fetching = None;
    self.set_connectivity(Err(error));
  }

  /// Seed an empty catalog from videos the backend already stores.
  pub fn load_stored(&mut self, result: Result<Vec<Video>, BackendError>) {
    match result {
      Ok(videos) if !videos.is_empty() && self.catalog.is_empty() => {
        let name = videos[0].channel_name.clone();
        debug!(count = videos.len(), channel = %name, "stored videos loaded");
        self.catalog.replace(videos, name);
        self.view.catalog_replaced();
        self.selection.prune(&self.catalog);
      }
      Ok(_) => {}
      Err(e) => warn!(err = %e, "failed to load stored videos"),
    }
  }

  // --- View ---

  pub fn page(&self) -> Result<PageView<'_>, PageOutOfRange> {
    filter::paginate(self.catalog.videos(), &self.view)
  }

  pub fn total_pages(&self) -> usize {
    let filtered = filter::filter(self.catalog.videos(), self.view.search(), self.view.category());
    filter::total_pages(filtered.len(), self.view.page_size())
  }

  pub fn categories(&self) -> Vec<Category> {
    filter::categories(self.catalog.videos())
  }

  pub fn set_search(&mut self, query: impl Into<String>) {
    self.view.set_search(query);
  }

  /// Step through the category list, wrapping.
  pub fn cycle_category(&mut self, forward: bool) {
    let cats = self.categories();
    let idx = cats.iter().position(|c| c.name == self.view.category()).unwrap_or(0);
    let next = if forward { (idx + 1) % cats.len() } else { (idx + cats.len() - 1) % cats.len() };
    self.view.set_category(cats[next].name.clone());
  }

  pub fn cycle_page_size(&mut self) {
    if self.page_size_options.is_empty() {
      return;
    }
    let idx = self.page_size_options.iter().position(|s| *s == self.view.page_size()).map_or(0, |i| i + 1);
    self.view.set_page_size(self.page_size_options[idx % self.page_size_options.len()]);
  }

  pub fn go_to_page(&mut self, page: usize) -> Result<(), PageOutOfRange> {
    let total_pages = self.total_pages();
    if page < 1 || page > total_pages {
      return Err(PageOutOfRange { page, total_pages });
    }
    self.view.set_page(page);
    Ok(())
  }

  /// Clear selection and filters, keeping the catalog.
  pub fn reset_view(&mut self) {
    self.selection.clear();
    self.view.reset();
  }

  /// Forget the catalog as well.
  pub fn new_channel(&mut self) {
    self.reset_view();
    self.catalog.clear();
    self.clear_banner(BannerKind::Fetch);
  }

  // --- Selection ---

  pub fn toggle(&mut self, id: &str) -> bool {
    self.selection.toggle(id, &self.catalog)
  }

  pub fn select_all(&mut self) -> usize {
    self.selection.select_all(&self.catalog)
  }

  pub fn clear_selection(&mut self) {
    self.selection.clear();
  }

  // --- Downloads ---

  fn job(&self, video: &Video) -> DownloadJob {
    DownloadJob { id: video.id.clone(), title: video.title.clone(), resolution: self.resolution.clone() }
  }

  /// Queue a single video. Ignored while it is queued or marked in-flight.
  pub fn download_one(&mut self, id: &str, now: Instant) {
    if !self.connected {
      self.notifications.error("Backend is not connected. Downloads are unavailable.");
      return;
    }
    let Some(video) = self.catalog.get(id) else { return };
    if self.downloads.is_busy(id) {
      debug!(id, "download: already queued or in flight");
      return;
    }
    let job = self.job(video);
    match self.downloads.enqueue(DownloadCommand::Single(job)) {
      Ok(()) => self.downloads.mark_in_flight(id, now),
      Err(e) => {
        self.notifications.error(e.to_string());
      }
    }
  }

  /// Queue every selected video in catalog order. Videos already waiting on
  /// the worker are skipped. The selection clears when the batch finishes.
  pub fn download_selected(&mut self) {
    if self.selection.is_empty() {
      self.notifications.error("Please select at least one video to download");
      return;
    }
    if !self.connected {
      self.notifications.error("Backend is not connected. Downloads are unavailable.");
      return;
    }
    let jobs: Vec<DownloadJob> = self
      .selection
      .ordered(&self.catalog)
      .into_iter()
      .filter_map(|id| self.catalog.get(id))
      .filter(|v| !self.downloads.is_queued(&v.id))
      .map(|v| self.job(v))
      .collect();
    if jobs.is_empty() {
      self.notifications.info("Selected videos are already queued for download");
      return;
    }
    let count = jobs.len();
    match self.downloads.enqueue(DownloadCommand::Batch(jobs)) {
      Ok(()) => {
        self.notifications.info(format!("Starting download of {} videos...", count));
      }
      Err(e) => {
        self.notifications.error(e.to_string());
      }
    }
  }

  pub fn apply_download_event(&mut self, event: DownloadEvent, now: Instant) {
    match event {
      DownloadEvent::Dispatching { id, title } => {
        self.downloads.mark_in_flight(&id, now);
        self.notifications.info(format!("Preparing download for \"{}\"...", title));
      }
      DownloadEvent::HandedOff { id, title } => {
        self.downloads.settle(&id);
        self.notifications.success(format!("\"{}\" download started!", title));
      }
      DownloadEvent::Failed { id, title, error } => {
        self.downloads.settle(&id);
        self.notifications.error(format!("Failed to download \"{}\": {}", title, error));
      }
      DownloadEvent::BatchFinished { attempted } => {
        self.notifications.success(format!("All {} downloads started successfully!", attempted));
        self.selection.clear();
      }
    }
  }

  // --- Preview player ---

  pub fn open_player(&mut self, id: &str) -> Option<PlayerRequest> {
    let video = self.catalog.get(id)?.clone();
    self.notifications.info(format!("Loading video player for \"{}\"...", video.title));
    Some(self.player.open(video))
  }

  pub fn change_quality(&mut self, quality: &str) -> Option<PlayerRequest> {
    let req = self.player.change_quality(quality)?;
    self.notifications.info(format!("Switching to {}...", quality));
    Some(req)
  }

  /// Advance to the next offered quality.
  pub fn cycle_quality(&mut self) -> Option<PlayerRequest> {
    let next = self.player.next_quality()?;
    self.change_quality(&next)
  }

  pub fn close_player(&mut self) {
    self.player.close();
  }

  pub fn apply_player_reply(&mut self, reply: PlayerReply) -> PlayerEffect {
    match self.player.apply(reply) {
      PlayerUpdate::Stale => PlayerEffect::None,
      PlayerUpdate::Fetch(req) => PlayerEffect::Run(req),
      PlayerUpdate::Opened { title, quality, stream_url } => {
        info!(title = %title, quality = %quality, "player: ready");
        self.notifications.success("Video player loaded successfully!");
        PlayerEffect::Show { title, stream_url }
      }
      PlayerUpdate::Switched { quality, stream_url } => {
        self.notifications.success(format!("Quality changed to {}", quality));
        let title = self.player.session().map(|s| s.video.title.clone()).unwrap_or_default();
        PlayerEffect::Show { title, stream_url }
      }
      PlayerUpdate::OpenFailed { title, error } => {
        warn!(title = %title, err = %error, "player: failed to open");
        self.notifications.error(format!("Failed to load video player: {}", error));
        PlayerEffect::None
      }
      PlayerUpdate::SwitchFailed { quality, error } => {
        warn!(quality = %quality, err = %error, "player: quality switch failed");
        self.notifications.error(format!("Failed to load video stream: {}", error));
        PlayerEffect::None
      }
    }
  }

  /// Apply every deadline due at `now`.
  pub fn tick(&mut self, now: Instant) {
    self.notifications.expire(now);
    self.downloads.expire(now);
  }
}
