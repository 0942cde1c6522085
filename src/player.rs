//! Preview session state machine.
//!
//! The controller never performs I/O. Each transition that needs the backend
//! hands back a [`PlayerRequest`] tagged with the current generation; the
//! caller runs it and feeds the outcome back through [`PlayerController::apply`].
//! Any reply whose generation is not current belongs to a superseded session
//! or switch and is discarded.

use tracing::debug;

use crate::catalog::Video;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
  Closed,
  DiscoveringQualities,
  LoadingStream,
  Ready,
  ClosedWithError(String),
}

#[derive(Debug, Clone)]
pub struct PlayerSession {
  pub video: Video,
  pub qualities: Vec<String>,
  pub selected_quality: String,
  pub stream_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRequest {
  Qualities { generation: u64, video_id: String },
  Stream { generation: u64, video_id: String, quality: String },
}

impl PlayerRequest {
  pub fn generation(&self) -> u64 {
    match self {
      PlayerRequest::Qualities { generation, .. } | PlayerRequest::Stream { generation, .. } => *generation,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerReply {
  Qualities { generation: u64, result: Result<Vec<String>, String> },
  Stream { generation: u64, quality: String, result: Result<String, String> },
}

impl PlayerReply {
  pub fn generation(&self) -> u64 {
    match self {
      PlayerReply::Qualities { generation, .. } | PlayerReply::Stream { generation, .. } => *generation,
    }
  }
}

/// What applying a reply did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerUpdate {
  /// Reply for a superseded generation; nothing changed.
  Stale,
  /// Qualities are known; resolve the stream next.
  Fetch(PlayerRequest),
  Opened { title: String, quality: String, stream_url: String },
  Switched { quality: String, stream_url: String },
  OpenFailed { title: String, error: String },
  /// The switch failed; the session is back on `quality`.
  SwitchFailed { quality: String, error: String },
}

pub struct PlayerController {
  state: PlayerState,
  session: Option<PlayerSession>,
  generation: u64,
  default_quality: String,
  /// Quality and stream in use before a pending switch.
  fallback: Option<(String, String)>,
}

impl PlayerController {
  pub fn new(default_quality: impl Into<String>) -> Self {
    Self {
      state: PlayerState::Closed,
      session: None,
      generation: 0,
      default_quality: default_quality.into(),
      fallback: None,
    }
  }

  pub fn state(&self) -> &PlayerState {
    &self.state
  }

  pub fn session(&self) -> Option<&PlayerSession> {
    self.session.as_ref()
  }

  pub fn is_open(&self) -> bool {
    self.session.is_some()
  }

  pub fn is_switching(&self) -> bool {
    self.fallback.is_some()
  }

  /// Qualities offered for the current session, or the default alone.
  pub fn qualities(&self) -> Vec<String> {
    match &self.session {
      Some(s) => s.qualities.clone(),
      None => vec![self.default_quality.clone()],
    }
  }

  /// Start a session for `video`, superseding any session in progress.
  pub fn open(&mut self, video: Video) -> PlayerRequest {
    self.generation += 1;
    debug!(id = %video.id, generation = self.generation, "player: open");
    let video_id = video.id.clone();
    self.session = Some(PlayerSession {
      video,
      qualities: vec![self.default_quality.clone()],
      selected_quality: self.default_quality.clone(),
      stream_url: None,
    });
    self.fallback = None;
    self.state = PlayerState::DiscoveringQualities;
    PlayerRequest::Qualities { generation: self.generation, video_id }
  }

  /// Switch the open session to `quality`. Only honoured once a stream is
  /// playing; the same quality is a no-op.
  pub fn change_quality(&mut self, quality: &str) -> Option<PlayerRequest> {
    let session = self.session.as_mut()?;
    match self.state {
      PlayerState::Ready => {
        if session.selected_quality == quality {
          return None;
        }
        let url = session.stream_url.clone()?;
        self.fallback = Some((session.selected_quality.clone(), url));
      }
      PlayerState::LoadingStream if self.fallback.is_some() => {
        if session.selected_quality == quality {
          return None;
        }
      }
      _ => return None,
    }
    self.generation += 1;
    debug!(quality, generation = self.generation, "player: switching quality");
    session.selected_quality = quality.to_string();
    self.state = PlayerState::LoadingStream;
    Some(PlayerRequest::Stream { generation: self.generation, video_id: session.video.id.clone(), quality: quality.to_string() })
  }

  /// Next quality in the offered list after the selected one, wrapping.
  pub fn next_quality(&self) -> Option<String> {
    let session = self.session.as_ref()?;
    if session.qualities.is_empty() {
      return None;
    }
    let idx = session.qualities.iter().position(|q| *q == session.selected_quality).map_or(0, |i| i + 1);
    Some(session.qualities[idx % session.qualities.len()].clone())
  }

  /// End the session. Outstanding replies become stale.
  pub fn close(&mut self) {
    self.generation += 1;
    self.session = None;
    self.fallback = None;
    self.state = PlayerState::Closed;
  }

  pub fn apply(&mut self, reply: PlayerReply) -> PlayerUpdate {
    if reply.generation() != self.generation {
      debug!(reply = reply.generation(), current = self.generation, "player: discarding stale reply");
      return PlayerUpdate::Stale;
    }
    let Some(session) = self.session.as_mut() else {
      return PlayerUpdate::Stale;
    };

    match reply {
      PlayerReply::Qualities { result, .. } => {
        if self.state != PlayerState::DiscoveringQualities {
          return PlayerUpdate::Stale;
        }
        match result {
          Ok(list) => {
            session.qualities = if list.is_empty() { vec![self.default_quality.clone()] } else { list };
            session.selected_quality = session.qualities[0].clone();
            self.state = PlayerState::LoadingStream;
            PlayerUpdate::Fetch(PlayerRequest::Stream {
              generation: self.generation,
              video_id: session.video.id.clone(),
              quality: session.selected_quality.clone(),
            })
          }
          Err(error) => self.abandon(error),
        }
      }
      PlayerReply::Stream { quality, result, .. } => {
        if self.state != PlayerState::LoadingStream {
          return PlayerUpdate::Stale;
        }
        match (result, self.fallback.take()) {
          (Ok(url), fallback) => {
            session.selected_quality = quality.clone();
            session.stream_url = Some(url.clone());
            self.state = PlayerState::Ready;
            if fallback.is_some() {
              PlayerUpdate::Switched { quality, stream_url: url }
            } else {
              PlayerUpdate::Opened { title: session.video.title.clone(), quality, stream_url: url }
            }
          }
          (Err(error), Some((prev_quality, prev_url))) => {
            session.selected_quality = prev_quality.clone();
            session.stream_url = Some(prev_url);
            self.state = PlayerState::Ready;
            PlayerUpdate::SwitchFailed { quality: prev_quality, error }
          }
          (Err(error), None) => self.abandon(error),
        }
      }
    }
  }

  fn abandon(&mut self, error: String) -> PlayerUpdate {
    let title = self.session.take().map(|s| s.video.title).unwrap_or_default();
    self.fallback = None;
    self.state = PlayerState::ClosedWithError(error.clone());
    PlayerUpdate::OpenFailed { title, error }
  }
}
