//! Sequential, throttled download dispatch.
//!
//! One worker task owns the backend handoff calls and processes commands in
//! arrival order, waiting `throttle` after each handoff before starting the
//! next. The UI side keeps a transient in-flight marker per id that clears
//! after a fixed delay, independent of how the transfer actually goes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::timers::Deadlines;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
  pub id: String,
  pub title: String,
  pub resolution: String,
}

#[derive(Debug)]
pub enum DownloadCommand {
  Single(DownloadJob),
  Batch(Vec<DownloadJob>),
}

/// Progress reported by the worker, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
  Dispatching { id: String, title: String },
  HandedOff { id: String, title: String },
  Failed { id: String, title: String, error: String },
  /// A batch ran to the end. `attempted` counts every job, failed or not.
  BatchFinished { attempted: usize },
}

/// Drive `commands` until the sending side is dropped.
pub async fn run_worker(
  backend: Arc<dyn Backend>,
  throttle: Duration,
  mut commands: mpsc::UnboundedReceiver<DownloadCommand>,
  events: mpsc::UnboundedSender<DownloadEvent>,
) {
  let mut last_handoff: Option<tokio::time::Instant> = None;
  while let Some(cmd) = commands.recv().await {
    match cmd {
      DownloadCommand::Single(job) => {
        dispatch(backend.as_ref(), throttle, &mut last_handoff, job, &events).await;
      }
      DownloadCommand::Batch(jobs) => {
        let attempted = jobs.len();
        info!(count = attempted, "download: batch started");
        for job in jobs {
          dispatch(backend.as_ref(), throttle, &mut last_handoff, job, &events).await;
        }
        info!(count = attempted, "download: batch finished");
        let _ = events.send(DownloadEvent::BatchFinished { attempted });
      }
    }
  }
  debug!("download: worker stopped");
}

async fn dispatch(
  backend: &dyn Backend,
  throttle: Duration,
  last_handoff: &mut Option<tokio::time::Instant>,
  job: DownloadJob,
  events: &mpsc::UnboundedSender<DownloadEvent>,
) {
  if let Some(prev) = *last_handoff {
    tokio::time::sleep_until(prev + throttle).await;
  }
  let DownloadJob { id, title, resolution } = job;
  let _ = events.send(DownloadEvent::Dispatching { id: id.clone(), title: title.clone() });

  let event = match backend.trigger_download(&id, &title, &resolution).await {
    Ok(()) => {
      info!(id = %id, "download: handed off");
      DownloadEvent::HandedOff { id, title }
    }
    Err(e) => {
      warn!(id = %id, err = %e, "download: handoff failed");
      DownloadEvent::Failed { id, title, error: e.to_string() }
    }
  };
  *last_handoff = Some(tokio::time::Instant::now());
  let _ = events.send(event);
}

#[derive(Debug, thiserror::Error)]
#[error("download queue is not running")]
pub struct QueueClosed;

/// UI-side handle: the command sender, the ids still waiting on the worker,
/// and the in-flight markers.
pub struct DownloadOrchestrator {
  commands: mpsc::UnboundedSender<DownloadCommand>,
  queued: HashSet<String>,
  in_flight: Deadlines<String>,
  marker: Duration,
}

impl DownloadOrchestrator {
  pub fn new(commands: mpsc::UnboundedSender<DownloadCommand>, marker: Duration) -> Self {
    Self { commands, queued: HashSet::new(), in_flight: Deadlines::new(), marker }
  }

  /// Spawn the worker on the current runtime and return the handle plus the
  /// event stream it reports on.
  pub fn spawn(
    backend: Arc<dyn Backend>,
    throttle: Duration,
    marker: Duration,
  ) -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_worker(backend, throttle, cmd_rx, event_tx));
    (Self::new(cmd_tx, marker), event_rx)
  }

  /// Hand `cmd` to the worker. Its ids count as queued until they settle.
  pub fn enqueue(&mut self, cmd: DownloadCommand) -> Result<(), QueueClosed> {
    let ids: Vec<String> = match &cmd {
      DownloadCommand::Single(job) => vec![job.id.clone()],
      DownloadCommand::Batch(jobs) => jobs.iter().map(|j| j.id.clone()).collect(),
    };
    self.commands.send(cmd).map_err(|_| QueueClosed)?;
    self.queued.extend(ids);
    Ok(())
  }

  /// The worker finished with `id`, successfully or not.
  pub fn settle(&mut self, id: &str) {
    self.queued.remove(id);
  }

  pub fn is_queued(&self, id: &str) -> bool {
    self.queued.contains(id)
  }

  /// Queued for the worker or still showing its in-flight marker.
  pub fn is_busy(&self, id: &str) -> bool {
    self.is_queued(id) || self.is_in_flight(id)
  }

  /// Show `id` as in-flight until `now + marker`.
  pub fn mark_in_flight(&mut self, id: &str, now: Instant) {
    self.in_flight.schedule(id.to_string(), now + self.marker);
  }

  pub fn is_in_flight(&self, id: &str) -> bool {
    self.in_flight.is_pending(&id.to_string())
  }

  pub fn in_flight_count(&self) -> usize {
    self.in_flight.len()
  }

  /// Clear markers whose delay elapsed; returns the cleared ids.
  pub fn expire(&mut self, now: Instant) -> Vec<String> {
    self.in_flight.drain_due(now)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::backend::{BackendError, ChannelListing, ContentType};
  use crate::catalog::Video;
  use async_trait::async_trait;
  use std::sync::Mutex as StdMutex;

  /// Records handoff calls with the (paused) tokio clock; fails listed ids.
  #[derive(Default)]
  pub(crate) struct RecordingBackend {
    pub(crate) calls: StdMutex<Vec<(String, tokio::time::Instant)>>,
    pub(crate) failing: Vec<String>,
  }

  #[async_trait]
  impl Backend for RecordingBackend {
    async fn check_connectivity(&self) -> Result<(), BackendError> {
      Ok(())
    }

    async fn fetch_channel(&self, _: &str, _: ContentType) -> Result<ChannelListing, BackendError> {
      Err(BackendError::Rejected("unused".to_string()))
    }

    async fn stored_videos(&self) -> Result<Vec<Video>, BackendError> {
      Ok(Vec::new())
    }

    async fn trigger_download(&self, id: &str, _title: &str, _resolution: &str) -> Result<(), BackendError> {
      self.calls.lock().unwrap().push((id.to_string(), tokio::time::Instant::now()));
      if self.failing.iter().any(|f| f == id) {
        return Err(BackendError::Handoff("disk full".to_string()));
      }
      Ok(())
    }

    async fn list_qualities(&self, _: &str) -> Result<Vec<String>, BackendError> {
      Ok(Vec::new())
    }

    async fn resolve_stream(&self, _: &str, _: &str) -> Result<String, BackendError> {
      Err(BackendError::Rejected("unused".to_string()))
    }
  }

  fn job(id: &str) -> DownloadJob {
    DownloadJob { id: id.to_string(), title: format!("Title {id}"), resolution: "highest".to_string() }
  }

  async fn run_batch(backend: Arc<RecordingBackend>, jobs: Vec<DownloadJob>) -> Vec<DownloadEvent> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    cmd_tx.send(DownloadCommand::Batch(jobs)).unwrap();
    drop(cmd_tx);
    run_worker(backend, Duration::from_secs(1), cmd_rx, event_tx).await;
    let mut events = Vec::new();
    while let Ok(e) = event_rx.try_recv() {
      events.push(e);
    }
    events
  }

  #[tokio::test(start_paused = true)]
  async fn batch_continues_after_failure() {
    let backend = Arc::new(RecordingBackend { failing: vec!["b".to_string()], ..Default::default() });
    let events = run_batch(Arc::clone(&backend), vec![job("a"), job("b"), job("c")]).await;

    let failures: Vec<&DownloadEvent> = events.iter().filter(|e| matches!(e, DownloadEvent::Failed { .. })).collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], DownloadEvent::Failed { id, .. } if id == "b"));
    assert_eq!(events.last(), Some(&DownloadEvent::BatchFinished { attempted: 3 }));
    assert_eq!(backend.calls.lock().unwrap().len(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn dispatches_are_sequential_and_throttled() {
    let backend = Arc::new(RecordingBackend::default());
    run_batch(Arc::clone(&backend), vec![job("a"), job("b"), job("c")]).await;

    let calls = backend.calls.lock().unwrap();
    let ids: Vec<&str> = calls.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    for pair in calls.windows(2) {
      assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(1));
    }
  }

  #[tokio::test(start_paused = true)]
  async fn event_order_per_item() {
    let backend = Arc::new(RecordingBackend::default());
    let events = run_batch(backend, vec![job("a")]).await;
    assert_eq!(
      events,
      vec![
        DownloadEvent::Dispatching { id: "a".to_string(), title: "Title a".to_string() },
        DownloadEvent::HandedOff { id: "a".to_string(), title: "Title a".to_string() },
        DownloadEvent::BatchFinished { attempted: 1 },
      ]
    );
  }

  #[tokio::test(start_paused = true)]
  async fn throttle_spans_single_dispatches() {
    let backend = Arc::new(RecordingBackend::default());
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    cmd_tx.send(DownloadCommand::Single(job("x"))).unwrap();
    cmd_tx.send(DownloadCommand::Single(job("y"))).unwrap();
    drop(cmd_tx);
    run_worker(Arc::clone(&backend) as Arc<dyn Backend>, Duration::from_secs(1), cmd_rx, event_tx).await;
    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].1 - calls[0].1 >= Duration::from_secs(1));
  }

  #[test]
  fn in_flight_marker_clears_after_delay() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut orch = DownloadOrchestrator::new(tx, Duration::from_secs(2));
    let t0 = Instant::now();
    orch.mark_in_flight("a", t0);
    assert!(orch.is_in_flight("a"));
    assert!(orch.expire(t0 + Duration::from_millis(1999)).is_empty());
    assert_eq!(orch.expire(t0 + Duration::from_secs(2)), vec!["a".to_string()]);
    assert!(!orch.is_in_flight("a"));
  }

  #[test]
  fn enqueue_fails_when_worker_gone() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let mut orch = DownloadOrchestrator::new(tx, Duration::from_secs(2));
    assert!(orch.enqueue(DownloadCommand::Single(job("a"))).is_err());
    assert!(!orch.is_queued("a"));
  }

  #[test]
  fn queued_ids_stay_busy_until_settled() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut orch = DownloadOrchestrator::new(tx, Duration::from_secs(2));
    orch.enqueue(DownloadCommand::Batch(vec![job("a"), job("b")])).unwrap();
    assert!(orch.is_busy("a"));
    assert!(!orch.is_in_flight("a"));
    orch.settle("a");
    assert!(!orch.is_busy("a"));
    assert!(orch.is_queued("b"));
  }
}
