//! Time-expiring notification feed.
//!
//! Every user-facing event lands here. Notifications live until they are
//! dismissed or their lifetime runs out, whichever comes first.

use std::time::{Duration, Instant};

use crate::timers::Deadlines;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Success,
  Error,
  Info,
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub id: u64,
  pub message: String,
  pub severity: Severity,
  pub created_at: Instant,
}

pub struct NotificationBus {
  items: Vec<Notification>,
  expiry: Deadlines<u64>,
  next_id: u64,
  lifetime: Duration,
}

impl NotificationBus {
  pub fn new(lifetime: Duration) -> Self {
    Self { items: Vec::new(), expiry: Deadlines::new(), next_id: 1, lifetime }
  }

  /// Append a notification stamped with the current time.
  pub fn push(&mut self, message: impl Into<String>, severity: Severity) -> u64 {
    self.push_at(message, severity, Instant::now())
  }

  pub fn push_at(&mut self, message: impl Into<String>, severity: Severity, now: Instant) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push(Notification { id, message: message.into(), severity, created_at: now });
    self.expiry.schedule(id, now + self.lifetime);
    id
  }

  pub fn info(&mut self, message: impl Into<String>) -> u64 {
    self.push(message, Severity::Info)
  }

  pub fn success(&mut self, message: impl Into<String>) -> u64 {
    self.push(message, Severity::Success)
  }

  pub fn error(&mut self, message: impl Into<String>) -> u64 {
    self.push(message, Severity::Error)
  }

  /// Remove a notification now and cancel its pending expiry.
  pub fn dismiss(&mut self, id: u64) -> bool {
    self.expiry.cancel(&id);
    let before = self.items.len();
    self.items.retain(|n| n.id != id);
    self.items.len() != before
  }

  /// Dismiss the most recently pushed notification still visible.
  pub fn dismiss_latest(&mut self) -> bool {
    match self.items.last().map(|n| n.id) {
      Some(id) => self.dismiss(id),
      None => false,
    }
  }

  /// Drop every notification whose lifetime has elapsed at `now`.
  pub fn expire(&mut self, now: Instant) {
    let due = self.expiry.drain_due(now);
    if !due.is_empty() {
      self.items.retain(|n| !due.contains(&n.id));
    }
  }

  /// Notifications in insertion order.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Notification> {
    self.items.iter()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bus() -> NotificationBus {
    NotificationBus::new(Duration::from_millis(5000))
  }

  #[test]
  fn ids_are_unique_and_monotonic() {
    let mut b = bus();
    let t0 = Instant::now();
    let a = b.push_at("a", Severity::Info, t0);
    let c = b.push_at("a", Severity::Info, t0);
    assert!(c > a);
    assert_eq!(b.len(), 2, "no deduplication");
  }

  #[test]
  fn expires_after_exactly_five_seconds() {
    let mut b = bus();
    let t0 = Instant::now();
    b.push_at("hello", Severity::Success, t0);
    b.expire(t0 + Duration::from_millis(4999));
    assert_eq!(b.len(), 1);
    b.expire(t0 + Duration::from_millis(5000));
    assert!(b.is_empty());
  }

  #[test]
  fn dismissed_notification_never_reappears() {
    let mut b = bus();
    let t0 = Instant::now();
    let id = b.push_at("bye", Severity::Error, t0);
    assert!(b.dismiss(id));
    assert!(b.is_empty());
    b.expire(t0 + Duration::from_millis(6000));
    assert!(b.is_empty());
    assert!(!b.dismiss(id));
  }

  #[test]
  fn expiry_only_touches_due_entries() {
    let mut b = bus();
    let t0 = Instant::now();
    b.push_at("first", Severity::Info, t0);
    b.push_at("second", Severity::Info, t0 + Duration::from_secs(2));
    b.expire(t0 + Duration::from_secs(5));
    let left: Vec<&str> = b.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(left, vec!["second"]);
  }

  #[test]
  fn insertion_order_is_kept() {
    let mut b = bus();
    b.info("one");
    b.error("two");
    b.success("three");
    let order: Vec<Severity> = b.iter().map(|n| n.severity).collect();
    assert_eq!(order, vec![Severity::Info, Severity::Error, Severity::Success]);
  }

  #[test]
  fn dismiss_latest_removes_newest() {
    let mut b = bus();
    b.info("old");
    b.info("new");
    assert!(b.dismiss_latest());
    assert_eq!(b.iter().next().map(|n| n.message.as_str()), Some("old"));
  }
}
