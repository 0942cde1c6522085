//! Id-keyed deadlines.
//!
//! Each scheduled key owns exactly one deadline. Rescheduling replaces it,
//! cancelling removes it, and `drain_due` hands back every key whose deadline
//! has passed. Callers drive time explicitly, so expiry happens on the UI tick
//! and tests can pick arbitrary instants.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

#[derive(Debug)]
pub struct Deadlines<K> {
  due: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Deadlines<K> {
  pub fn new() -> Self {
    Self { due: HashMap::new() }
  }

  /// Schedule `key` to fire at `at`, replacing any pending deadline for it.
  pub fn schedule(&mut self, key: K, at: Instant) {
    self.due.insert(key, at);
  }

  /// Cancel the pending deadline for `key`. Returns whether one existed.
  pub fn cancel(&mut self, key: &K) -> bool {
    self.due.remove(key).is_some()
  }

  pub fn is_pending(&self, key: &K) -> bool {
    self.due.contains_key(key)
  }

  /// Remove and return every key whose deadline is at or before `now`,
  /// earliest first.
  pub fn drain_due(&mut self, now: Instant) -> Vec<K> {
    let mut fired: Vec<(K, Instant)> =
      self.due.iter().filter(|(_, at)| **at <= now).map(|(k, at)| (k.clone(), *at)).collect();
    fired.sort_by_key(|(_, at)| *at);
    for (key, _) in &fired {
      self.due.remove(key);
    }
    fired.into_iter().map(|(k, _)| k).collect()
  }

  pub fn len(&self) -> usize {
    self.due.len()
  }
}

impl<K: Eq + Hash + Clone> Default for Deadlines<K> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn fires_at_deadline_not_before() {
    let t0 = Instant::now();
    let mut d = Deadlines::new();
    d.schedule(1u64, t0 + Duration::from_millis(100));
    assert!(d.drain_due(t0 + Duration::from_millis(99)).is_empty());
    assert_eq!(d.drain_due(t0 + Duration::from_millis(100)), vec![1]);
    assert_eq!(d.len(), 0);
  }

  #[test]
  fn cancel_prevents_firing() {
    let t0 = Instant::now();
    let mut d = Deadlines::new();
    d.schedule("a", t0);
    assert!(d.cancel(&"a"));
    assert!(!d.cancel(&"a"));
    assert!(d.drain_due(t0 + Duration::from_secs(10)).is_empty());
  }

  #[test]
  fn reschedule_replaces_deadline() {
    let t0 = Instant::now();
    let mut d = Deadlines::new();
    d.schedule("a", t0 + Duration::from_secs(1));
    d.schedule("a", t0 + Duration::from_secs(3));
    assert!(d.drain_due(t0 + Duration::from_secs(2)).is_empty());
    assert!(d.is_pending(&"a"));
    assert_eq!(d.drain_due(t0 + Duration::from_secs(3)), vec!["a"]);
  }

  #[test]
  fn drains_earliest_first() {
    let t0 = Instant::now();
    let mut d = Deadlines::new();
    d.schedule(3, t0 + Duration::from_millis(30));
    d.schedule(1, t0 + Duration::from_millis(10));
    d.schedule(2, t0 + Duration::from_millis(20));
    assert_eq!(d.drain_due(t0 + Duration::from_secs(1)), vec![1, 2, 3]);
  }
}
