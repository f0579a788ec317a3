//! Constraint store: one mutable slot holding the active constraint string.
//!
//! Writers call `set`; every live subscription receives each new value once, in the
//! order values were set. Subscriptions unregister themselves when dropped.
//! One store exists per game session (WebSocket connection); it is injected, not global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

#[derive(Default)]
struct Inner {
  current: Option<String>,
  next_id: u64,
  subscribers: HashMap<u64, UnboundedSender<String>>,
}

#[derive(Clone, Default)]
pub struct ConstraintStore {
  inner: Arc<Mutex<Inner>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
  // No code path panics while holding the lock; recover the data if one ever does.
  inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ConstraintStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Latest value, or None when unset.
  pub fn get(&self) -> Option<String> {
    lock(&self.inner).current.clone()
  }

  /// Overwrite the slot and notify each subscriber once. Last write wins.
  pub fn set(&self, value: impl Into<String>) {
    let value = value.into();
    let mut inner = lock(&self.inner);
    inner.current = Some(value.clone());
    // Receivers that went away without unsubscribing are pruned here.
    inner.subscribers.retain(|_, tx| tx.send(value.clone()).is_ok());
    debug!(target: "riddle", constraint = %value, subscribers = inner.subscribers.len(), "Constraint set");
  }

  pub fn subscribe(&self) -> ConstraintSubscription {
    let (tx, rx) = unbounded_channel();
    let mut inner = lock(&self.inner);
    let id = inner.next_id;
    inner.next_id += 1;
    inner.subscribers.insert(id, tx);
    ConstraintSubscription { id, rx, store: Arc::downgrade(&self.inner) }
  }

  #[cfg(test)]
  pub fn subscriber_count(&self) -> usize {
    lock(&self.inner).subscribers.len()
  }
}

/// Handle for receiving constraint changes. Dropping it releases the subscription.
pub struct ConstraintSubscription {
  id: u64,
  rx: UnboundedReceiver<String>,
  store: std::sync::Weak<Mutex<Inner>>,
}

impl ConstraintSubscription {
  /// Next already-delivered value, if any.
  pub fn try_next(&mut self) -> Option<String> {
    self.rx.try_recv().ok()
  }
}

impl Drop for ConstraintSubscription {
  fn drop(&mut self) {
    if let Some(inner) = self.store.upgrade() {
      lock(&inner).subscribers.remove(&self.id);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn last_write_wins() {
    let store = ConstraintStore::new();
    assert_eq!(store.get(), None);
    store.set("difficulty: easy");
    store.set("topic: animals");
    store.set("difficulty: hard");
    assert_eq!(store.get().as_deref(), Some("difficulty: hard"));
  }

  #[test]
  fn subscribers_see_each_value_once_in_order() {
    let store = ConstraintStore::new();
    let mut a = store.subscribe();
    let mut b = store.subscribe();
    store.set("topic: animals");
    store.set("topic: science");

    for sub in [&mut a, &mut b] {
      assert_eq!(sub.try_next().as_deref(), Some("topic: animals"));
      assert_eq!(sub.try_next().as_deref(), Some("topic: science"));
      assert_eq!(sub.try_next(), None);
    }
  }

  #[test]
  fn late_subscriber_does_not_replay_history() {
    let store = ConstraintStore::new();
    store.set("topic: food");
    let mut sub = store.subscribe();
    assert_eq!(sub.try_next(), None);
    assert_eq!(store.get().as_deref(), Some("topic: food"));
  }

  #[test]
  fn dropping_subscription_releases_it() {
    let store = ConstraintStore::new();
    let sub = store.subscribe();
    let _other = store.subscribe();
    assert_eq!(store.subscriber_count(), 2);
    drop(sub);
    assert_eq!(store.subscriber_count(), 1);
    store.set("difficulty: medium");
    assert_eq!(store.subscriber_count(), 1);
  }
}
