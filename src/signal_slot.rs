//! Single-slot mailbox: at most one value is ever pending, a newer write replaces an unconsumed
//! older one, and the one receiver blocks until something is there to take.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

struct Shared<T> {
  slot: Mutex<Option<T>>,
  notify: Notify,
}

impl<T> Shared<T> {
  fn slot(&self) -> MutexGuard<'_, Option<T>> {
    // Nothing can be left half-written in an Option, so a poisoned lock is still usable.
    self.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

pub fn channel<T>() -> (SignalSender<T>, SignalReceiver<T>) {
  let shared = Arc::new(Shared {
    slot: Mutex::new(None),
    notify: Notify::new(),
  });
  (SignalSender { shared: shared.clone() }, SignalReceiver { shared })
}

pub struct SignalSender<T> {
  shared: Arc<Shared<T>>,
}

impl<T> Clone for SignalSender<T> {
  fn clone(&self) -> Self {
    Self { shared: self.shared.clone() }
  }
}

impl<T> SignalSender<T> {
  /// Overwrites whatever is pending and wakes the receiver.  Returns the value that was
  /// discarded, if the receiver hadn't taken it yet.
  pub fn signal(&self, value: T) -> Option<T> {
    let overwritten = self.shared.slot().replace(value);
    self.shared.notify.notify_one();
    overwritten
  }
}

pub struct SignalReceiver<T> {
  shared: Arc<Shared<T>>,
}

impl<T> SignalReceiver<T> {
  pub async fn wait(&mut self) -> T {
    loop {
      if let Some(value) = self.try_take() {
        return value;
      }
      // A signal landing between the take above and this await leaves a permit behind, so it
      // can't be missed.  Stale permits just cost one extra trip around the loop.
      self.shared.notify.notified().await;
    }
  }

  pub fn try_take(&mut self) -> Option<T> {
    self.shared.slot().take()
  }
}

#[cfg(test)]
mod tests {
  use futures::FutureExt;
  use tokio::time::{Duration, timeout};

  use super::*;

  #[tokio::test]
  async fn test_newer_signal_overwrites_pending() {
    let (tx, mut rx) = channel();
    assert_eq!(tx.signal(1), None);
    assert_eq!(tx.signal(0), Some(1));

    assert_eq!(rx.wait().await, 0);
    assert_eq!(rx.try_take(), None);
  }

  #[tokio::test]
  async fn test_value_is_consumed_exactly_once() {
    let (tx, mut rx) = channel();
    tx.signal("push");
    assert_eq!(rx.try_take(), Some("push"));
    assert_eq!(rx.try_take(), None);
    assert!(rx.wait().now_or_never().is_none());
  }

  #[tokio::test]
  async fn test_wait_blocks_until_signalled() {
    let (tx, mut rx) = channel();
    let waiter = tokio::spawn(async move { rx.wait().await });

    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    tx.signal(7u32);
    assert_eq!(waiter.await.unwrap(), 7);
  }

  #[tokio::test]
  async fn test_cloned_senders_share_one_slot() {
    let (tx, mut rx) = channel();
    let other_tx = tx.clone();
    tx.signal(1);
    assert_eq!(other_tx.signal(0), Some(1));
    assert_eq!(rx.wait().await, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_wakeup_does_not_yield_phantom_value() {
    let (tx, mut rx) = channel();
    tx.signal(1);
    assert_eq!(rx.try_take(), Some(1));

    // The permit from the signal above is still stored; wait() must go back to sleep.
    let result = timeout(Duration::from_secs(5), rx.wait()).await;
    assert!(result.is_err());
  }
}
