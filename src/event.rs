/*
 *   Copyright (c) 2026 The Waitkit Authors
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

//! Manual- and auto-reset latched booleans (`§4.3`). Both share the same
//! underlying waiter queue shape; they differ only in what `set()` does
//! and whether the flag survives a successful `wait()`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::kernel::{park, park_timeout, WaiterQueue};

struct Inner {
  set: bool,
  queue: WaiterQueue<()>,
}

/// A latched boolean that, once `set`, releases every waiter — past and
/// future — until the next `reset()`.
#[derive(Clone)]
pub struct ManualResetEvent {
  inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for ManualResetEvent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ManualResetEvent").field("is_set", &self.is_set()).finish()
  }
}

impl ManualResetEvent {
  /// Creates a new event, initially `set` or not per `initial`.
  #[must_use]
  pub fn new(initial: bool) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        set: initial,
        queue: WaiterQueue::new(),
      })),
    }
  }

  /// Whether the flag is currently set.
  #[must_use]
  pub fn is_set(&self) -> bool { self.inner.lock().unwrap().set }

  /// Sets the flag and releases every currently resident waiter. A no-op
  /// (besides the flag write) if already set.
  pub fn set(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.set = true;
    inner.queue.release_all(|| ());
  }

  /// Clears the flag. Subsequent `wait` calls suspend until the next
  /// `set()`.
  pub fn reset(&self) { self.inner.lock().unwrap().set = false; }

  /// Suspends until `set`, unless already set.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::Cancelled`] if
  /// `cancel` fires first.
  pub async fn wait(&self, cancel: Option<&CancelToken>) -> Result<(), SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if inner.queue.is_disposed() {
        tracing::debug!("wait() on a disposed manual-reset event");
        return Err(SyncError::Disposed);
      }
      if inner.set {
        return Ok(());
      }
      inner.queue.enqueue()?
    };
    park(waiter, cancel).await
  }

  /// As [`Self::wait`], bounded by `timeout`.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed.
  pub async fn wait_timeout(&self, timeout: Duration, cancel: Option<&CancelToken>) -> Result<bool, SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if inner.queue.is_disposed() {
        tracing::debug!("wait_timeout() on a disposed manual-reset event");
        return Err(SyncError::Disposed);
      }
      if inner.set {
        return Ok(true);
      }
      inner.queue.enqueue()?
    };
    Ok(park_timeout(waiter, timeout, cancel).await.is_some())
  }

  /// Cancels every resident waiter and disposes this event. Idempotent.
  pub fn dispose(&self) { self.inner.lock().unwrap().queue.dispose(); }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.inner.lock().unwrap().queue.is_disposed() }
}

/// A latched boolean that wakes at most one waiter per signal: `set()`
/// releases exactly one resident waiter if any are present, otherwise it
/// latches a single pending signal for the next `wait()`.
#[derive(Clone)]
pub struct AutoResetEvent {
  inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for AutoResetEvent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AutoResetEvent").field("is_set", &self.is_set()).finish()
  }
}

impl AutoResetEvent {
  /// Creates a new event, initially `set` or not per `initial`.
  #[must_use]
  pub fn new(initial: bool) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        set: initial,
        queue: WaiterQueue::new(),
      })),
    }
  }

  /// Whether a signal is currently latched (no waiter has consumed it
  /// yet).
  #[must_use]
  pub fn is_set(&self) -> bool { self.inner.lock().unwrap().set }

  /// Signals the event: wakes exactly one resident waiter if present,
  /// otherwise latches the flag for the next `wait()`.
  pub fn set(&self) {
    let mut inner = self.inner.lock().unwrap();
    if inner.queue.release_one(()).is_ok() {
      return;
    }
    inner.set = true;
  }

  /// Suspends until signalled. If a signal is already latched, consumes
  /// it and returns immediately.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::Cancelled`] if
  /// `cancel` fires first.
  pub async fn wait(&self, cancel: Option<&CancelToken>) -> Result<(), SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if inner.queue.is_disposed() {
        tracing::debug!("wait() on a disposed auto-reset event");
        return Err(SyncError::Disposed);
      }
      if inner.set {
        inner.set = false;
        return Ok(());
      }
      inner.queue.enqueue()?
    };
    park(waiter, cancel).await
  }

  /// As [`Self::wait`], bounded by `timeout`.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed.
  pub async fn wait_timeout(&self, timeout: Duration, cancel: Option<&CancelToken>) -> Result<bool, SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if inner.queue.is_disposed() {
        tracing::debug!("wait_timeout() on a disposed auto-reset event");
        return Err(SyncError::Disposed);
      }
      if inner.set {
        inner.set = false;
        return Ok(true);
      }
      inner.queue.enqueue()?
    };
    Ok(park_timeout(waiter, timeout, cancel).await.is_some())
  }

  /// Cancels every resident waiter and disposes this event. Idempotent.
  pub fn dispose(&self) { self.inner.lock().unwrap().queue.dispose(); }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.inner.lock().unwrap().queue.is_disposed() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn manual_reset_releases_all_concurrent_and_subsequent_waiters() {
    let event = ManualResetEvent::new(false);
    let a = {
      let event = event.clone();
      tokio::spawn(async move { event.wait(None).await })
    };
    let b = {
      let event = event.clone();
      tokio::spawn(async move { event.wait(None).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    event.set();
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    // Subsequent wait also succeeds without suspending, until reset.
    event.wait(None).await.unwrap();
    event.reset();
    assert!(!event.is_set());
  }

  #[tokio::test]
  async fn auto_reset_coalesces_to_exactly_the_waiter_count() {
    let event = AutoResetEvent::new(false);
    let w1 = {
      let event = event.clone();
      tokio::spawn(async move { event.wait(None).await })
    };
    let w2 = {
      let event = event.clone();
      tokio::spawn(async move { event.wait(None).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    event.set();
    event.set();
    w1.await.unwrap().unwrap();
    w2.await.unwrap().unwrap();
    assert!(!event.is_set());
  }

  #[tokio::test]
  async fn auto_reset_set_with_no_waiters_latches_one_signal() {
    let event = AutoResetEvent::new(false);
    event.set();
    event.set();
    assert!(event.is_set());
    event.wait(None).await.unwrap();
    assert!(!event.is_set());
  }

  #[tokio::test]
  async fn dispose_cancels_residents() {
    let event = ManualResetEvent::new(false);
    let waiting = {
      let event = event.clone();
      tokio::spawn(async move { event.wait(None).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    event.dispose();
    assert!(matches!(waiting.await.unwrap(), Err(SyncError::Cancelled)));
  }
}
