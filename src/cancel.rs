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

//! The cancellation-handle abstraction every suspending operation in this
//! crate accepts (see `§6` of the design doc). A [`CancelToken`] is
//! cheaply cloneable and may be shared across tasks; triggering it races
//! with whatever it is attached to, and the race is decided atomically by
//! the attached waiter (see [`crate::kernel`]).

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

struct Inner {
  cancelled: Mutex<bool>,
  notify: Notify,
}

/// A cooperative cancellation handle. Cloning shares the same underlying
/// flag: cancelling any clone cancels all of them.
#[derive(Clone)]
pub struct CancelToken {
  inner: Arc<Inner>,
}

impl std::fmt::Debug for CancelToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CancelToken")
      .field("is_cancelled", &self.is_cancelled())
      .finish()
  }
}

impl Default for CancelToken {
  fn default() -> Self { Self::new() }
}

impl CancelToken {
  /// Creates a fresh, not-yet-cancelled token.
  #[must_use]
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Inner {
        cancelled: Mutex::new(false),
        notify: Notify::new(),
      }),
    }
  }

  /// Always `true` for a real token. Exists so callers that pass
  /// `Option<&CancelToken>` through generic code can ask "would cancelling
  /// this actually do anything" without special-casing `None` themselves.
  #[must_use]
  pub fn can_be_cancelled(&self) -> bool { true }

  /// Whether `cancel()` has been called at least once.
  #[must_use]
  pub fn is_cancelled(&self) -> bool { *self.inner.cancelled.lock().unwrap() }

  /// Triggers cancellation. Idempotent: a second call is a no-op.
  pub fn cancel(&self) {
    let mut cancelled = self.inner.cancelled.lock().unwrap();
    if *cancelled {
      return;
    }
    *cancelled = true;
    drop(cancelled);
    self.inner.notify.notify_waiters();
  }

  /// Resolves once this token has been cancelled. Resolves immediately if
  /// it already has been.
  pub async fn cancelled(&self) {
    // `enable()` registers this future as a waiter before we re-check the
    // flag, so a `cancel()` landing between the check and the await is
    // still observed — `notify_waiters` wakes only already-registered
    // waiters, it stores no permit for a future poll the way `notify_one`
    // does.
    let notified = self.inner.notify.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    if self.is_cancelled() {
      return;
    }
    notified.await;
  }

  /// Registers `callback` to run once this token is cancelled. If the
  /// token is already cancelled, `callback` runs synchronously before this
  /// call returns. Otherwise a lightweight task is parked awaiting
  /// cancellation; drop the returned [`Registration`] (or call
  /// [`Registration::dispose`]) once the callback is no longer needed to
  /// avoid leaking that task.
  ///
  /// The kernel itself does not use this — `Waiter::park` races a
  /// `cancelled()` future directly in a `select!` rather than paying for a
  /// task per waiter — but it is part of this crate's public host-capability
  /// surface (`§6`), useful for integrations that need a plain callback.
  pub fn register<F>(&self, callback: F) -> Registration
  where
    F: FnOnce() + Send + 'static,
  {
    if self.is_cancelled() {
      callback();
      return Registration { handle: None };
    }
    let token = self.clone();
    let handle = tokio::spawn(async move {
      token.cancelled().await;
      callback();
    });
    Registration { handle: Some(handle) }
  }
}

/// A handle to a callback registered with [`CancelToken::register`].
/// Dropping it (or calling [`dispose`](Self::dispose)) cancels the
/// callback if it has not already fired.
#[derive(Debug)]
pub struct Registration {
  handle: Option<JoinHandle<()>>,
}

impl Registration {
  /// Tears down the registration. If the callback has not yet run, it
  /// never will.
  pub fn dispose(mut self) { self.take_and_abort(); }

  fn take_and_abort(&mut self) {
    if let Some(handle) = self.handle.take() {
      handle.abort();
    }
  }
}

impl Drop for Registration {
  fn drop(&mut self) { self.take_and_abort(); }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, Ordering};

  use super::*;

  #[tokio::test]
  async fn cancel_is_idempotent_and_observable() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());
    token.cancel();
    token.cancel();
    assert!(token.is_cancelled());
  }

  #[tokio::test]
  async fn cancelled_resolves_immediately_if_already_cancelled() {
    let token = CancelToken::new();
    token.cancel();
    tokio::time::timeout(std::time::Duration::from_millis(50), token.cancelled())
      .await
      .expect("cancelled() should not block once already cancelled");
  }

  #[tokio::test]
  async fn cancelled_wakes_concurrent_waiters() {
    let token = CancelToken::new();
    let waiter_token = token.clone();
    let waiter = tokio::spawn(async move { waiter_token.cancelled().await });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    token.cancel();
    tokio::time::timeout(std::time::Duration::from_millis(100), waiter)
      .await
      .expect("waiter should complete")
      .expect("waiter task should not panic");
  }

  #[tokio::test]
  async fn register_runs_callback_once_on_cancel() {
    let token = CancelToken::new();
    let flag = Arc::new(AtomicBool::new(false));
    let flag_clone = flag.clone();
    let registration = token.register(move || flag_clone.store(true, Ordering::SeqCst));
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(!flag.load(Ordering::SeqCst));
    token.cancel();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(flag.load(Ordering::SeqCst));
    registration.dispose();
  }

  #[tokio::test]
  async fn register_on_already_cancelled_token_runs_synchronously() {
    let token = CancelToken::new();
    token.cancel();
    let flag = Arc::new(AtomicBool::new(false));
    let flag_clone = flag.clone();
    let _registration = token.register(move || flag_clone.store(true, Ordering::SeqCst));
    assert!(flag.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn dropping_registration_aborts_pending_callback() {
    let token = CancelToken::new();
    let flag = Arc::new(AtomicBool::new(false));
    let flag_clone = flag.clone();
    let registration = token.register(move || flag_clone.store(true, Ordering::SeqCst));
    drop(registration);
    token.cancel();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(!flag.load(Ordering::SeqCst));
  }
}
