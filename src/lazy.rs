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

//! An at-most-once-initialized asynchronous value (`§4.9`). The first
//! caller to reach `value()` runs the factory; every concurrent and
//! subsequent caller attaches to that same in-flight (or already-resolved)
//! outcome, success or failure alike.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::Notify;

use crate::error::SyncError;

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send>>;
type Factory<T> = Box<dyn FnOnce() -> BoxFuture<T> + Send>;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum Phase {
  Uninitialized,
  Running,
  Done,
  Disposed,
}

struct Inner<T> {
  phase: Phase,
  factory: Option<Factory<T>>,
}

/// A value computed at most once by an async factory, shared by every
/// clone of this handle.
pub struct Lazy<T> {
  inner: Arc<Mutex<Inner<T>>>,
  slot: Arc<OnceLock<Result<T, SyncError>>>,
  notify: Arc<Notify>,
}

impl<T> Clone for Lazy<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      slot: self.slot.clone(),
      notify: self.notify.clone(),
    }
  }
}

impl<T> std::fmt::Debug for Lazy<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Lazy").field("phase", &self.inner.lock().unwrap().phase).finish()
  }
}

impl<T> Lazy<T>
where
  T: Clone + Send + Sync + 'static,
{
  /// Wraps `factory`, which will be invoked exactly once, the first time
  /// any clone's [`Self::value`] is awaited.
  pub fn new<F, Fut>(factory: F) -> Self
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
  {
    let boxed: Factory<T> = Box::new(move || Box::pin(factory()));
    Self {
      inner: Arc::new(Mutex::new(Inner {
        phase: Phase::Uninitialized,
        factory: Some(boxed),
      })),
      slot: Arc::new(OnceLock::new()),
      notify: Arc::new(Notify::new()),
    }
  }

  /// Resolves to the factory's output. Every observer — concurrent or
  /// later — receives the same terminal outcome; a failing factory's
  /// error is wrapped as [`SyncError::FactoryFailure`] and replayed
  /// verbatim to each observer without retrying.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::FactoryFailure`]
  /// if the factory failed (sticky, for every observer).
  pub async fn value(&self) -> Result<T, SyncError> {
    let factory_to_run = {
      let mut inner = self.inner.lock().unwrap();
      match inner.phase {
        Phase::Disposed => {
          tracing::debug!("value() on a disposed lazy value");
          return Err(SyncError::Disposed);
        }
        Phase::Done => None,
        Phase::Running => None,
        Phase::Uninitialized => {
          inner.phase = Phase::Running;
          Some(inner.factory.take().expect("uninitialized phase always holds its factory"))
        }
      }
    };

    let Some(factory) = factory_to_run else {
      return self.await_resolution().await;
    };

    let result = factory().await.map_err(|err| SyncError::FactoryFailure(Arc::new(err)));
    if let Err(err) = &result {
      tracing::warn!(%err, "lazy factory failed; sticky for every observer");
    }
    let _ = self.slot.set(result.clone());
    {
      let mut inner = self.inner.lock().unwrap();
      if inner.phase == Phase::Running {
        inner.phase = Phase::Done;
      }
    }
    self.notify.notify_waiters();
    result
  }

  async fn await_resolution(&self) -> Result<T, SyncError> {
    loop {
      if let Some(result) = self.slot.get() {
        return result.clone();
      }
      // `notify_waiters` only wakes futures already registered as waiting,
      // unlike `notify_one` it stores no permit for a future poller — so
      // the registration (`enable`) must happen before the slot is
      // re-checked, not after, or a `set` + `notify_waiters` landing in
      // between would be missed forever.
      let notified = self.notify.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();
      if let Some(result) = self.slot.get() {
        return result.clone();
      }
      notified.await;
    }
  }

  /// Whether the factory has run to completion (successfully or not).
  #[must_use]
  pub fn is_resolved(&self) -> bool { self.slot.get().is_some() }

  /// Transitions to a terminal invalidated state. Further [`Self::value`]
  /// calls fail with [`SyncError::Disposed`]; this does not affect a
  /// factory already in flight, whose result is simply discarded.
  pub fn dispose(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.phase = Phase::Disposed;
    inner.factory = None;
  }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.inner.lock().unwrap().phase == Phase::Disposed }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  use super::*;
  use pretty_assertions::assert_eq;

  #[tokio::test]
  async fn factory_runs_exactly_once_across_concurrent_callers() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let lazy: Lazy<i32> = Lazy::new(move || {
      let calls = calls_clone.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(7)
      }
    });

    let mut tasks = Vec::new();
    for _ in 0..5 {
      let lazy = lazy.clone();
      tasks.push(tokio::spawn(async move { lazy.value().await }));
    }
    for task in tasks {
      assert_eq!(task.await.unwrap().unwrap(), 7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn failure_is_sticky_and_replayed_to_every_observer() {
    let lazy: Lazy<i32> = Lazy::new(|| async { Err(SyncError::State("nope".into())) });
    let first = lazy.value().await;
    let second = lazy.value().await;
    assert!(matches!(first, Err(SyncError::FactoryFailure(_))));
    assert!(matches!(second, Err(SyncError::FactoryFailure(_))));
  }

  #[tokio::test]
  async fn dispose_rejects_further_access() {
    let lazy: Lazy<i32> = Lazy::new(|| async { Ok(1) });
    lazy.dispose();
    assert!(matches!(lazy.value().await, Err(SyncError::Disposed)));
  }
}
