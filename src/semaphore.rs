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

//! A counting semaphore: `current` tokens available out of a fixed `max`.
//! Every other L2 primitive in this crate (mutex, RW-lock, queue) is built
//! by composing one or two of these rather than re-deriving the waiter
//! discipline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::kernel::{park, park_timeout, WaiterQueue};

struct Inner {
  current: u32,
  max: u32,
  queue: WaiterQueue<()>,
}

/// A bounded, FIFO-fair counting semaphore. Cheaply [`Clone`]-able: clones
/// share the same underlying state, which is how guard types elsewhere in
/// this crate (`MutexGuard`, `ReadGuard`, `WriteGuard`) hold a live
/// back-reference to the primitive they must release into.
#[derive(Clone)]
pub struct Semaphore {
  inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for Semaphore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let inner = self.inner.lock().unwrap();
    f.debug_struct("Semaphore")
      .field("current", &inner.current)
      .field("max", &inner.max)
      .finish()
  }
}

impl Semaphore {
  /// Creates a semaphore with `initial` tokens available, up to `max`.
  ///
  /// # Errors
  /// Returns [`SyncError::OutOfRange`] if `max < 1` or `initial > max`.
  pub fn new(initial: u32, max: u32) -> Result<Self, SyncError> {
    if max < 1 {
      tracing::warn!(max, "semaphore constructed with max < 1");
      return Err(SyncError::OutOfRange("semaphore max must be at least 1".into()));
    }
    if initial > max {
      tracing::warn!(initial, max, "semaphore constructed with initial > max");
      return Err(SyncError::OutOfRange("semaphore initial must not exceed max".into()));
    }
    Ok(Self {
      inner: Arc::new(Mutex::new(Inner {
        current: initial,
        max,
        queue: WaiterQueue::new(),
      })),
    })
  }

  /// The number of tokens currently available without suspending.
  #[must_use]
  pub fn current(&self) -> u32 { self.inner.lock().unwrap().current }

  /// The configured upper bound.
  #[must_use]
  pub fn max(&self) -> u32 { self.inner.lock().unwrap().max }

  /// Acquires one token, suspending until one is available or `cancel`
  /// fires.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if this semaphore has been disposed.
  /// [`SyncError::Cancelled`] if `cancel` fires (or was already fired)
  /// before a token became available.
  pub async fn wait(&self, cancel: Option<&CancelToken>) -> Result<(), SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if inner.queue.is_disposed() {
        tracing::debug!("wait() on a disposed semaphore");
        return Err(SyncError::Disposed);
      }
      if inner.current > 0 {
        inner.current -= 1;
        return Ok(());
      }
      inner.queue.enqueue()?
    };
    park(waiter, cancel).await
  }

  /// As [`Self::wait`], but gives up after `timeout` elapses. Resolves to
  /// `Ok(true)` on success, `Ok(false)` on timeout or cancellation.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if this semaphore has been disposed.
  pub async fn wait_timeout(&self, timeout: Duration, cancel: Option<&CancelToken>) -> Result<bool, SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if inner.queue.is_disposed() {
        tracing::debug!("wait_timeout() on a disposed semaphore");
        return Err(SyncError::Disposed);
      }
      if inner.current > 0 {
        inner.current -= 1;
        return Ok(true);
      }
      inner.queue.enqueue()?
    };
    Ok(park_timeout(waiter, timeout, cancel).await.is_some())
  }

  /// Releases `n` tokens, handing each directly to the longest-waiting
  /// non-cancelled waiter if one exists, or else incrementing `current`.
  ///
  /// # Errors
  /// [`SyncError::SemaphoreFull`] if this would push `current` above `max`.
  /// [`SyncError::Disposed`] if this semaphore has been disposed.
  pub fn release(&self, n: u32) -> Result<(), SyncError> {
    let mut inner = self.inner.lock().unwrap();
    if inner.queue.is_disposed() {
      tracing::debug!("release() on a disposed semaphore");
      return Err(SyncError::Disposed);
    }
    for _ in 0..n {
      if inner.queue.release_one(()).is_ok() {
        continue;
      }
      if inner.current >= inner.max {
        tracing::warn!(current = inner.current, max = inner.max, "release() would exceed semaphore max");
        return Err(SyncError::SemaphoreFull);
      }
      inner.current += 1;
    }
    Ok(())
  }

  /// Cancels every resident waiter and marks this semaphore disposed.
  /// Idempotent.
  pub fn dispose(&self) { self.inner.lock().unwrap().queue.dispose(); }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.inner.lock().unwrap().queue.is_disposed() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use test_case::test_case;

  #[test_case(0, 0; "max below one")]
  #[test_case(2, 1; "initial above max")]
  fn construction_rejects_invalid_bounds(initial: u32, max: u32) {
    assert!(matches!(Semaphore::new(initial, max), Err(SyncError::OutOfRange(_))));
  }

  #[tokio::test]
  async fn fast_path_acquires_without_suspending() {
    let sem = Semaphore::new(1, 1).unwrap();
    sem.wait(None).await.unwrap();
    assert_eq!(sem.current(), 0);
  }

  #[tokio::test]
  async fn release_beyond_max_fails() {
    let sem = Semaphore::new(1, 1).unwrap();
    assert!(matches!(sem.release(1), Err(SyncError::SemaphoreFull)));
  }

  #[tokio::test]
  async fn fifo_fairness_among_waiters() {
    let sem = Semaphore::new(0, 3).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = Vec::new();
    for id in 0..3 {
      let sem = sem.clone();
      let order = order.clone();
      tasks.push(tokio::spawn(async move {
        sem.wait(None).await.unwrap();
        order.lock().unwrap().push(id);
      }));
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    sem.release(2).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*order.lock().unwrap(), vec![0, 1]);
    assert_eq!(sem.current(), 0);
    tasks[2].abort();
  }

  #[tokio::test]
  async fn cancelled_waiter_does_not_consume_a_token() {
    let sem = Semaphore::new(0, 1).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = sem.wait(Some(&cancel)).await;
    assert!(matches!(result, Err(SyncError::Cancelled)));
    sem.release(1).unwrap();
    assert_eq!(sem.current(), 1);
  }

  #[tokio::test]
  async fn wait_timeout_resolves_false_on_deadline() {
    let sem = Semaphore::new(0, 1).unwrap();
    let acquired = sem.wait_timeout(Duration::from_millis(10), None).await.unwrap();
    assert!(!acquired);
  }

  #[tokio::test]
  async fn dispose_cancels_residents_and_blocks_new_waits() {
    let sem = Semaphore::new(0, 1).unwrap();
    let waiting = {
      let sem = sem.clone();
      tokio::spawn(async move { sem.wait(None).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    sem.dispose();
    let result = waiting.await.unwrap();
    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(matches!(sem.wait(None).await, Err(SyncError::Disposed)));
  }
}
