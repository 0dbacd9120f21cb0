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

//! A non-reentrant mutex (`§4.4`): a [`Semaphore`] specialized to capacity
//! 1, whose `lock()` returns a scoped guard instead of a bare token.

use std::sync::Mutex as StdMutex;

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::semaphore::Semaphore;

/// A non-reentrant asynchronous mutex. Locking twice from the same task
/// without releasing in between deadlocks that task against itself, as
/// with any non-reentrant lock — this crate makes no attempt to detect it.
#[derive(Clone, Debug)]
pub struct Mutex {
  sem: Semaphore,
}

impl Mutex {
  /// Creates an unlocked mutex.
  #[must_use]
  pub fn new() -> Self {
    Self {
      sem: Semaphore::new(1, 1).expect("capacity-1 semaphore construction cannot fail"),
    }
  }

  /// Acquires the lock, suspending until available or `cancel` fires.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::Cancelled`] if
  /// `cancel` fires first.
  pub async fn lock(&self, cancel: Option<&CancelToken>) -> Result<MutexGuard, SyncError> {
    self.sem.wait(cancel).await?;
    Ok(MutexGuard {
      sem: StdMutex::new(Some(self.sem.clone())),
    })
  }

  /// As [`Self::lock`], bounded by `timeout`. Resolves `Ok(None)` on
  /// timeout or cancellation rather than an error, since the bool-twin
  /// convention here carries the acquired guard instead of a bare `bool`.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed.
  pub async fn lock_timeout(
    &self,
    timeout: std::time::Duration,
    cancel: Option<&CancelToken>,
  ) -> Result<Option<MutexGuard>, SyncError> {
    if self.sem.wait_timeout(timeout, cancel).await? {
      Ok(Some(MutexGuard {
        sem: StdMutex::new(Some(self.sem.clone())),
      }))
    } else {
      Ok(None)
    }
  }

  /// Disposes the underlying semaphore, cancelling any pending `lock`s.
  pub fn dispose(&self) { self.sem.dispose(); }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.sem.is_disposed() }
}

impl Default for Mutex {
  fn default() -> Self { Self::new() }
}

/// A scoped releaser for [`Mutex::lock`]. Releasing is idempotent: the
/// first of an explicit [`Self::release`] or an implicit drop performs the
/// one real release, and anything after that is a documented no-op rather
/// than a [`SyncError::SemaphoreFull`] (the open question in `§9` of the
/// design doc, resolved here in favour of idempotent disposal).
pub struct MutexGuard {
  sem: StdMutex<Option<Semaphore>>,
}

impl std::fmt::Debug for MutexGuard {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let held = self.sem.lock().unwrap().is_some();
    f.debug_struct("MutexGuard").field("held", &held).finish()
  }
}

impl MutexGuard {
  /// Releases the lock now, rather than waiting for drop. Calling this
  /// and then letting the guard drop is safe: the drop observes the slot
  /// already empty and does nothing.
  pub fn release(&self) {
    if let Some(sem) = self.sem.lock().unwrap().take() {
      sem.release(1).expect("a capacity-1 semaphore we just acquired cannot be full");
    }
  }
}

impl Drop for MutexGuard {
  fn drop(&mut self) { self.release(); }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::time::Duration;

  use super::*;
  use pretty_assertions::assert_eq;

  #[tokio::test]
  async fn only_one_guard_live_at_a_time() {
    let mutex = Mutex::new();
    let guard = mutex.lock(None).await.unwrap();
    let second = mutex.lock_timeout(Duration::from_millis(10), None).await.unwrap();
    assert!(second.is_none());
    drop(guard);
    let third = mutex.lock_timeout(Duration::from_millis(10), None).await.unwrap();
    assert!(third.is_some());
  }

  #[tokio::test]
  async fn double_release_is_idempotent_not_semaphore_full() {
    let mutex = Mutex::new();
    let guard = mutex.lock(None).await.unwrap();
    guard.release();
    guard.release();
    drop(guard);
    // A second acquisition must succeed: the semaphore's current() never
    // exceeded max because of the double release.
    mutex.lock(None).await.unwrap();
  }

  #[tokio::test]
  async fn contended_lock_serializes_in_fifo_order() {
    let mutex = Mutex::new();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let guard = mutex.lock(None).await.unwrap();
    let mut tasks = Vec::new();
    for id in 0..2 {
      let mutex = mutex.clone();
      let order = order.clone();
      tasks.push(tokio::spawn(async move {
        let _guard = mutex.lock(None).await.unwrap();
        order.lock().unwrap().push(id);
      }));
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    drop(guard);
    for task in tasks {
      task.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1]);
  }
}
