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

//! A reader/writer lock (`§4.5`) built from two capacity-1 semaphores: an
//! `entry_lock` serializing reader-count mutation and the first reader's
//! (possibly suspending) acquisition of the writer token, and a
//! `write_lock` that the RW-lock holds on readers' behalf whenever
//! `readers > 0`.

use std::sync::{Arc, Mutex};

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::semaphore::Semaphore;

#[derive(Debug)]
struct Inner {
  readers: Mutex<u32>,
}

/// Any number of concurrent readers, or one exclusive writer, never both.
#[derive(Clone, Debug)]
pub struct RwLock {
  inner: Arc<Inner>,
  entry_lock: Semaphore,
  write_lock: Semaphore,
}

impl RwLock {
  /// Creates an unlocked RW-lock.
  #[must_use]
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Inner { readers: Mutex::new(0) }),
      entry_lock: Semaphore::new(1, 1).expect("capacity-1 semaphore construction cannot fail"),
      write_lock: Semaphore::new(1, 1).expect("capacity-1 semaphore construction cannot fail"),
    }
  }

  /// The number of readers currently holding the lock. Racy the instant it
  /// is read under contention; intended for diagnostics.
  #[must_use]
  pub fn reader_count(&self) -> u32 { *self.inner.readers.lock().unwrap() }

  /// Acquires a reader slot. If this is the transition from zero to one
  /// concurrent reader, also (suspendingly) acquires the writer token on
  /// behalf of every reader until the last one releases.
  ///
  /// If cancelled while that first-reader writer-token wait is in flight,
  /// the reader count is rolled back to what it was before this call,
  /// before the cancellation is surfaced to the caller — so a failed
  /// `acquire_reader` leaves `reader_count()` exactly as it found it.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::Cancelled`] if
  /// `cancel` fires before the lock (and, for the first reader, the
  /// writer token) is acquired.
  pub async fn acquire_reader(&self, cancel: Option<&CancelToken>) -> Result<ReadGuard, SyncError> {
    self.entry_lock.wait(cancel).await?;
    let is_first = {
      let mut readers = self.inner.readers.lock().unwrap();
      *readers += 1;
      *readers == 1
    };
    let outcome = if is_first {
      let mut rollback = FirstReaderRollback {
        readers: &self.inner.readers,
        armed: true,
      };
      let result = self.write_lock.wait(cancel).await;
      if result.is_ok() {
        rollback.armed = false;
      }
      result
    } else {
      Ok(())
    };
    // Always release the entry token before surfacing either outcome: the
    // reader-count rollback (if any) has already happened by the time
    // `outcome` is inspected, since `FirstReaderRollback::drop` ran above.
    let _ = self.entry_lock.release(1);
    outcome?;
    Ok(ReadGuard { lock: self.clone() })
  }

  /// Acquires the exclusive writer token, suspending until no reader or
  /// writer holds it.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::Cancelled`] if
  /// `cancel` fires first.
  pub async fn acquire_writer(&self, cancel: Option<&CancelToken>) -> Result<WriteGuard, SyncError> {
    self.write_lock.wait(cancel).await?;
    Ok(WriteGuard { lock: self.clone() })
  }

  fn release_reader(&self) {
    let became_zero = {
      let mut readers = self.inner.readers.lock().unwrap();
      *readers -= 1;
      *readers == 0
    };
    if became_zero {
      let _ = self.write_lock.release(1);
    }
  }

  fn release_writer(&self) { let _ = self.write_lock.release(1); }

  /// Disposes both underlying semaphores, cancelling any pending
  /// `acquire_reader`/`acquire_writer`.
  pub fn dispose(&self) {
    self.entry_lock.dispose();
    self.write_lock.dispose();
  }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.entry_lock.is_disposed() || self.write_lock.is_disposed() }
}

impl Default for RwLock {
  fn default() -> Self { Self::new() }
}

/// Decrements the shared reader count on drop unless disarmed — the
/// mechanism that makes the cancelled-first-reader rollback in
/// [`RwLock::acquire_reader`] happen even across an early return via `?`.
struct FirstReaderRollback<'a> {
  readers: &'a Mutex<u32>,
  armed: bool,
}

impl Drop for FirstReaderRollback<'_> {
  fn drop(&mut self) {
    if self.armed {
      *self.readers.lock().unwrap() -= 1;
    }
  }
}

/// A scoped reader releaser. Release is synchronous and never suspends:
/// it only ever touches the plain reader-count lock and, for the last
/// reader out, performs a non-suspending semaphore release.
pub struct ReadGuard {
  lock: RwLock,
}

impl std::fmt::Debug for ReadGuard {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ReadGuard").finish()
  }
}

impl Drop for ReadGuard {
  fn drop(&mut self) { self.lock.release_reader(); }
}

/// A scoped writer releaser.
pub struct WriteGuard {
  lock: RwLock,
}

impl std::fmt::Debug for WriteGuard {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WriteGuard").finish()
  }
}

impl Drop for WriteGuard {
  fn drop(&mut self) { self.lock.release_writer(); }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use pretty_assertions::assert_eq;

  #[tokio::test]
  async fn concurrent_readers_do_not_exclude_each_other() {
    let lock = RwLock::new();
    let r1 = lock.acquire_reader(None).await.unwrap();
    let r2 = lock.acquire_reader(None).await.unwrap();
    assert_eq!(lock.reader_count(), 2);
    drop(r1);
    drop(r2);
    assert_eq!(lock.reader_count(), 0);
  }

  #[tokio::test]
  async fn writer_excludes_readers() {
    let lock = RwLock::new();
    let writer = lock.acquire_writer(None).await.unwrap();
    let cancel = CancelToken::new();
    let reader_lock = lock.clone();
    let cancel_clone = cancel.clone();
    let reader = tokio::spawn(async move { reader_lock.acquire_reader(Some(&cancel_clone)).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();
    let result = reader.await.unwrap();
    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(lock.reader_count(), 0);
    drop(writer);
  }

  #[tokio::test]
  async fn reader_excludes_writer() {
    let lock = RwLock::new();
    let reader = lock.acquire_reader(None).await.unwrap();
    let lock_clone = lock.clone();
    let writer_attempt =
      tokio::time::timeout(Duration::from_millis(20), lock_clone.acquire_writer(None)).await;
    assert!(writer_attempt.is_err(), "writer must not acquire while a reader holds the lock");
    drop(reader);
    lock.acquire_writer(None).await.unwrap();
  }
}
