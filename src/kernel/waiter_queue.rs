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

//! The FIFO of pending suspensions shared by every primitive in this crate.
//! Every primitive embeds one `WaiterQueue<T>` inside its own
//! `std::sync::Mutex<Inner>` — the queue itself holds no lock of its own,
//! so a primitive can mutate its domain counters (a semaphore's `current`,
//! a queue's item storage) and the waiter list atomically, under one lock,
//! in one critical section that never awaits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::SyncError;
use crate::kernel::waiter::{Waiter, CANCELLED, FULFILLED, PENDING};

struct Entry<T> {
  #[allow(dead_code)]
  id: u64,
  state: Arc<AtomicU8>,
  sender: Option<oneshot::Sender<T>>,
}

/// Owns the FIFO order and the disposed flag; nothing else. `T` is the
/// payload type handed to a released waiter.
pub(crate) struct WaiterQueue<T> {
  entries: VecDeque<Entry<T>>,
  disposed: bool,
  next_id: u64,
}

impl<T> WaiterQueue<T> {
  pub(crate) fn new() -> Self {
    Self {
      entries: VecDeque::new(),
      disposed: false,
      next_id: 0,
    }
  }

  pub(crate) fn is_disposed(&self) -> bool { self.disposed }

  /// Registers a new suspension at the tail. Fails with `Disposed` if this
  /// queue has already been torn down.
  pub(crate) fn enqueue(&mut self) -> Result<Waiter<T>, SyncError> {
    if self.disposed {
      tracing::debug!("enqueue on a disposed waiter queue");
      return Err(SyncError::Disposed);
    }
    let (sender, receiver) = oneshot::channel();
    let state = Arc::new(AtomicU8::new(PENDING));
    self.next_id = self.next_id.wrapping_add(1);
    let id = self.next_id;
    self.entries.push_back(Entry {
      id,
      state: state.clone(),
      sender: Some(sender),
    });
    tracing::trace!(waiter_id = id, queue_len = self.entries.len(), "waiter registered");
    Ok(Waiter { id, state, receiver })
  }

  /// Hands `payload` directly to the head non-terminal waiter, skipping
  /// (and discarding) any already-cancelled entries in front of it. Returns
  /// the payload back to the caller if no waiter was available to take it,
  /// so the caller can fall back to incrementing its own counter.
  pub(crate) fn release_one(&mut self, payload: T) -> Result<(), T> {
    while let Some(mut entry) = self.entries.pop_front() {
      match entry
        .state
        .compare_exchange(PENDING, FULFILLED, Ordering::SeqCst, Ordering::SeqCst)
      {
        Ok(_) => {
          // A dropped receiver (the caller gave up without a CancelToken,
          // which cannot happen today, or a bug elsewhere) is not our
          // problem to report; the payload is simply lost with it.
          if let Some(sender) = entry.sender.take() {
            let _ = sender.send(payload);
          }
          tracing::trace!(waiter_id = entry.id, "waiter released");
          return Ok(());
        }
        Err(_) => {
          // Already cancelled or (impossible here) fulfilled; tombstoned.
          tracing::trace!(waiter_id = entry.id, "skipped tombstoned waiter");
        }
      }
    }
    Err(payload)
  }

  /// Hands a payload to every currently non-terminal waiter, in FIFO
  /// order, via `make_payload` (invoked once per release).
  pub(crate) fn release_all(&mut self, mut make_payload: impl FnMut() -> T) {
    while self.release_one(make_payload()).is_ok() {}
  }

  /// True iff at least one non-terminal waiter is present. Does not
  /// compact; cancelled entries are skipped by the scan but left in place.
  pub(crate) fn has_waiters(&self) -> bool {
    self
      .entries
      .iter()
      .any(|entry| entry.state.load(Ordering::SeqCst) == PENDING)
  }

  /// Cancels every resident and marks this queue disposed; subsequent
  /// `enqueue` calls fail with `Disposed`. Idempotent.
  pub(crate) fn dispose(&mut self) {
    if self.disposed {
      tracing::trace!("dispose on an already-disposed waiter queue");
      return;
    }
    self.disposed = true;
    let resident = self.entries.len();
    for entry in self.entries.drain(..) {
      let _ = entry
        .state
        .compare_exchange(PENDING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst);
      // `entry` drops here: its sender (if still held) drops with it,
      // which is exactly what wakes a waiter parked with no CancelToken.
    }
    tracing::debug!(resident, "waiter queue disposed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn release_one_returns_payload_when_queue_empty() {
    let mut queue = WaiterQueue::<u32>::new();
    assert_eq!(queue.release_one(5), Err(5));
  }

  #[tokio::test]
  async fn fifo_order_is_preserved_across_releases() {
    let mut queue = WaiterQueue::<u32>::new();
    let a = queue.enqueue().unwrap();
    let b = queue.enqueue().unwrap();
    queue.release_one(1).unwrap();
    queue.release_one(2).unwrap();
    assert_eq!(a.receiver.await.unwrap(), 1);
    assert_eq!(b.receiver.await.unwrap(), 2);
  }

  #[test]
  fn dispose_is_idempotent_and_blocks_enqueue() {
    let mut queue = WaiterQueue::<u32>::new();
    let _waiter = queue.enqueue().unwrap();
    queue.dispose();
    queue.dispose();
    assert!(queue.is_disposed());
    assert!(matches!(queue.enqueue(), Err(SyncError::Disposed)));
  }

  #[tokio::test]
  async fn dispose_wakes_resident_waiters_as_cancelled() {
    let mut queue = WaiterQueue::<u32>::new();
    let waiter = queue.enqueue().unwrap();
    queue.dispose();
    assert!(waiter.receiver.await.is_err());
  }

  #[test]
  fn has_waiters_reflects_only_pending_entries() {
    let mut queue = WaiterQueue::<u32>::new();
    assert!(!queue.has_waiters());
    let _waiter = queue.enqueue().unwrap();
    assert!(queue.has_waiters());
  }
}
