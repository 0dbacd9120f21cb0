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

//! Bounded and unbounded FIFO queues (`§4.8`). Producers hand items
//! directly to a parked consumer when one is present; otherwise items sit
//! in a `VecDeque` until a consumer arrives. Bounded queues additionally
//! suspend producers on a `space` semaphore for backpressure.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::kernel::{park, WaiterQueue};
use crate::semaphore::Semaphore;

struct Inner<T> {
  storage: VecDeque<T>,
  completed: bool,
  dequeuers: WaiterQueue<Result<T, SyncError>>,
}

/// A FIFO queue, optionally capacity-bounded. `T` flows from [`Self::enqueue`]
/// to [`Self::dequeue`] in order; a `dequeue` against an empty queue
/// suspends until an item arrives or the queue is marked [`Self::complete`]d.
pub struct Queue<T> {
  inner: Arc<Mutex<Inner<T>>>,
  space: Option<Semaphore>,
}

impl<T> Clone for Queue<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      space: self.space.clone(),
    }
  }
}

impl<T> std::fmt::Debug for Queue<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let inner = self.inner.lock().unwrap();
    f.debug_struct("Queue")
      .field("len", &inner.storage.len())
      .field("capacity", &self.space.as_ref().map(Semaphore::max))
      .field("completed", &inner.completed)
      .finish()
  }
}

impl<T> Queue<T> {
  /// Creates an unbounded queue: `enqueue` never suspends on space.
  #[must_use]
  pub fn unbounded() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        storage: VecDeque::new(),
        completed: false,
        dequeuers: WaiterQueue::new(),
      })),
      space: None,
    }
  }

  /// Creates a queue bounded to `capacity` items; `enqueue` suspends once
  /// full.
  ///
  /// # Errors
  /// [`SyncError::OutOfRange`] if `capacity < 1`.
  pub fn bounded(capacity: u32) -> Result<Self, SyncError> {
    if capacity < 1 {
      tracing::warn!("bounded queue constructed with capacity < 1");
      return Err(SyncError::OutOfRange("bounded queue capacity must be at least 1".into()));
    }
    Ok(Self {
      inner: Arc::new(Mutex::new(Inner {
        storage: VecDeque::new(),
        completed: false,
        dequeuers: WaiterQueue::new(),
      })),
      space: Some(Semaphore::new(capacity, capacity)?),
    })
  }

  /// Items currently resident (neither yet dequeued nor handed directly to
  /// a parked consumer).
  #[must_use]
  pub fn len(&self) -> usize { self.inner.lock().unwrap().storage.len() }

  /// Whether [`Self::len`] is zero.
  #[must_use]
  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Whether [`Self::complete`] has been called.
  #[must_use]
  pub fn is_completed(&self) -> bool { self.inner.lock().unwrap().completed }

  /// Enqueues `item`. For a bounded queue, suspends until a slot is free.
  ///
  /// # Errors
  /// [`SyncError::State`] if the queue has been [`Self::complete`]d.
  /// [`SyncError::Cancelled`] if `cancel` fires while suspended on space.
  pub async fn enqueue(&self, item: T, cancel: Option<&CancelToken>) -> Result<(), SyncError> {
    {
      let inner = self.inner.lock().unwrap();
      if inner.completed {
        tracing::warn!("enqueue() on a completed queue");
        return Err(SyncError::State("enqueue on a completed queue".into()));
      }
    }
    if let Some(space) = &self.space {
      space.wait(cancel).await?;
    }
    let mut inner = self.inner.lock().unwrap();
    if inner.completed {
      drop(inner);
      if let Some(space) = &self.space {
        let _ = space.release(1);
      }
      tracing::warn!("enqueue() on a queue that completed while suspended on space");
      return Err(SyncError::State("enqueue on a completed queue".into()));
    }
    match inner.dequeuers.release_one(Ok(item)) {
      Ok(()) => {}
      Err(Ok(item)) => inner.storage.push_back(item),
      Err(Err(_)) => unreachable!("a dequeuer waiter is never pre-fulfilled with an error"),
    }
    Ok(())
  }

  /// Dequeues the next item, suspending until one is available.
  ///
  /// # Errors
  /// [`SyncError::State`] ("queue completed") if the queue is empty and
  /// has been [`Self::complete`]d — either already, or while this call
  /// was suspended. [`SyncError::Cancelled`] if `cancel` fires first.
  pub async fn dequeue(&self, cancel: Option<&CancelToken>) -> Result<T, SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if let Some(item) = inner.storage.pop_front() {
        drop(inner);
        if let Some(space) = &self.space {
          let _ = space.release(1);
        }
        return Ok(item);
      }
      if inner.completed {
        tracing::debug!("dequeue() on an empty, completed queue");
        return Err(SyncError::State("queue completed".into()));
      }
      inner.dequeuers.enqueue()?
    };
    let item = park(waiter, cancel).await??;
    if let Some(space) = &self.space {
      let _ = space.release(1);
    }
    Ok(item)
  }

  /// As [`Self::dequeue`], bounded by `timeout`. Resolves `Ok(None)` on
  /// timeout or cancellation.
  ///
  /// # Errors
  /// [`SyncError::State`] ("queue completed") under the same conditions as
  /// [`Self::dequeue`].
  pub async fn dequeue_timeout(
    &self,
    timeout: Duration,
    cancel: Option<&CancelToken>,
  ) -> Result<Option<T>, SyncError> {
    let waiter = {
      let mut inner = self.inner.lock().unwrap();
      if let Some(item) = inner.storage.pop_front() {
        drop(inner);
        if let Some(space) = &self.space {
          let _ = space.release(1);
        }
        return Ok(Some(item));
      }
      if inner.completed {
        tracing::debug!("dequeue_timeout() on an empty, completed queue");
        return Err(SyncError::State("queue completed".into()));
      }
      inner.dequeuers.enqueue()?
    };
    match crate::kernel::park_timeout(waiter, timeout, cancel).await {
      Some(Ok(item)) => {
        if let Some(space) = &self.space {
          let _ = space.release(1);
        }
        Ok(Some(item))
      }
      Some(Err(err)) => Err(err),
      None => Ok(None),
    }
  }

  /// Forbids further [`Self::enqueue`] calls and fails every pending (and
  /// future) [`Self::dequeue`] against an empty queue with
  /// [`SyncError::State`] ("queue completed"). Items already resident
  /// remain dequeueable.
  pub fn complete(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.completed = true;
    if inner.storage.is_empty() {
      tracing::debug!("queue completed; failing pending dequeuers");
      inner
        .dequeuers
        .release_all(|| Err(SyncError::State("queue completed".into())));
    }
  }

  /// Cancels every pending `enqueue`/`dequeue` and disposes this queue.
  pub fn dispose(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.dequeuers.dispose();
    if let Some(space) = &self.space {
      space.dispose();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use test_case::test_case;

  #[test_case(0; "zero capacity")]
  fn bounded_rejects_invalid_capacity(capacity: u32) {
    assert!(matches!(Queue::<i32>::bounded(capacity), Err(SyncError::OutOfRange(_))));
  }

  #[tokio::test]
  async fn bounded_queue_backpressure() {
    let queue = Queue::bounded(1).unwrap();
    queue.enqueue(1, None).await.unwrap();
    let queue_clone = queue.clone();
    let second_enqueue = tokio::spawn(async move { queue_clone.enqueue(2, None).await });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(!second_enqueue.is_finished());
    assert_eq!(queue.dequeue(None).await.unwrap(), 1);
    second_enqueue.await.unwrap().unwrap();
    assert_eq!(queue.dequeue(None).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn unbounded_queue_consumer_suspends_on_empty() {
    let queue: Queue<i32> = Queue::unbounded();
    let queue_clone = queue.clone();
    let consumer = tokio::spawn(async move { queue_clone.dequeue(None).await });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    queue.enqueue(42, None).await.unwrap();
    assert_eq!(consumer.await.unwrap().unwrap(), 42);
  }

  #[tokio::test]
  async fn enqueue_after_complete_is_rejected() {
    let queue: Queue<i32> = Queue::unbounded();
    queue.complete();
    assert!(matches!(queue.enqueue(1, None).await, Err(SyncError::State(_))));
  }

  #[tokio::test]
  async fn pending_dequeue_fails_when_queue_completes_while_empty() {
    let queue: Queue<i32> = Queue::unbounded();
    let queue_clone = queue.clone();
    let consumer = tokio::spawn(async move { queue_clone.dequeue(None).await });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    queue.complete();
    assert!(matches!(consumer.await.unwrap(), Err(SyncError::State(_))));
  }

  #[tokio::test]
  async fn items_resident_at_complete_are_still_dequeueable() {
    let queue = Queue::unbounded();
    queue.enqueue(1, None).await.unwrap();
    queue.complete();
    assert_eq!(queue.dequeue(None).await.unwrap(), 1);
    assert!(matches!(queue.dequeue(None).await, Err(SyncError::State(_))));
  }
}
