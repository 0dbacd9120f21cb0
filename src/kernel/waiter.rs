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

//! A single pending suspension and the two ways of waiting on one: forever
//! (honouring an optional [`CancelToken`]), or until a deadline elapses.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::cancel::CancelToken;
use crate::error::SyncError;

pub(crate) const PENDING: u8 = 0;
pub(crate) const FULFILLED: u8 = 1;
pub(crate) const CANCELLED: u8 = 2;

/// A handle to one enqueued suspension. `T` is the payload handed off on
/// fulfillment — `()` for a semaphore token or an event release, an actual
/// item for a queue's dequeue.
///
/// The terminal-state transition is an atomic compare-exchange on a shared
/// flag: whichever of {release, cancellation, timeout} calls
/// [`Waiter::try_cancel`] or the queue's own hand-off first wins, and the
/// other observably does nothing. This is the "at most one terminal
/// transition per waiter" invariant.
pub(crate) struct Waiter<T> {
  #[allow(dead_code)]
  pub(crate) id: u64,
  pub(crate) state: Arc<AtomicU8>,
  pub(crate) receiver: oneshot::Receiver<T>,
}

impl<T> Waiter<T> {
  /// Attempts to move this waiter from pending to cancelled. Returns
  /// whether this call won the race — i.e. whether the caller should treat
  /// the wait as cancelled rather than await the (possibly already
  /// in-flight) fulfillment value.
  fn try_cancel(&self) -> bool {
    self
      .state
      .compare_exchange(PENDING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
      .is_ok()
  }
}

/// Waits for `waiter` to be fulfilled, honouring `cancel` if supplied.
/// Resolves to the handed-off payload on success, or `Cancelled` if the
/// token fired first (including a token that was already cancelled before
/// this call began).
pub(crate) async fn park<T>(mut waiter: Waiter<T>, cancel: Option<&CancelToken>) -> Result<T, SyncError> {
  let Some(cancel) = cancel else {
    return (&mut waiter.receiver).await.map_err(|_| SyncError::Cancelled);
  };
  tokio::select! {
    biased;
    result = &mut waiter.receiver => result.map_err(|_| SyncError::Cancelled),
    () = cancel.cancelled() => {
      if waiter.try_cancel() {
        Err(SyncError::Cancelled)
      } else {
        // Fulfillment already won the CAS race; the payload is in flight.
        (&mut waiter.receiver).await.map_err(|_| SyncError::Cancelled)
      }
    }
  }
}

/// As [`park`], but also races a deadline. Resolves `None` on cancellation
/// or timeout, `Some(payload)` on fulfillment — callers map this to the
/// bool-returning wait twin (`true` for `Some`, `false` for `None`).
pub(crate) async fn park_timeout<T>(
  mut waiter: Waiter<T>,
  duration: Duration,
  cancel: Option<&CancelToken>,
) -> Option<T> {
  let sleep = tokio::time::sleep(duration);
  tokio::pin!(sleep);
  match cancel {
    Some(cancel) => {
      tokio::select! {
        biased;
        result = &mut waiter.receiver => result.ok(),
        () = cancel.cancelled() => {
          if waiter.try_cancel() {
            None
          } else {
            (&mut waiter.receiver).await.ok()
          }
        }
        () = &mut sleep => {
          if waiter.try_cancel() {
            None
          } else {
            (&mut waiter.receiver).await.ok()
          }
        }
      }
    }
    None => {
      tokio::select! {
        biased;
        result = &mut waiter.receiver => result.ok(),
        () = &mut sleep => {
          if waiter.try_cancel() {
            None
          } else {
            (&mut waiter.receiver).await.ok()
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use pretty_assertions::assert_eq;
  use crate::kernel::waiter_queue::WaiterQueue;

  #[tokio::test]
  async fn park_resolves_on_fulfillment() {
    let mut queue = WaiterQueue::<u32>::new();
    let waiter = queue.enqueue().unwrap();
    queue.release_one(7).unwrap();
    assert_eq!(park(waiter, None).await.unwrap(), 7);
  }

  #[tokio::test]
  async fn park_honours_cancellation() {
    let mut queue = WaiterQueue::<u32>::new();
    let waiter = queue.enqueue().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = park(waiter, Some(&cancel)).await;
    assert!(matches!(result, Err(SyncError::Cancelled)));
    // The entry is tombstoned, not removed; a release must skip it cleanly.
    assert!(queue.release_one(9).is_err());
  }

  #[tokio::test]
  async fn park_timeout_returns_none_on_deadline() {
    let mut queue = WaiterQueue::<u32>::new();
    let waiter = queue.enqueue().unwrap();
    let outcome = park_timeout(waiter, Duration::from_millis(10), None).await;
    assert!(outcome.is_none());
  }

  #[tokio::test]
  async fn park_timeout_prefers_fulfillment_already_in_flight() {
    let mut queue = WaiterQueue::<u32>::new();
    let waiter = queue.enqueue().unwrap();
    queue.release_one(42).unwrap();
    let outcome = park_timeout(waiter, Duration::from_secs(5), None).await;
    assert_eq!(outcome, Some(42));
  }
}
