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

//! A cyclic barrier (`§4.7`): `participants` tasks rendezvous each phase,
//! an optional action runs once per phase on the closing participant's
//! thread, then everyone is released together.

use std::sync::{Arc, Mutex};

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::event::ManualResetEvent;

/// The signature of a barrier's optional post-phase action: invoked with
/// the phase number that just closed, on the thread of the participant
/// whose arrival closed it.
pub type PostPhase = dyn Fn(u64) -> Result<(), SyncError> + Send + Sync;

struct Inner {
  participants: u64,
  remaining: u64,
  phase: u64,
  event: ManualResetEvent,
  disposed: bool,
}

/// A reusable rendezvous point for a fixed number of participants.
#[derive(Clone)]
pub struct Barrier {
  inner: Arc<Mutex<Inner>>,
  post_phase: Option<Arc<PostPhase>>,
}

impl std::fmt::Debug for Barrier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let inner = self.inner.lock().unwrap();
    f.debug_struct("Barrier")
      .field("participants", &inner.participants)
      .field("remaining", &inner.remaining)
      .field("phase", &inner.phase)
      .field("has_post_phase_action", &self.post_phase.is_some())
      .finish()
  }
}

impl Barrier {
  /// Creates a barrier for `participants` tasks with no post-phase
  /// action.
  ///
  /// # Errors
  /// [`SyncError::OutOfRange`] if `participants < 1`.
  pub fn new(participants: u64) -> Result<Self, SyncError> { Self::with_post_phase_action(participants, None) }

  /// As [`Self::new`], additionally running `action` exactly once per
  /// phase — on the thread of the participant whose arrival closed that
  /// phase, before any participant (including that one) is released. If
  /// `action` returns `Err`, the phase still advances and the event is
  /// still set for everyone else; the error is returned only from the
  /// `signal_and_wait` call of the closing participant.
  ///
  /// # Errors
  /// [`SyncError::OutOfRange`] if `participants < 1`.
  pub fn with_post_phase_action(
    participants: u64,
    action: Option<Arc<PostPhase>>,
  ) -> Result<Self, SyncError> {
    if participants < 1 {
      tracing::warn!("barrier constructed with participants < 1");
      return Err(SyncError::OutOfRange("barrier participants must be at least 1".into()));
    }
    Ok(Self {
      inner: Arc::new(Mutex::new(Inner {
        participants,
        remaining: participants,
        phase: 0,
        event: ManualResetEvent::new(false),
        disposed: false,
      })),
      post_phase: action,
    })
  }

  /// The current phase number (monotonically non-decreasing).
  #[must_use]
  pub fn current_phase(&self) -> u64 { self.inner.lock().unwrap().phase }

  /// How many more participants must arrive before the current phase
  /// closes.
  #[must_use]
  pub fn participants_remaining(&self) -> u64 { self.inner.lock().unwrap().remaining }

  /// Arrives at the barrier and waits for every other participant to do
  /// the same. Returns the phase number that was just closed.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::Cancelled`] if
  /// `cancel` fires before the phase closes (only possible for a
  /// non-closing participant — the closing participant never suspends).
  pub async fn signal_and_wait(&self, cancel: Option<&CancelToken>) -> Result<u64, SyncError> {
    let (event, phase, is_last) = {
      let mut inner = self.inner.lock().unwrap();
      if inner.disposed {
        tracing::debug!("signal_and_wait() on a disposed barrier");
        return Err(SyncError::Disposed);
      }
      inner.remaining -= 1;
      let event = inner.event.clone();
      let phase = inner.phase;
      (event, phase, inner.remaining == 0)
    };

    if !is_last {
      event.wait(cancel).await?;
      return Ok(phase);
    }

    let action_result = match &self.post_phase {
      Some(action) => action(phase),
      None => Ok(()),
    };

    {
      let mut inner = self.inner.lock().unwrap();
      inner.remaining = inner.participants;
      inner.phase += 1;
      inner.event = ManualResetEvent::new(false);
    }
    event.set();

    if let Err(err) = &action_result {
      tracing::warn!(phase, %err, "barrier post-phase action failed; phase still advanced");
    }
    action_result?;
    Ok(phase)
  }

  /// Disposes this barrier, cancelling any pending `signal_and_wait`.
  pub fn dispose(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.disposed = true;
    inner.event.dispose();
  }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.inner.lock().unwrap().disposed }
}
