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

//! A countdown latch (`§4.6`): a counter that latches a
//! [`ManualResetEvent`] when it reaches zero.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::event::ManualResetEvent;

#[derive(Debug)]
struct Inner {
  count: u64,
}

/// Waits for `initial` [`Self::signal`] calls before releasing every
/// `wait`-ing task. Once latched at zero, further [`Self::add_count`]
/// calls are rejected.
#[derive(Clone, Debug)]
pub struct CountdownEvent {
  inner: Arc<Mutex<Inner>>,
  event: ManualResetEvent,
}

impl CountdownEvent {
  /// Creates a countdown starting at `initial`. A countdown constructed
  /// with `initial == 0` is latched immediately.
  #[must_use]
  pub fn new(initial: u64) -> Self {
    let event = ManualResetEvent::new(initial == 0);
    Self {
      inner: Arc::new(Mutex::new(Inner { count: initial })),
      event,
    }
  }

  /// The remaining count.
  #[must_use]
  pub fn current_count(&self) -> u64 { self.inner.lock().unwrap().count }

  /// Decrements the count by one, latching the event if this reaches
  /// zero. Returns the remaining count.
  ///
  /// # Errors
  /// [`SyncError::State`] if the count is already zero.
  pub fn signal(&self) -> Result<u64, SyncError> {
    let mut inner = self.inner.lock().unwrap();
    if inner.count == 0 {
      tracing::warn!("signal() on a countdown already latched at zero");
      return Err(SyncError::State("signal on a countdown already at zero".into()));
    }
    inner.count -= 1;
    let remaining = inner.count;
    drop(inner);
    if remaining == 0 {
      self.event.set();
    }
    Ok(remaining)
  }

  /// Increments the count by `v`, permitted only while `count > 0`.
  ///
  /// # Errors
  /// [`SyncError::State`] if the countdown has already latched at zero.
  pub fn add_count(&self, v: u64) -> Result<u64, SyncError> {
    let mut inner = self.inner.lock().unwrap();
    if inner.count == 0 {
      tracing::warn!("add_count() on a countdown latched at zero");
      return Err(SyncError::State("add_count on a countdown latched at zero".into()));
    }
    inner.count += v;
    Ok(inner.count)
  }

  /// Suspends until the count reaches zero.
  ///
  /// # Errors
  /// [`SyncError::Disposed`] if disposed. [`SyncError::Cancelled`] if
  /// `cancel` fires first.
  pub async fn wait(&self, cancel: Option<&CancelToken>) -> Result<(), SyncError> { self.event.wait(cancel).await }

  /// As [`Self::wait`], bounded by `timeout`.
  pub async fn wait_timeout(&self, timeout: Duration, cancel: Option<&CancelToken>) -> Result<bool, SyncError> {
    self.event.wait_timeout(timeout, cancel).await
  }

  /// Disposes the underlying event, cancelling any pending `wait`.
  pub fn dispose(&self) { self.event.dispose(); }

  /// Whether [`Self::dispose`] has been called.
  #[must_use]
  pub fn is_disposed(&self) -> bool { self.event.is_disposed() }
}
