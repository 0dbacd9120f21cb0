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

use std::sync::Arc;

/// The only error taxonomy this crate exposes. No variant carries a
/// language-specific type identity — just enough structure for a caller to
/// decide whether to retry, propagate, or treat the outcome as expected
/// control flow.
///
/// `Cancelled` and `TimedOut` are not failures in the usual sense: a
/// `*_timeout` wait surfaces a timed-out or externally-cancelled wait as
/// `Ok(false)`, never as this enum. Only the non-timeout twin surfaces
/// `Cancelled` as an `Err`.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
pub enum SyncError {
  /// The wait was cancelled by the caller's [`CancelToken`](crate::cancel::CancelToken)
  /// before it could be fulfilled.
  #[error("the wait was cancelled before it could be fulfilled")]
  #[diagnostic(code(waitkit::cancelled))]
  Cancelled,

  /// A `release` call would push a semaphore's `current` count above its
  /// configured `max`.
  #[error("release would push the semaphore above its configured maximum")]
  #[diagnostic(
    code(waitkit::semaphore_full),
    help("check for a release() that isn't paired with a prior wait()")
  )]
  SemaphoreFull,

  /// Structural misuse: `signal()` on a zero-count countdown, `add_count()`
  /// on a latched-zero countdown, `enqueue()` on a completed queue, and
  /// similar invariant violations that are local to one operation.
  #[error("invalid state: {0}")]
  #[diagnostic(code(waitkit::state))]
  State(String),

  /// The primitive has already been disposed; only a second `dispose()` is
  /// tolerated (as a no-op).
  #[error("operation attempted on an already-disposed primitive")]
  #[diagnostic(code(waitkit::disposed))]
  Disposed,

  /// Construction with invalid bounds, e.g. a semaphore `max < 1` or a
  /// barrier with zero participants.
  #[error("value out of range: {0}")]
  #[diagnostic(code(waitkit::out_of_range))]
  OutOfRange(String),

  /// A [`Lazy`](crate::lazy::Lazy) factory failed. Sticky: every observer,
  /// past and future, is handed the same wrapped failure.
  #[error("lazy factory failed: {0}")]
  #[diagnostic(code(waitkit::factory_failure))]
  FactoryFailure(Arc<SyncError>),
}
