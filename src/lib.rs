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

//! # `waitkit`
//!
//! Cooperative asynchronous synchronization primitives for single-process
//! concurrent programs built on `tokio`: every operation suspends the
//! calling *task*, never a thread, until its condition is satisfied.
//!
//! 1. [`cancel::CancelToken`] — the cancellation-handle abstraction every
//!    suspending operation in this crate accepts.
//! 2. [`semaphore::Semaphore`] — a bounded, FIFO-fair counting semaphore.
//! 3. [`event::ManualResetEvent`] and [`event::AutoResetEvent`] — latched
//!    booleans with broadcast and single-waiter release semantics.
//! 4. [`mutex::Mutex`] — a non-reentrant mutex with a scoped release guard.
//! 5. [`rwlock::RwLock`] — any number of concurrent readers, xor one writer.
//! 6. [`countdown::CountdownEvent`] — a counter that latches an event at
//!    zero.
//! 7. [`barrier::Barrier`] — a reusable, phased rendezvous point.
//! 8. [`queue::Queue`] — a bounded or unbounded asynchronous FIFO queue.
//! 9. [`lazy::Lazy`] — at-most-once asynchronous initialization.
//! 10. [`context_local::ContextLocal`] — a value scoped to an explicit,
//!     forkable logical context rather than thread-local storage.
//!
//! Every one of these is a thin state machine layered on the
//! `kernel` module's waiter queue: the one piece of genuinely subtle
//! engineering in this crate (registration, at-most-once release,
//! cancellation, timeout, and disposal, without races or lost wake-ups).
//! That module is intentionally private — each primitive above exposes
//! its own safe, typed surface over it.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use waitkit::semaphore::Semaphore;
//!
//! let sem = Semaphore::new(0, 1).unwrap();
//! let permit = {
//!     let sem = sem.clone();
//!     tokio::spawn(async move { sem.wait(None).await })
//! };
//! sem.release(1).unwrap();
//! permit.await.unwrap().unwrap();
//! # }
//! ```

pub mod barrier;
pub mod cancel;
pub mod context_local;
pub mod countdown;
pub mod error;
pub mod event;
pub(crate) mod kernel;
pub mod lazy;
pub mod mutex;
pub mod queue;
pub mod rwlock;
pub mod semaphore;

pub use barrier::Barrier;
pub use cancel::CancelToken;
pub use context_local::{Context, ContextLocal};
pub use countdown::CountdownEvent;
pub use error::SyncError;
pub use event::{AutoResetEvent, ManualResetEvent};
pub use lazy::Lazy;
pub use mutex::{Mutex, MutexGuard};
pub use queue::Queue;
pub use rwlock::{ReadGuard, RwLock, WriteGuard};
pub use semaphore::Semaphore;
