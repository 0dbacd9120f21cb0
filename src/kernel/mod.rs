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

//! The waiter-queue kernel: the one piece of subtle engineering every
//! primitive in this crate is a thin state machine on top of. Not part of
//! the public API — each primitive module exposes its own safe, typed
//! surface over [`WaiterQueue`] and [`park`]/[`park_timeout`].

mod waiter;
mod waiter_queue;

pub(crate) use waiter::{park, park_timeout, Waiter};
pub(crate) use waiter_queue::WaiterQueue;
