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

//! A context-local value (`§4.10`). Per the design notes' explicit
//! instruction against thread-local storage (whose forking semantics
//! differ from what this spec wants), visibility is scoped to an explicit
//! [`Context`] handle that callers thread through their own call graph,
//! rather than any implicit task-local lookup.

use std::sync::{Arc, Mutex};

/// A named slot with a default value, from which root [`Context`]s are
/// minted.
#[derive(Debug)]
pub struct ContextLocal<T> {
  default: T,
}

impl<T> ContextLocal<T>
where
  T: Clone + Send + 'static,
{
  /// Creates a slot whose root contexts start at `default`.
  pub fn new(default: T) -> Self { Self { default } }

  /// Mints a fresh root [`Context`], initialized to this slot's default
  /// value.
  #[must_use]
  pub fn root(&self) -> Context<T> {
    Context {
      slot: Arc::new(Mutex::new(self.default.clone())),
      default: self.default.clone(),
    }
  }
}

/// A single logical asynchronous context's view of a [`ContextLocal`]
/// value. Cloning a `Context` shares the same slot — both clones observe
/// each other's writes — whereas [`Self::fork`] snapshots the current
/// value into an independent child: writes on either side afterward are
/// invisible to the other.
#[derive(Clone)]
pub struct Context<T> {
  slot: Arc<Mutex<T>>,
  default: T,
}

impl<T> std::fmt::Debug for Context<T>
where
  T: std::fmt::Debug,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Context").field("value", &*self.slot.lock().unwrap()).finish()
  }
}

impl<T> Context<T>
where
  T: Clone + Send + 'static,
{
  /// Reads the current value visible in this context.
  #[must_use]
  pub fn get(&self) -> T { self.slot.lock().unwrap().clone() }

  /// Writes a new value, visible to every clone of this exact `Context`
  /// (not to contexts this one was forked from, nor to contexts forked
  /// from this one after the write).
  pub fn set(&self, value: T) { *self.slot.lock().unwrap() = value; }

  /// Derives a child context that starts with this context's current
  /// value. Subsequent writes in either the parent or the child are
  /// invisible to the other.
  #[must_use]
  pub fn fork(&self) -> Self {
    Self {
      slot: Arc::new(Mutex::new(self.get())),
      default: self.default.clone(),
    }
  }

  /// Resets this context's value to the slot's original default. Only
  /// this context (and clones sharing its slot) is affected.
  pub fn dispose(&self) { self.set(self.default.clone()); }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn fork_snapshots_and_isolates_subsequent_writes() {
    let local = ContextLocal::new(0);
    let parent = local.root();
    parent.set(1);
    let child = parent.fork();
    assert_eq!(child.get(), 1);

    child.set(2);
    assert_eq!(parent.get(), 1, "child writes must not propagate to the parent");

    parent.set(3);
    assert_eq!(child.get(), 2, "parent writes must not propagate to the child");
  }

  #[test]
  fn clones_of_the_same_context_share_writes() {
    let local = ContextLocal::new("a".to_string());
    let ctx = local.root();
    let alias = ctx.clone();
    alias.set("b".to_string());
    assert_eq!(ctx.get(), "b");
  }

  #[test]
  fn dispose_resets_to_default_within_this_context_only() {
    let local = ContextLocal::new(10);
    let parent = local.root();
    parent.set(99);
    let child = parent.fork();
    child.dispose();
    assert_eq!(child.get(), 10);
    assert_eq!(parent.get(), 99, "disposing the child must not affect the parent");
  }
}
