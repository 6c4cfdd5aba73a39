// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Keyed table of in-flight operations
//!
//! The first caller to [`InFlightTable::join`] a key becomes the leader and
//! holds an [`InFlightSlot`]; later callers for the same key become followers
//! and wait for the leader's outcome. The slot releases its table entry when
//! it is settled or dropped, so an abandoned operation never blocks the key.

use std::hash::Hash;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::watch;

type Outcome<V> = watch::Receiver<Option<V>>;

/// Table of pending operations keyed by `K`, each settling to a `V`
#[derive(Debug)]
pub struct InFlightTable<K: Eq + Hash, V> {
    entries: DashMap<K, Outcome<V>>,
}

/// Role assigned to a caller joining a key
#[derive(Debug)]
pub enum Ticket<'a, K: Eq + Hash, V> {
    /// No operation was pending; the caller must run it and settle the slot
    Leader(InFlightSlot<'a, K, V>),
    /// An operation is already pending; the caller waits for it
    Follower(Follower<V>),
}

impl<K: Eq + Hash + Clone, V> InFlightTable<K, V> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Join the operation for `key`, registering a new one if none is pending
    pub fn join(&self, key: K) -> Ticket<'_, K, V> {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(pending) => Ticket::Follower(Follower {
                receiver: pending.get().clone(),
            }),
            Entry::Vacant(vacant) => {
                let (sender, receiver) = watch::channel(None);
                vacant.insert(receiver.clone());
                Ticket::Leader(InFlightSlot {
                    entries: &self.entries,
                    key,
                    sender,
                    receiver,
                })
            }
        }
    }

    /// Whether an operation for `key` is pending
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of pending operations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no operation is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for InFlightTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Leader's registration for a key; releases the key when settled or dropped
#[derive(Debug)]
pub struct InFlightSlot<'a, K: Eq + Hash, V> {
    entries: &'a DashMap<K, Outcome<V>>,
    key: K,
    sender: watch::Sender<Option<V>>,
    receiver: Outcome<V>,
}

impl<K: Eq + Hash, V> InFlightSlot<'_, K, V> {
    /// Release the key and publish `value` to every follower
    ///
    /// The key is released first, so a caller arriving after this point starts
    /// a fresh operation instead of observing this one.
    pub fn settle(self, value: V) {
        self.release();
        self.sender.send_replace(Some(value));
    }

    fn release(&self) {
        // Only remove our own registration; a newer leader may own the key now.
        self.entries
            .remove_if(&self.key, |_, pending| pending.same_channel(&self.receiver));
    }
}

impl<K: Eq + Hash, V> Drop for InFlightSlot<'_, K, V> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle on another caller's pending operation
#[derive(Debug)]
pub struct Follower<V> {
    receiver: Outcome<V>,
}

impl<V: Clone> Follower<V> {
    /// Wait for the leader's outcome
    ///
    /// Returns `None` when the leader was dropped without settling.
    pub async fn wait(mut self) -> Option<V> {
        match self.receiver.wait_for(Option::is_some).await {
            Ok(settled) => (*settled).clone(),
            Err(_) => None,
        }
    }
}
