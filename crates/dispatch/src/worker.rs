// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Hive.
//
// Hive is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Hive is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Hive. If not, see <https://www.gnu.org/licenses/>.

//! Shared worker machinery for the pool dispatchers
//!
//! The ready queue carries ids of mailboxes that may have work. Duplicates
//! are harmless: a worker that loses the token CAS simply drops the entry,
//! because whichever worker holds the token re-checks emptiness on release.

use crate::DispatchTarget;
use hive_core::{ActorId, Envelope, Fault};
use hive_mailbox::{Enqueued, Mailbox};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// One attached actor as the dispatcher sees it
#[derive(Clone)]
pub(crate) struct DispatchEntry {
    pub mailbox: Arc<Mailbox>,
    pub target: Arc<dyn DispatchTarget>,
}

/// MPMC queue of ready mailbox ids
pub(crate) struct ReadyQueue {
    queue: Mutex<VecDeque<ActorId>>,
    notify: Notify,
    closed: AtomicBool,
}

impl ReadyQueue {
    pub fn new() -> Self {
        ReadyQueue {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn push(&self, id: ActorId) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.queue.lock().push_back(id);
        self.notify.notify_one();
    }

    /// Next ready id, or `None` once the queue is closed and empty
    pub async fn pop(&self) -> Option<ActorId> {
        loop {
            if let Some(id) = self.queue.lock().pop_front() {
                return Some(id);
            }
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.notify.notified().await;
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// Drain up to `throughput` envelopes; caller holds the processing token
pub(crate) async fn drain(entry: &DispatchEntry, throughput: usize) -> usize {
    let mut processed = 0;
    while processed < throughput {
        match entry.mailbox.pop() {
            Some(envelope) => {
                entry.target.invoke(envelope).await;
                processed += 1;
            }
            None => break,
        }
    }
    processed
}

/// Worker body shared by the pool dispatchers
///
/// Acquire the token, drain a bounded burst, release, re-check. The
/// re-enqueue after release is half of the lost-wakeup handshake; the other
/// half lives in [`enqueue_with_policy`]'s caller.
pub(crate) async fn worker_loop(
    entries: Arc<dashmap::DashMap<ActorId, DispatchEntry>>,
    ready: Arc<ReadyQueue>,
    throughput: usize,
) {
    while let Some(id) = ready.pop().await {
        let entry = match entries.get(&id) {
            Some(entry) => entry.value().clone(),
            None => continue,
        };
        if !entry.mailbox.try_acquire() {
            continue;
        }
        drain(&entry, throughput).await;
        entry.mailbox.release();
        if !entry.mailbox.is_empty() {
            ready.push(id);
        }
    }
}

/// Enqueue honoring the caller-runs rejection policy
///
/// On `CallerMustDrain` the calling task drains one envelope itself (inside
/// the token) to make room, then retries.
pub(crate) async fn enqueue_with_policy(
    entry: &DispatchEntry,
    envelope: Envelope,
) -> Result<(), Fault> {
    let mut pending = envelope;
    loop {
        match entry.mailbox.enqueue(pending).await? {
            Enqueued::Accepted => return Ok(()),
            Enqueued::CallerMustDrain(returned) => {
                pending = returned;
                if entry.mailbox.try_acquire() {
                    if let Some(next) = entry.mailbox.pop() {
                        entry.target.invoke(next).await;
                    }
                    entry.mailbox.release();
                } else {
                    // another worker is draining; room will appear
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}
