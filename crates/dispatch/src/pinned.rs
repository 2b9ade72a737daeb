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

//! The pinned dispatcher
//!
//! Each worker is a dedicated OS thread with its own ready queue; an actor
//! is bound to one worker at attach time (round-robin) and only ever
//! drained there. With a single consumer per mailbox the processing token
//! is uncontended; it is kept for the uniform invariant, not for mutual
//! exclusion. This is the mode for selector-based IO integration, where an
//! actor's state is read from callback context on a known thread.

use crate::worker::{enqueue_with_policy, worker_loop, DispatchEntry, ReadyQueue};
use crate::{DispatchTarget, MessageDispatcher};
use async_trait::async_trait;
use dashmap::DashMap;
use hive_core::{ActorId, Envelope, Fault};
use hive_mailbox::{Mailbox, MailboxConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Pool dispatcher that binds every actor to a fixed worker thread
pub struct PinnedDispatcher {
    name: String,
    entries: Arc<DashMap<ActorId, DispatchEntry>>,
    queues: Vec<Arc<ReadyQueue>>,
    assignment: DashMap<ActorId, usize>,
    next: AtomicUsize,
    workers: Mutex<Vec<std::thread::JoinHandle<()>>>,
}

impl PinnedDispatcher {
    /// A pinned pool with `workers` dedicated threads
    pub fn new(name: impl Into<String>, workers: usize, throughput: usize) -> Arc<Self> {
        let name = name.into();
        let throughput = throughput.max(1);
        let entries: Arc<DashMap<ActorId, DispatchEntry>> = Arc::new(DashMap::new());
        let queues: Vec<Arc<ReadyQueue>> = (0..workers.max(1))
            .map(|_| Arc::new(ReadyQueue::new()))
            .collect();

        let mut handles = Vec::new();
        for (i, queue) in queues.iter().enumerate() {
            let entries = entries.clone();
            let queue = queue.clone();
            let thread_name = format!("{}-pinned-{}", name, i);
            let spawned = std::thread::Builder::new().name(thread_name.clone()).spawn(
                move || match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(worker_loop(entries, queue, throughput)),
                    Err(err) => {
                        tracing::error!(worker = %thread_name, %err, "failed to build worker runtime")
                    }
                },
            );
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => tracing::error!(%err, "failed to spawn pinned worker thread"),
            }
        }

        Arc::new(PinnedDispatcher {
            name,
            entries,
            queues,
            assignment: DashMap::new(),
            next: AtomicUsize::new(0),
            workers: Mutex::new(handles),
        })
    }

    fn queue_for(&self, id: &ActorId) -> Option<Arc<ReadyQueue>> {
        self.assignment
            .get(id)
            .map(|slot| self.queues[*slot.value()].clone())
    }
}

#[async_trait]
impl MessageDispatcher for PinnedDispatcher {
    async fn attach(
        &self,
        target: Arc<dyn DispatchTarget>,
        mailbox: MailboxConfig,
    ) -> Result<(), Fault> {
        let id = target.target_id();
        let slot = self.next.fetch_add(1, Ordering::SeqCst) % self.queues.len();
        self.assignment.insert(id, slot);
        let entry = DispatchEntry {
            mailbox: Arc::new(Mailbox::new(mailbox)),
            target,
        };
        if self.entries.insert(id, entry).is_some() {
            tracing::warn!(actor = %id, dispatcher = %self.name, "actor was already attached");
        }
        tracing::debug!(actor = %id, worker = slot, "pinned actor to worker");
        Ok(())
    }

    async fn detach(&self, id: &ActorId) -> Vec<Envelope> {
        self.assignment.remove(id);
        match self.entries.remove(id) {
            Some((_, entry)) => entry.mailbox.drain(),
            None => Vec::new(),
        }
    }

    async fn dispatch(&self, id: &ActorId, envelope: Envelope) -> Result<(), Fault> {
        let entry = match self.entries.get(id) {
            Some(entry) => entry.value().clone(),
            None => {
                envelope.complete_exceptionally(Fault::Stopped).await;
                return Err(Fault::Stopped);
            }
        };
        enqueue_with_policy(&entry, envelope).await?;
        if !entry.mailbox.is_processing() {
            if let Some(queue) = self.queue_for(id) {
                queue.push(*id);
            }
        }
        Ok(())
    }

    fn mailbox_size(&self, id: &ActorId) -> usize {
        self.entries.get(id).map(|e| e.mailbox.len()).unwrap_or(0)
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn shutdown(&self) {
        for queue in &self.queues {
            queue.close();
        }
        let handles: Vec<std::thread::JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for thread in handles {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }
    }
}
