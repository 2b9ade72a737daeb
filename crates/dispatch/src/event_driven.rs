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

//! The shared-pool, event-driven dispatcher
//!
//! One engine, three personalities. The drain algorithm is identical in
//! all of them: `dispatch` puts the actor on the ready queue when it sees a
//! free processing token; a worker dequeues the id, takes the token by CAS,
//! drains up to *throughput* envelopes, releases, and re-enqueues the id if
//! more arrived meanwhile. What differs is who the workers are:
//!
//! - [`EventDrivenDispatcher::executor`]: dedicated OS threads, each running
//!   a current-thread Tokio runtime, so the pool owns its parallelism
//! - [`EventDrivenDispatcher::cooperative_pool`]: Tokio tasks on the shared
//!   runtime (the default)
//! - [`EventDrivenDispatcher::cooperative_single_thread`]: one worker task,
//!   one envelope per turn, for deterministic interleaving while debugging

use crate::worker::{enqueue_with_policy, worker_loop, DispatchEntry, ReadyQueue};
use crate::{DispatchTarget, MessageDispatcher};
use async_trait::async_trait;
use dashmap::DashMap;
use hive_core::{ActorId, Envelope, Fault};
use hive_mailbox::{Mailbox, MailboxConfig};
use parking_lot::Mutex;
use std::sync::Arc;

enum WorkerHandle {
    Task(tokio::task::JoinHandle<()>),
    Thread(std::thread::JoinHandle<()>),
}

/// Shared-pool dispatcher with a ready queue of drainable mailboxes
pub struct EventDrivenDispatcher {
    name: String,
    throughput: usize,
    entries: Arc<DashMap<ActorId, DispatchEntry>>,
    ready: Arc<ReadyQueue>,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl EventDrivenDispatcher {
    fn bare(name: impl Into<String>, throughput: usize) -> Arc<Self> {
        Arc::new(EventDrivenDispatcher {
            name: name.into(),
            throughput: throughput.max(1),
            entries: Arc::new(DashMap::new()),
            ready: Arc::new(ReadyQueue::new()),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Pool of Tokio-task workers on the shared runtime (the default)
    ///
    /// Must be called from within a Tokio runtime.
    pub fn cooperative_pool(
        name: impl Into<String>,
        workers: usize,
        throughput: usize,
    ) -> Arc<Self> {
        let dispatcher = Self::bare(name, throughput);
        let mut handles = dispatcher.workers.lock();
        for _ in 0..workers.max(1) {
            let entries = dispatcher.entries.clone();
            let ready = dispatcher.ready.clone();
            let throughput = dispatcher.throughput;
            handles.push(WorkerHandle::Task(tokio::spawn(worker_loop(
                entries, ready, throughput,
            ))));
        }
        drop(handles);
        dispatcher
    }

    /// Everything on one worker, one envelope per scheduling turn
    pub fn cooperative_single_thread(name: impl Into<String>) -> Arc<Self> {
        Self::cooperative_pool(name, 1, 1)
    }

    /// Pool of dedicated OS threads, each with a current-thread runtime
    pub fn executor(name: impl Into<String>, threads: usize, throughput: usize) -> Arc<Self> {
        let dispatcher = Self::bare(name, throughput);
        let mut handles = dispatcher.workers.lock();
        for i in 0..threads.max(1) {
            let entries = dispatcher.entries.clone();
            let ready = dispatcher.ready.clone();
            let throughput = dispatcher.throughput;
            let thread_name = format!("{}-worker-{}", dispatcher.name, i);
            let spawned = std::thread::Builder::new().name(thread_name.clone()).spawn(
                move || match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(worker_loop(entries, ready, throughput)),
                    Err(err) => {
                        tracing::error!(worker = %thread_name, %err, "failed to build worker runtime")
                    }
                },
            );
            match spawned {
                Ok(handle) => handles.push(WorkerHandle::Thread(handle)),
                Err(err) => tracing::error!(%err, "failed to spawn dispatcher worker thread"),
            }
        }
        drop(handles);
        dispatcher
    }
}

#[async_trait]
impl MessageDispatcher for EventDrivenDispatcher {
    async fn attach(
        &self,
        target: Arc<dyn DispatchTarget>,
        mailbox: MailboxConfig,
    ) -> Result<(), Fault> {
        let id = target.target_id();
        let entry = DispatchEntry {
            mailbox: Arc::new(Mailbox::new(mailbox)),
            target,
        };
        if self.entries.insert(id, entry).is_some() {
            tracing::warn!(actor = %id, dispatcher = %self.name, "actor was already attached");
        }
        Ok(())
    }

    async fn detach(&self, id: &ActorId) -> Vec<Envelope> {
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
            self.ready.push(*id);
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
        self.ready.close();
        let handles: Vec<WorkerHandle> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            match handle {
                WorkerHandle::Task(task) => {
                    let _ = task.await;
                }
                WorkerHandle::Thread(thread) => {
                    let _ = tokio::task::spawn_blocking(move || thread.join()).await;
                }
            }
        }
    }
}
