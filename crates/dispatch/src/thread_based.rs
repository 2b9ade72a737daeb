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

//! The thread-based dispatcher
//!
//! One dedicated OS thread per actor: the strongest isolation and the
//! simplest mental model. The thread blocks on the mailbox's availability
//! signal, drains whatever is queued, and goes back to sleep. There is no
//! ready queue; enqueue wakes the owning thread directly.

use crate::worker::{enqueue_with_policy, DispatchEntry};
use crate::{DispatchTarget, MessageDispatcher};
use async_trait::async_trait;
use dashmap::DashMap;
use hive_core::{ActorId, Envelope, Fault};
use hive_mailbox::{Mailbox, MailboxConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct ThreadEntry {
    mailbox: Arc<Mailbox>,
    target: Arc<dyn DispatchTarget>,
    shutdown: Arc<AtomicBool>,
    stop: Arc<Notify>,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

/// Dispatcher giving every actor its own OS thread
pub struct ThreadBasedDispatcher {
    name: String,
    entries: DashMap<ActorId, Arc<ThreadEntry>>,
}

impl ThreadBasedDispatcher {
    /// A dispatcher that will spawn one thread per attached actor
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(ThreadBasedDispatcher {
            name: name.into(),
            entries: DashMap::new(),
        })
    }

    async fn detach_entry(&self, id: &ActorId) -> Vec<Envelope> {
        let entry = match self.entries.remove(id) {
            Some((_, entry)) => entry,
            None => return Vec::new(),
        };
        entry.shutdown.store(true, Ordering::SeqCst);
        entry.stop.notify_waiters();
        if let Some(thread) = entry.thread.lock().take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }
        entry.mailbox.drain()
    }
}

#[async_trait]
impl MessageDispatcher for ThreadBasedDispatcher {
    async fn attach(
        &self,
        target: Arc<dyn DispatchTarget>,
        mailbox: MailboxConfig,
    ) -> Result<(), Fault> {
        let id = target.target_id();
        let entry = Arc::new(ThreadEntry {
            mailbox: Arc::new(Mailbox::new(mailbox)),
            target,
            shutdown: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(Notify::new()),
            thread: Mutex::new(None),
        });

        let mailbox = entry.mailbox.clone();
        let target = entry.target.clone();
        let shutdown = entry.shutdown.clone();
        let stop = entry.stop.clone();
        let thread_name = format!("{}-actor-{}", self.name, id);
        let spawned = std::thread::Builder::new().name(thread_name.clone()).spawn(
            move || match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(async move {
                    loop {
                        if mailbox.try_acquire() {
                            while let Some(envelope) = mailbox.pop() {
                                target.invoke(envelope).await;
                            }
                            mailbox.release();
                        }
                        if shutdown.load(Ordering::SeqCst) {
                            break;
                        }
                        tokio::select! {
                            _ = mailbox.wait_available() => {}
                            _ = stop.notified() => {}
                        }
                    }
                }),
                Err(err) => {
                    tracing::error!(thread = %thread_name, %err, "failed to build actor thread runtime")
                }
            },
        );

        match spawned {
            Ok(handle) => {
                *entry.thread.lock() = Some(handle);
                self.entries.insert(id, entry);
                Ok(())
            }
            Err(err) => Err(Fault::InitializationFailed(format!(
                "failed to spawn actor thread: {}",
                err
            ))),
        }
    }

    async fn detach(&self, id: &ActorId) -> Vec<Envelope> {
        self.detach_entry(id).await
    }

    async fn dispatch(&self, id: &ActorId, envelope: Envelope) -> Result<(), Fault> {
        let entry = match self.entries.get(id) {
            Some(entry) => entry.value().clone(),
            None => {
                envelope.complete_exceptionally(Fault::Stopped).await;
                return Err(Fault::Stopped);
            }
        };
        let dispatch_entry = DispatchEntry {
            mailbox: entry.mailbox.clone(),
            target: entry.target.clone(),
        };
        // enqueue signals the mailbox's availability notify, which is what
        // the owning thread sleeps on; no separate wake-up is needed
        enqueue_with_policy(&dispatch_entry, envelope).await
    }

    fn mailbox_size(&self, id: &ActorId) -> usize {
        self.entries.get(id).map(|e| e.mailbox.len()).unwrap_or(0)
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn shutdown(&self) {
        let ids: Vec<ActorId> = self.entries.iter().map(|e| *e.key()).collect();
        for id in ids {
            for envelope in self.detach_entry(&id).await {
                envelope.complete_exceptionally(Fault::Stopped).await;
            }
        }
    }
}
