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

//! The envelope queue and its processing token
//!
//! Lock discipline: the queue mutex guards only push/pop and is never held
//! across an await. The processing token is an atomic outside the mutex, so
//! the wake-up handshake (enqueue, then check the token) and the release
//! handshake (release, then re-check emptiness) can run without taking the
//! queue lock in lockstep. Both sides of the handshake are ordered through
//! SeqCst so no wake-up is lost.

use hive_core::{Envelope, Fault, MailboxKind, RejectionPolicy, RuntimeConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Backing and rejection configuration of one mailbox
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MailboxConfig {
    /// Queue backing
    pub kind: MailboxKind,
    /// What to do when a bounded queue is full
    pub rejection: RejectionPolicy,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        MailboxConfig {
            kind: MailboxKind::Unbounded,
            rejection: RejectionPolicy::Abort,
        }
    }
}

impl MailboxConfig {
    /// The process-wide default mailbox configuration
    pub fn from_runtime(config: &RuntimeConfig) -> Self {
        MailboxConfig {
            kind: config.mailbox,
            rejection: config.rejection_policy,
        }
    }
}

/// Outcome of an enqueue
#[derive(Debug)]
pub enum Enqueued {
    /// The envelope is queued
    Accepted,
    /// Caller-runs rejection: the queue is full and the caller must drain
    /// one envelope itself before retrying; the envelope is handed back
    CallerMustDrain(Envelope),
}

enum Verdict {
    Accepted,
    WaitForSpace(Envelope),
    Full,
    DiscardedNew(Envelope),
    DiscardedOldest(Envelope),
    CallerRuns(Envelope),
}

/// An ordered queue of envelopes plus the serial-execution permit
pub struct Mailbox {
    config: MailboxConfig,
    capacity: Option<usize>,
    queue: Mutex<VecDeque<Envelope>>,
    processing: AtomicBool,
    available: Notify,
    space: Notify,
}

impl Mailbox {
    /// An empty mailbox with the given configuration
    pub fn new(config: MailboxConfig) -> Self {
        let (capacity, queue) = match config.kind {
            MailboxKind::Unbounded => (None, VecDeque::new()),
            MailboxKind::BoundedLinked { capacity } => (Some(capacity.max(1)), VecDeque::new()),
            MailboxKind::BoundedArray { capacity, .. } => {
                let capacity = capacity.max(1);
                (Some(capacity), VecDeque::with_capacity(capacity))
            }
            MailboxKind::Synchronous => (Some(1), VecDeque::with_capacity(1)),
        };
        Mailbox {
            config,
            capacity,
            queue: Mutex::new(queue),
            processing: AtomicBool::new(false),
            available: Notify::new(),
            space: Notify::new(),
        }
    }

    fn blocks_for_space(&self) -> bool {
        match self.config.kind {
            MailboxKind::Synchronous => true,
            MailboxKind::BoundedArray { fair, .. } => fair,
            _ => false,
        }
    }

    /// Append an envelope
    ///
    /// A full bounded mailbox follows the configured rejection policy;
    /// synchronous and fair-array mailboxes wait for the consumer instead.
    /// Discarded envelopes are dropped silently (their reply future, if any,
    /// is left to time out at the caller).
    pub async fn enqueue(&self, envelope: Envelope) -> Result<Enqueued, Fault> {
        let mut pending = envelope;
        loop {
            let verdict = {
                let mut queue = self.queue.lock();
                match self.capacity {
                    Some(capacity) if queue.len() >= capacity => {
                        if self.blocks_for_space() {
                            Verdict::WaitForSpace(pending)
                        } else {
                            match self.config.rejection {
                                RejectionPolicy::Abort => Verdict::Full,
                                RejectionPolicy::Discard => Verdict::DiscardedNew(pending),
                                RejectionPolicy::DiscardOldest => {
                                    // capacity >= 1, so the queue is non-empty here
                                    let oldest = queue.pop_front();
                                    queue.push_back(pending);
                                    match oldest {
                                        Some(old) => Verdict::DiscardedOldest(old),
                                        None => Verdict::Accepted,
                                    }
                                }
                                RejectionPolicy::CallerRuns => Verdict::CallerRuns(pending),
                            }
                        }
                    }
                    _ => {
                        queue.push_back(pending);
                        Verdict::Accepted
                    }
                }
            };

            match verdict {
                Verdict::Accepted => {
                    self.available.notify_one();
                    return Ok(Enqueued::Accepted);
                }
                Verdict::WaitForSpace(envelope) => {
                    self.space.notified().await;
                    pending = envelope;
                }
                Verdict::Full => return Err(Fault::MailboxFull),
                Verdict::DiscardedNew(envelope) => {
                    tracing::debug!("mailbox full, discarding new envelope: {:?}", envelope);
                    return Ok(Enqueued::Accepted);
                }
                Verdict::DiscardedOldest(old) => {
                    tracing::debug!("mailbox full, discarding oldest envelope: {:?}", old);
                    self.available.notify_one();
                    return Ok(Enqueued::Accepted);
                }
                Verdict::CallerRuns(envelope) => {
                    return Ok(Enqueued::CallerMustDrain(envelope));
                }
            }
        }
    }

    /// Remove the next envelope, if any
    pub fn pop(&self) -> Option<Envelope> {
        let popped = self.queue.lock().pop_front();
        if popped.is_some() && self.capacity.is_some() {
            self.space.notify_one();
        }
        popped
    }

    /// Try to take the processing token
    pub fn try_acquire(&self) -> bool {
        self.processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Give the processing token back
    ///
    /// The releaser must re-check [`Mailbox::is_empty`] afterwards and
    /// reschedule a drain if envelopes arrived during processing; that
    /// re-check, paired with the enqueuer scheduling a drain whenever it
    /// observes a free token, is what makes wake-ups lossless.
    pub fn release(&self) {
        self.processing.store(false, Ordering::SeqCst);
    }

    /// Whether some worker currently holds the processing token
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Queued envelope count
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Wait until an envelope has been enqueued
    ///
    /// Used by dedicated-thread consumers. The notify permit survives a
    /// racing enqueue, so the `drain everything, then wait` loop does not
    /// lose envelopes that arrive between the last pop and the wait.
    pub async fn wait_available(&self) {
        self.available.notified().await;
    }

    /// Take every queued envelope, leaving the mailbox empty
    ///
    /// Used on detach; the caller completes reply futures on the leftovers
    /// exceptionally.
    pub fn drain(&self) -> Vec<Envelope> {
        let mut queue = self.queue.lock();
        let drained: Vec<Envelope> = queue.drain(..).collect();
        if !drained.is_empty() && self.capacity.is_some() {
            self.space.notify_one();
        }
        drained
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("kind", &self.config.kind)
            .field("len", &self.len())
            .field("processing", &self.is_processing())
            .finish()
    }
}
