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

//! Dispatchers for the Hive actor runtime
//!
//! A dispatcher owns execution resources (a thread, a pool, a set of pinned
//! workers) and the mailboxes of the actors attached to it. Handles hold
//! only a dispatcher reference plus their id; the dispatcher keys mailboxes
//! by [`ActorId`], which is what breaks the handle/dispatcher/mailbox
//! reference cycle.
//!
//! ## Variants
//! - [`ThreadBasedDispatcher`]: one dedicated OS thread per actor
//! - [`EventDrivenDispatcher::executor`]: N actors over dedicated executor
//!   threads, throughput-bounded drains
//! - [`EventDrivenDispatcher::cooperative_single_thread`]: everything on one
//!   worker, one envelope per turn
//! - [`EventDrivenDispatcher::cooperative_pool`]: shared pool with a work
//!   queue of ready mailboxes (the default)
//! - [`PinnedDispatcher`]: like the executor pool, but an actor is bound to
//!   one worker at attach time and only ever drained there
//!
//! ## The wake-up handshake
//! `dispatch` enqueues and, when it observes a free processing token,
//! schedules a drain itself. A worker that releases the token re-checks the
//! mailbox and reschedules when envelopes arrived during processing. One of
//! the two sides always sees the work, so no wake-up is lost and the token
//! is never held across an enqueue.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod event_driven;
mod pinned;
mod thread_based;
mod worker;

pub use event_driven::EventDrivenDispatcher;
pub use pinned::PinnedDispatcher;
pub use thread_based::ThreadBasedDispatcher;

use async_trait::async_trait;
use hive_core::{ActorId, DispatcherKind, Envelope, Fault, RuntimeConfig};
use hive_mailbox::MailboxConfig;
use std::sync::Arc;

/// The invocation side of an actor handle, as seen by a dispatcher worker
///
/// Implemented by the local handle; `invoke` runs the user handler with the
/// envelope installed as the current message. The worker holds the target's
/// processing token for the whole call, including any supervision decision
/// taken on a raise, so a restart's instance swap is visible to the next
/// drain.
#[async_trait]
pub trait DispatchTarget: Send + Sync {
    /// Identity of the actor behind this target
    fn target_id(&self) -> ActorId;

    /// Process one envelope
    async fn invoke(&self, envelope: Envelope);
}

/// A scheduler that owns mailboxes and drives message processing
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    /// Admit an actor: allocate its mailbox and any per-actor resources
    async fn attach(
        &self,
        target: Arc<dyn DispatchTarget>,
        mailbox: MailboxConfig,
    ) -> Result<(), Fault>;

    /// Remove an actor and free its mailbox
    ///
    /// Returns the envelopes left undrained; the caller decides their fate
    /// (on stop they are discarded with their reply futures completed
    /// exceptionally).
    async fn detach(&self, id: &ActorId) -> Vec<Envelope>;

    /// Enqueue an envelope and make sure a drain is scheduled
    async fn dispatch(&self, id: &ActorId, envelope: Envelope) -> Result<(), Fault>;

    /// Queued envelope count for an attached actor, zero otherwise
    fn mailbox_size(&self, id: &ActorId) -> usize;

    /// Display name for logging
    fn name(&self) -> &str;

    /// Stop the workers; attached mailboxes stop being drained
    async fn shutdown(&self);
}

/// Build the dispatcher variant a configuration asks for
pub fn from_config(config: &RuntimeConfig) -> Arc<dyn MessageDispatcher> {
    match config.default_dispatcher {
        DispatcherKind::ThreadBased => ThreadBasedDispatcher::new("default"),
        DispatcherKind::ExecutorEventDriven => {
            EventDrivenDispatcher::executor("default", default_parallelism(), config.throughput)
        }
        DispatcherKind::CooperativeSingleThread => {
            EventDrivenDispatcher::cooperative_single_thread("default")
        }
        DispatcherKind::CooperativePool => {
            EventDrivenDispatcher::cooperative_pool("default", default_parallelism(), config.throughput)
        }
        DispatcherKind::Pinned => {
            PinnedDispatcher::new("default", default_parallelism(), config.throughput)
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
