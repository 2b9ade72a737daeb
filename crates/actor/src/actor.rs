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

//! The user-facing actor trait
//!
//! ## Purpose
//! An [`Actor`] is the message-handling object behind a handle. The runtime
//! guarantees that `handle` runs on one worker at a time, with the current
//! message installed in the [`ActorContext`] passed to the call: sender,
//! reply future and transaction set are explicit parameters of the frame,
//! not process-wide state.
//!
//! ## Lifecycle callbacks
//! `init` runs once on first start. On a restart the runtime calls
//! `pre_restart(cause)` on the failing instance, constructs a fresh instance
//! from the factory saved at build time, runs `init` (and
//! `init_transactional_state` for transactional actors) and then
//! `post_restart(cause)` on the replacement. `shutdown` runs on stop.
//!
//! A handler failure is a returned [`Fault`], or a panic, which the
//! runtime catches and converts; either way it never reaches the dispatcher
//! worker and is routed to the supervision engine instead.

use crate::context::ActorContext;
use async_trait::async_trait;
use hive_core::{ActorId, Fault, Message};
use std::time::Duration;

/// Supervision outcomes delivered to a supervisor actor
#[derive(Clone, Debug)]
pub enum SupervisionEvent {
    /// A subordinate blew its restart budget and was stopped
    MaxRestartsExceeded {
        /// The stopped subordinate
        subordinate: ActorId,
        /// The configured retry bound
        max_retries: u32,
        /// The configured window
        within: Duration,
        /// The failure that tipped it over
        cause: Fault,
    },
    /// A Temporary subordinate failed and was removed, leaving this
    /// supervisor with no subordinates
    UnlinkAndStop {
        /// The removed subordinate
        subordinate: ActorId,
    },
}

/// A message-handling object, hosted behind an actor handle
#[async_trait]
pub trait Actor: Send + 'static {
    /// Process one user message
    async fn handle(&mut self, ctx: &ActorContext, message: Message) -> Result<(), Fault>;

    /// Runs once when the actor first starts, and again on every restart
    /// (on the fresh instance)
    async fn init(&mut self, _ctx: &ActorContext) -> Result<(), Fault> {
        Ok(())
    }

    /// Runs after `init` for transactional actors
    async fn init_transactional_state(&mut self, _ctx: &ActorContext) -> Result<(), Fault> {
        Ok(())
    }

    /// Runs on the failing instance just before it is replaced
    async fn pre_restart(&mut self, _ctx: &ActorContext, _cause: &Fault) {}

    /// Runs on the replacement instance once it is initialized
    async fn post_restart(&mut self, _ctx: &ActorContext, _cause: &Fault) {}

    /// Runs when the actor is stopped
    async fn shutdown(&mut self) {}

    /// The mailbox stayed empty past the configured receive timeout
    async fn on_receive_timeout(&mut self, _ctx: &ActorContext) -> Result<(), Fault> {
        Ok(())
    }

    /// A subordinate failed with a kind this actor does not trap
    ///
    /// The default escalates: the supervisor itself fails with the
    /// subordinate's fault as cause, so the next supervisor up decides.
    async fn on_failed_subordinate(
        &mut self,
        _ctx: &ActorContext,
        subordinate: ActorId,
        cause: Fault,
    ) -> Result<(), Fault> {
        Err(Fault::Escalated {
            subordinate,
            cause: Box::new(cause),
        })
    }

    /// A supervision outcome concerning one of this actor's subordinates
    async fn on_supervision_event(&mut self, _ctx: &ActorContext, event: SupervisionEvent) {
        tracing::debug!(?event, "unhandled supervision event");
    }

    /// Serialize this instance's state for migration, if supported
    ///
    /// Framed by the external actor-state codec; the runtime never
    /// interprets the bytes.
    fn snapshot_state(&self) -> Option<Vec<u8>> {
        None
    }

    /// Restore state captured by [`Actor::snapshot_state`]
    fn restore_state(&mut self, _snapshot: &[u8]) {}
}
