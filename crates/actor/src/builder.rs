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

//! Builder for actor handles
//!
//! The factory closure given to [`ActorBuilder::new`] is kept for the whole
//! life of the handle: the supervision engine replays it to construct the
//! replacement instance on every restart. State that must survive a restart
//! belongs in the closure's captures, not in the instance.
//!
//! ## Examples
//! ```rust,ignore
//! let counter = ActorBuilder::new(|| Counter::default())
//!     .tag("counter")
//!     .fault_handling(FaultHandling::OneForOne {
//!         max_retries: 3,
//!         within: Duration::from_secs(1),
//!     })
//!     .trap_exit(FaultKind::Runtime)
//!     .spawn(&runtime)
//!     .await?;
//! ```

use crate::actor::Actor;
use crate::actor_ref::ActorRef;
use crate::cell::{ActorFactory, CellSettings, LocalActorCell};
use crate::runtime::ActorRuntime;
use hive_core::{Fault, FaultHandling, FaultKind, LifeCycle, MailboxKind, RejectionPolicy};
use hive_dispatch::MessageDispatcher;
use hive_mailbox::MailboxConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Assembles one actor handle
pub struct ActorBuilder {
    factory: ActorFactory,
    type_name: &'static str,
    tag: Option<String>,
    dispatcher: Option<Arc<dyn MessageDispatcher>>,
    mailbox: Option<MailboxConfig>,
    lifecycle: Option<LifeCycle>,
    trap_exits: HashSet<FaultKind>,
    fault_handling: FaultHandling,
    receive_timeout: Option<Duration>,
    reply_timeout: Option<Duration>,
    transactional: bool,
    serialize_messages: Option<bool>,
}

impl ActorBuilder {
    /// A builder around the instance factory
    ///
    /// The closure is called once now (for the first instance) and once per
    /// restart.
    pub fn new<A, F>(factory: F) -> Self
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        ActorBuilder {
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Actor>),
            type_name: std::any::type_name::<A>(),
            tag: None,
            dispatcher: None,
            mailbox: None,
            lifecycle: None,
            trap_exits: HashSet::new(),
            fault_handling: FaultHandling::None,
            receive_timeout: None,
            reply_timeout: None,
            transactional: false,
            serialize_messages: None,
        }
    }

    /// User-facing label (defaults to the stringified identity)
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Run on this dispatcher instead of the runtime default
    pub fn dispatcher(mut self, dispatcher: Arc<dyn MessageDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Mailbox backing for this actor
    pub fn mailbox(mut self, kind: MailboxKind, rejection: RejectionPolicy) -> Self {
        self.mailbox = Some(MailboxConfig { kind, rejection });
        self
    }

    /// Restart policy on failure (defaults to the runtime configuration)
    pub fn lifecycle(mut self, lifecycle: LifeCycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Add one failure kind this actor, as a supervisor, handles itself
    pub fn trap_exit(mut self, kind: FaultKind) -> Self {
        self.trap_exits.insert(kind);
        self
    }

    /// Replace the full trap set
    pub fn trap_exits(mut self, kinds: impl IntoIterator<Item = FaultKind>) -> Self {
        self.trap_exits = kinds.into_iter().collect();
        self
    }

    /// Strategy applied to trapped subordinate failures
    pub fn fault_handling(mut self, strategy: FaultHandling) -> Self {
        self.fault_handling = strategy;
        self
    }

    /// Deliver a `ReceiveTimeout` notice when the mailbox stays empty this long
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// Default `ask` deadline for this handle
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// Run every invocation under a transaction set from the STM collaborator
    pub fn transactional(mut self) -> Self {
        self.transactional = true;
        self
    }

    /// Override the runtime's `serialize_messages` setting for this actor
    pub fn serialize_messages(mut self, serialize: bool) -> Self {
        self.serialize_messages = Some(serialize);
        self
    }

    /// Build the handle in the NotStarted state
    pub fn build(self, runtime: &ActorRuntime) -> ActorRef {
        let config = runtime.config();
        let settings = CellSettings {
            tag: self.tag,
            reply_timeout: self
                .reply_timeout
                .unwrap_or_else(|| config.default_reply_timeout()),
            receive_timeout: self.receive_timeout,
            trap_exits: self.trap_exits,
            fault_handling: self.fault_handling,
            lifecycle: self.lifecycle.unwrap_or(config.default_lifecycle),
            dispatcher: self
                .dispatcher
                .unwrap_or_else(|| runtime.default_dispatcher()),
            mailbox_config: self
                .mailbox
                .unwrap_or_else(|| MailboxConfig::from_runtime(config)),
            transactional: self.transactional,
            serialize_messages: self.serialize_messages.unwrap_or(config.serialize_messages),
        };
        let cell = LocalActorCell::new(self.factory, self.type_name, settings, runtime.clone());
        ActorRef::from_local(cell)
    }

    /// Build and start
    pub async fn spawn(self, runtime: &ActorRuntime) -> Result<ActorRef, Fault> {
        let actor = self.build(runtime);
        actor.start().await?;
        Ok(actor)
    }
}
