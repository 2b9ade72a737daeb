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

//! Message envelopes
//!
//! ## Purpose
//! An [`Envelope`] is the unit that flows through mailboxes: the payload
//! plus the sender handle, the optional reply future, and the opaque
//! transaction-set token the sender was running under. It is created by the
//! sender, owned by the mailbox until drained, and consumed exactly once.
//!
//! ## The sender cycle
//! Envelopes need to carry "who sent this" so a handler can reply by tell,
//! but the handle type lives two crates up. [`MessageSender`] is the
//! narrow trait that breaks the cycle: the handle implements it, the
//! envelope stores it as a trait object, and this crate never learns what a
//! handle is.

use crate::fault::Fault;
use crate::id::ActorId;
use crate::message::Message;
use crate::reply::ReplyFuture;
use crate::transaction::TransactionSet;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// The send half of an actor handle
///
/// Implemented by local handles (enqueue to the mailbox) and used wherever
/// an envelope or context needs to address its originator without depending
/// on the handle crate.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Identity of the actor behind this sender
    fn sender_id(&self) -> ActorId;

    /// Fire-and-forget send with an explicit sender
    async fn tell_from(
        &self,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<(), Fault>;
}

/// Runtime-generated payloads delivered through the ordinary mailbox
#[derive(Clone, Debug)]
pub enum SystemNotice {
    /// A subordinate's untrapped failure escalated to this supervisor
    Failed {
        /// The failing subordinate
        subordinate: ActorId,
        /// Its failure
        cause: Fault,
    },
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
    /// A Temporary subordinate failed and was removed; the supervisor has no
    /// subordinates left
    UnlinkAndStop {
        /// The removed subordinate
        subordinate: ActorId,
    },
    /// The mailbox stayed empty past the configured receive timeout
    ReceiveTimeout,
}

/// What an envelope carries
#[derive(Debug)]
pub enum Payload {
    /// A user message for the actor's handler
    User(Message),
    /// A runtime notification
    System(SystemNotice),
}

/// A message in transit
pub struct Envelope {
    /// The payload
    pub payload: Payload,
    /// Handle of the sending actor, when the send originated inside one
    pub sender: Option<Arc<dyn MessageSender>>,
    /// Reply future for ask-style sends
    pub reply: Option<ReplyFuture>,
    /// Transaction-set token the sender was running under
    pub transaction: Option<Arc<dyn TransactionSet>>,
}

impl Envelope {
    /// An envelope carrying a user message
    pub fn user(message: Message) -> Self {
        Envelope {
            payload: Payload::User(message),
            sender: None,
            reply: None,
            transaction: None,
        }
    }

    /// An envelope carrying a runtime notification
    pub fn system(notice: SystemNotice) -> Self {
        Envelope {
            payload: Payload::System(notice),
            sender: None,
            reply: None,
            transaction: None,
        }
    }

    /// Attach the sending handle
    pub fn with_sender(mut self, sender: Option<Arc<dyn MessageSender>>) -> Self {
        self.sender = sender;
        self
    }

    /// Attach a reply future
    pub fn with_reply(mut self, reply: ReplyFuture) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Attach the sender's transaction-set token
    pub fn with_transaction(mut self, transaction: Option<Arc<dyn TransactionSet>>) -> Self {
        self.transaction = transaction;
        self
    }

    /// Complete the reply future exceptionally, if the envelope carries one
    ///
    /// Used on every path that drops an envelope without invoking a handler:
    /// discarding after stop, draining a detached mailbox.
    pub async fn complete_exceptionally(&self, fault: Fault) {
        if let Some(reply) = &self.reply {
            reply.complete_exceptionally(fault).await;
        }
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("payload", &self.payload)
            .field("sender", &self.sender.as_ref().map(|s| s.sender_id()))
            .field("has_reply", &self.reply.is_some())
            .field("has_transaction", &self.transaction.is_some())
            .finish()
    }
}
