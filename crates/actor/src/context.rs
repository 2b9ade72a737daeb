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

//! The per-invocation actor context
//!
//! ## Purpose
//! The context is the current message made explicit: self handle, sender,
//! reply future and transaction set for exactly one handler call. The
//! worker builds it before invoking the handler and it dies with the frame,
//! so "ambient" sender state can never leak across messages or across
//! actors sharing a worker.

use crate::actor_ref::ActorRef;
use crate::builder::ActorBuilder;
use crate::runtime::ActorRuntime;
use hive_core::{
    ActorId, Envelope, Fault, Message, MessageSender, NodeAddress, ReplyFuture, TransactionSet,
};
use std::sync::Arc;

/// Everything a handler may touch about the message it is processing
pub struct ActorContext {
    self_ref: ActorRef,
    self_sender: Arc<dyn MessageSender>,
    sender: Option<Arc<dyn MessageSender>>,
    reply: Option<ReplyFuture>,
    transaction: Option<Arc<dyn TransactionSet>>,
    runtime: ActorRuntime,
}

impl ActorContext {
    pub(crate) fn new(
        self_ref: ActorRef,
        self_sender: Arc<dyn MessageSender>,
        sender: Option<Arc<dyn MessageSender>>,
        reply: Option<ReplyFuture>,
        transaction: Option<Arc<dyn TransactionSet>>,
        runtime: ActorRuntime,
    ) -> Self {
        ActorContext {
            self_ref,
            self_sender,
            sender,
            reply,
            transaction,
            runtime,
        }
    }

    /// Handle of the actor processing the message
    pub fn self_ref(&self) -> &ActorRef {
        &self.self_ref
    }

    /// Identity of the sending actor, when the send originated inside one
    pub fn sender_id(&self) -> Option<ActorId> {
        self.sender.as_ref().map(|s| s.sender_id())
    }

    /// Whether the current message expects a reply
    pub fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// The transaction set the current message runs under, if any
    pub fn transaction(&self) -> Option<&Arc<dyn TransactionSet>> {
        self.transaction.as_ref()
    }

    /// The runtime this actor lives in
    pub fn runtime(&self) -> &ActorRuntime {
        &self.runtime
    }

    /// Answer the current message
    ///
    /// Completes the reply future when the message carries one, otherwise
    /// tells the sender. Fails with [`Fault::NoSenderInScope`] when the
    /// message has neither.
    pub async fn reply(&self, message: Message) -> Result<(), Fault> {
        if let Some(reply) = &self.reply {
            reply.complete(message).await;
            return Ok(());
        }
        if let Some(sender) = &self.sender {
            return sender
                .tell_from(message, Some(self.self_sender.clone()))
                .await;
        }
        Err(Fault::NoSenderInScope)
    }

    /// Pass the current message on, preserving its sender and reply future
    ///
    /// The ultimate `reply` downstream completes the original caller's
    /// future, not this actor's.
    pub async fn forward(&self, target: &ActorRef, message: Message) -> Result<(), Fault> {
        let mut envelope = Envelope::user(message)
            .with_sender(self.sender.clone())
            .with_transaction(self.transaction.clone());
        if let Some(reply) = &self.reply {
            envelope = envelope.with_reply(reply.clone());
        }
        target.dispatch_envelope(envelope).await
    }

    /// Construct and start an actor
    pub async fn spawn(&self, builder: ActorBuilder) -> Result<ActorRef, Fault> {
        builder.spawn(&self.runtime).await
    }

    /// Construct an actor, link it under this one, then start it
    pub async fn spawn_link(&self, builder: ActorBuilder) -> Result<ActorRef, Fault> {
        let subordinate = builder.build(&self.runtime);
        self.self_ref.link(&subordinate).await?;
        subordinate.start().await?;
        Ok(subordinate)
    }

    /// Construct an actor homed on a remote node and start it
    pub async fn spawn_remote(
        &self,
        builder: ActorBuilder,
        addr: NodeAddress,
    ) -> Result<ActorRef, Fault> {
        let actor = builder.build(&self.runtime);
        actor.make_remote(addr)?;
        actor.start().await?;
        Ok(actor)
    }

    /// Construct a remote-homed actor, link it under this one, then start it
    pub async fn spawn_link_remote(
        &self,
        builder: ActorBuilder,
        addr: NodeAddress,
    ) -> Result<ActorRef, Fault> {
        let actor = builder.build(&self.runtime);
        actor.make_remote(addr.clone())?;
        self.self_ref.link(&actor).await?;
        actor.start().await?;
        Ok(actor)
    }
}
