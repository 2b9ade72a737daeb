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

//! The remote proxy
//!
//! A remote handle owns no mailbox, no dispatcher and no instance: it
//! forwards envelopes to the node that does, through the external
//! transport, addressed by the target's stable [`ActorId`]. Failures
//! surface as exceptional completions of the reply future (or as the
//! transport error of the send itself).

use crate::actor_ref::ActorRef;
use async_trait::async_trait;
use hive_core::{
    ActorId, Envelope, Fault, Message, MessageSender, NodeAddress, Payload, RemoteTransport,
    ReplyFuture, TransportError, WireEnvelope,
};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct RemoteProxy {
    id: ActorId,
    tag: String,
    address: NodeAddress,
    transport: Arc<dyn RemoteTransport>,
    reply_timeout: Duration,
}

impl RemoteProxy {
    pub(crate) fn new(
        id: ActorId,
        tag: impl Into<String>,
        address: NodeAddress,
        transport: Arc<dyn RemoteTransport>,
        reply_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(RemoteProxy {
            id,
            tag: tag.into(),
            address,
            transport,
            reply_timeout,
        })
    }

    pub(crate) fn id(&self) -> ActorId {
        self.id
    }

    pub(crate) fn tag(&self) -> String {
        self.tag.clone()
    }

    pub(crate) fn address(&self) -> &NodeAddress {
        &self.address
    }

    fn wire_envelope(
        &self,
        message: Message,
        sender: Option<&Arc<dyn MessageSender>>,
    ) -> WireEnvelope {
        WireEnvelope {
            target: self.id,
            target_tag: self.tag.clone(),
            message,
            sender: sender.map(|s| s.sender_id()),
            sender_home: Some(self.transport.self_address()),
        }
    }

    pub(crate) async fn tell(
        &self,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<(), Fault> {
        let wire = self.wire_envelope(message, sender.as_ref());
        self.transport
            .send_one_way(&self.address, wire)
            .await
            .map_err(Fault::from)
    }

    pub(crate) async fn ask(
        &self,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, Fault> {
        let timeout = timeout.unwrap_or(self.reply_timeout);
        let wire = self.wire_envelope(message, sender.as_ref());
        match self
            .transport
            .send_expecting_reply(&self.address, wire, timeout)
            .await
        {
            Ok(answer) => Ok(Some(answer.message)),
            Err(TransportError::ReplyTimeout(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn ask_future(
        self: &Arc<Self>,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> ReplyFuture {
        let reply = ReplyFuture::new();
        let wire = self.wire_envelope(message, sender.as_ref());
        let proxy = self.clone();
        let future = reply.clone();
        tokio::spawn(async move {
            match proxy
                .transport
                .send_expecting_reply(&proxy.address, wire, proxy.reply_timeout)
                .await
            {
                Ok(answer) => {
                    future.complete(answer.message).await;
                }
                Err(err) => {
                    future.complete_exceptionally(err.into()).await;
                }
            }
        });
        reply
    }

    /// Forwarded envelopes: user payloads travel the wire; a reply future
    /// is bridged by waiting for the remote answer on a task
    pub(crate) async fn dispatch_envelope(self: &Arc<Self>, envelope: Envelope) -> Result<(), Fault> {
        let Envelope {
            payload,
            sender,
            reply,
            transaction: _,
        } = envelope;
        let message = match payload {
            Payload::User(message) => message,
            Payload::System(notice) => {
                tracing::warn!(target_actor = %self.id, ?notice, "dropping system notice addressed to a remote handle");
                return Ok(());
            }
        };
        match reply {
            Some(reply) => {
                let wire = self.wire_envelope(message, sender.as_ref());
                let proxy = self.clone();
                tokio::spawn(async move {
                    match proxy
                        .transport
                        .send_expecting_reply(&proxy.address, wire, proxy.reply_timeout)
                        .await
                    {
                        Ok(answer) => {
                            reply.complete(answer.message).await;
                        }
                        Err(err) => {
                            reply.complete_exceptionally(err.into()).await;
                        }
                    }
                });
                Ok(())
            }
            None => self.tell(message, sender).await,
        }
    }
}

#[async_trait]
impl MessageSender for RemoteProxy {
    fn sender_id(&self) -> ActorId {
        self.id
    }

    async fn tell_from(
        &self,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<(), Fault> {
        self.tell(message, sender).await
    }
}

/// Build a handle for an actor living behind `addr`
pub(crate) fn remote_ref(
    id: ActorId,
    tag: impl Into<String>,
    addr: NodeAddress,
    transport: Arc<dyn RemoteTransport>,
    reply_timeout: Duration,
) -> ActorRef {
    ActorRef::from_remote(RemoteProxy::new(id, tag, addr, transport, reply_timeout))
}
