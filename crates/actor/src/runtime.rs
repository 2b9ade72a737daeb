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

//! The actor runtime
//!
//! ## Purpose
//! One [`ActorRuntime`] owns the registry, the default dispatcher and the
//! optional collaborators (STM, remote transport, payload codec). Handles
//! are built against a runtime; cloning one is cheap and every clone shares
//! the same state. Transport implementations hand inbound wire envelopes
//! back through [`ActorRuntime::deliver_wire`] and
//! [`ActorRuntime::deliver_wire_expecting_reply`].
//!
//! Construction spawns the default dispatcher's workers, so a runtime must
//! be created inside a Tokio context.

use crate::actor_ref::ActorRef;
use crate::builder::ActorBuilder;
use crate::registry::ActorRegistry;
use crate::remote;
use hive_core::{
    ActorId, Fault, Message, MessageCodec, MessageSender, NodeAddress, RemoteTransport,
    RuntimeConfig, Stm, WireEnvelope,
};
use hive_dispatch::MessageDispatcher;
use std::sync::Arc;
use std::time::Duration;

struct RuntimeInner {
    config: RuntimeConfig,
    registry: ActorRegistry,
    default_dispatcher: Arc<dyn MessageDispatcher>,
    stm: Option<Arc<dyn Stm>>,
    transport: Option<Arc<dyn RemoteTransport>>,
    codec: Option<Arc<dyn MessageCodec>>,
}

/// Shared state of one actor system
#[derive(Clone)]
pub struct ActorRuntime {
    inner: Arc<RuntimeInner>,
}

impl ActorRuntime {
    /// A runtime with default configuration and no collaborators
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A runtime with the given configuration and no collaborators
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Start assembling a runtime
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The registry of live actors
    pub fn registry(&self) -> &ActorRegistry {
        &self.inner.registry
    }

    /// The dispatcher handles use when their builder did not override it
    pub fn default_dispatcher(&self) -> Arc<dyn MessageDispatcher> {
        self.inner.default_dispatcher.clone()
    }

    pub(crate) fn stm(&self) -> Option<Arc<dyn Stm>> {
        self.inner.stm.clone()
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn RemoteTransport>> {
        self.inner.transport.clone()
    }

    pub(crate) fn codec(&self) -> Option<Arc<dyn MessageCodec>> {
        self.inner.codec.clone()
    }

    /// The address remote peers reach this node at
    pub fn home_address(&self) -> NodeAddress {
        self.inner
            .transport
            .as_ref()
            .map(|t| t.self_address())
            .unwrap_or_else(|| NodeAddress::new("localhost", 0))
    }

    /// Construct and start an actor
    pub async fn spawn(&self, builder: ActorBuilder) -> Result<ActorRef, Fault> {
        builder.spawn(self).await
    }

    /// Construct an actor homed on `addr` and start it
    pub async fn spawn_remote(
        &self,
        builder: ActorBuilder,
        addr: NodeAddress,
    ) -> Result<ActorRef, Fault> {
        let actor = builder.build(self);
        actor.make_remote(addr)?;
        actor.start().await?;
        Ok(actor)
    }

    /// A handle for an actor living behind `addr` on another node
    pub fn remote_ref(
        &self,
        id: ActorId,
        tag: impl Into<String>,
        addr: NodeAddress,
    ) -> Result<ActorRef, Fault> {
        let transport = self
            .inner
            .transport
            .clone()
            .ok_or_else(|| Fault::Transport("no remote transport configured".into()))?;
        Ok(remote::remote_ref(
            id,
            tag,
            addr,
            transport,
            self.inner.config.default_reply_timeout(),
        ))
    }

    /// Round-trip a payload through the codec when `serialize` is set
    ///
    /// Without a codec the payload is already an owned deep copy; with one,
    /// the round trip catches payloads that do not survive encoding.
    pub(crate) fn prepare_payload(&self, message: Message, serialize: bool) -> Result<Message, Fault> {
        if !serialize {
            return Ok(message);
        }
        match self.codec() {
            Some(codec) => {
                let bytes = codec
                    .encode(&message)
                    .map_err(|err| Fault::Transport(format!("payload codec: {}", err)))?;
                codec
                    .decode(&bytes)
                    .map_err(|err| Fault::Transport(format!("payload codec: {}", err)))
            }
            None => Ok(message),
        }
    }

    /// Deliver an inbound one-way wire envelope to its local target
    ///
    /// Called by transport implementations. The sender, when present,
    /// becomes a remote proxy so the handler's `reply` travels back over
    /// the wire.
    pub async fn deliver_wire(&self, wire: WireEnvelope) -> Result<(), Fault> {
        let target = self
            .registry()
            .find_by_id(&wire.target)
            .ok_or(Fault::Stopped)?;
        let sender = self.wire_sender(&wire);
        match target.local_cell() {
            Some(cell) => cell.tell(wire.message, sender).await,
            None => Err(Fault::Transport("wire target resolved to a remote handle".into())),
        }
    }

    /// Deliver an inbound ask-style wire envelope and wait for the reply
    pub async fn deliver_wire_expecting_reply(
        &self,
        wire: WireEnvelope,
        timeout: Option<Duration>,
    ) -> Result<WireEnvelope, Fault> {
        let target = self
            .registry()
            .find_by_id(&wire.target)
            .ok_or(Fault::Stopped)?;
        let sender_id = wire.sender;
        let sender = self.wire_sender(&wire);
        let timeout = timeout.unwrap_or_else(|| self.inner.config.default_reply_timeout());
        let cell = target
            .local_cell()
            .ok_or_else(|| Fault::Transport("wire target resolved to a remote handle".into()))?;
        match cell.ask(wire.message, sender, Some(timeout)).await? {
            Some(reply) => Ok(WireEnvelope {
                target: sender_id.unwrap_or_default(),
                target_tag: String::new(),
                message: reply,
                sender: Some(wire.target),
                sender_home: Some(self.home_address()),
            }),
            None => Err(Fault::AskTimeout(timeout)),
        }
    }

    fn wire_sender(&self, wire: &WireEnvelope) -> Option<Arc<dyn MessageSender>> {
        let id = wire.sender?;
        let home = wire.sender_home.clone()?;
        let transport = self.inner.transport.clone()?;
        let proxy = crate::remote::RemoteProxy::new(
            id,
            id.to_string(),
            home,
            transport,
            self.inner.config.default_reply_timeout(),
        );
        Some(proxy as Arc<dyn MessageSender>)
    }

    /// Stop every live actor, then the default dispatcher's workers
    pub async fn shutdown(&self) {
        for cell in self.registry().all_cells() {
            if let Err(cause) = cell.stop().await {
                tracing::warn!(actor = %cell.id(), %cause, "failed to stop actor during shutdown");
            }
        }
        self.inner.default_dispatcher.shutdown().await;
    }
}

impl Default for ActorRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles an [`ActorRuntime`]
#[derive(Default)]
pub struct RuntimeBuilder {
    config: Option<RuntimeConfig>,
    dispatcher: Option<Arc<dyn MessageDispatcher>>,
    stm: Option<Arc<dyn Stm>>,
    transport: Option<Arc<dyn RemoteTransport>>,
    codec: Option<Arc<dyn MessageCodec>>,
}

impl RuntimeBuilder {
    /// Use this configuration instead of the defaults
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this dispatcher as the default instead of building one from the
    /// configuration
    pub fn default_dispatcher(mut self, dispatcher: Arc<dyn MessageDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Attach the software-transactional-memory collaborator
    pub fn stm(mut self, stm: Arc<dyn Stm>) -> Self {
        self.stm = Some(stm);
        self
    }

    /// Attach the remote transport collaborator
    pub fn transport(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach the message payload codec
    pub fn codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Build the runtime; spawns the default dispatcher's workers
    pub fn build(self) -> ActorRuntime {
        let config = self.config.unwrap_or_default();
        let default_dispatcher = self
            .dispatcher
            .unwrap_or_else(|| hive_dispatch::from_config(&config));
        ActorRuntime {
            inner: Arc::new(RuntimeInner {
                config,
                registry: ActorRegistry::new(),
                default_dispatcher,
                stm: self.stm,
                transport: self.transport,
                codec: self.codec,
            }),
        }
    }
}
