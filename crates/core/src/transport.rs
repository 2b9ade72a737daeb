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

//! Remote transport collaborator contract
//!
//! The wire transport is external; the runtime hands it [`WireEnvelope`]s
//! and node addresses and never touches sockets. Inbound envelopes are
//! delivered back to the runtime by the transport implementation through
//! the actor runtime's wire-delivery entry points.

use crate::id::ActorId;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A node endpoint
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    /// Host name or address
    pub host: String,
    /// Port
    pub port: u16,
}

impl NodeAddress {
    /// An address from host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        NodeAddress {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An envelope in its transport-facing form
///
/// Payload bytes inside [`Message`] are already opaque; the transport
/// applies the message codec and moves the result. Identity travels with
/// the envelope so the receiving node resolves the logical actor even after
/// a restart on its side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// The target actor
    pub target: ActorId,
    /// The target's user-facing tag, for logging on the receiving node
    pub target_tag: String,
    /// The payload
    pub message: Message,
    /// Identity of the sending actor, when the send originated inside one
    pub sender: Option<ActorId>,
    /// The sender's home node, for routing replies
    pub sender_home: Option<NodeAddress>,
}

/// Failure surfaced by the transport
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The node did not answer
    #[error("node {0} is unreachable")]
    Unreachable(NodeAddress),
    /// The receiving node has no handler registered for the target
    #[error("no handler registered for {0}")]
    UnknownTarget(ActorId),
    /// The reply did not arrive within the deadline
    #[error("no reply within {0:?}")]
    ReplyTimeout(Duration),
    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for crate::fault::Fault {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ReplyTimeout(timeout) => crate::fault::Fault::AskTimeout(timeout),
            other => crate::fault::Fault::Transport(other.to_string()),
        }
    }
}

/// The wire transport consumed by remote handles
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Deliver a fire-and-forget envelope
    async fn send_one_way(
        &self,
        addr: &NodeAddress,
        envelope: WireEnvelope,
    ) -> Result<(), TransportError>;

    /// Deliver an envelope and wait for the reply
    async fn send_expecting_reply(
        &self,
        addr: &NodeAddress,
        envelope: WireEnvelope,
        timeout: Duration,
    ) -> Result<WireEnvelope, TransportError>;

    /// Announce that `id` is reachable through `addr`
    async fn register_handle(
        &self,
        addr: &NodeAddress,
        id: &ActorId,
    ) -> Result<(), TransportError>;

    /// Withdraw a registration
    async fn unregister_handle(
        &self,
        addr: &NodeAddress,
        id: &ActorId,
    ) -> Result<(), TransportError>;

    /// The address of this node's own remote server
    fn self_address(&self) -> NodeAddress;
}
