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

//! Core types for the Hive actor runtime
//!
//! This crate holds the leaf types shared by the mailbox, dispatch and actor
//! crates: actor identities, the fault taxonomy, message and envelope types,
//! reply futures, runtime configuration, and the contracts for the external
//! collaborators (software-transactional memory, remote transport, payload
//! codecs). It exists to break the dependency cycles between the handle, the
//! dispatcher and the mailbox: an envelope can carry its sender as a
//! [`MessageSender`] trait object without this crate ever knowing what an
//! actor handle looks like.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod envelope;
pub mod fault;
pub mod id;
pub mod message;
pub mod reply;
pub mod transaction;
pub mod transport;

pub use codec::{ActorStateCodec, CodecError, MessageCodec};
pub use config::{
    DispatcherKind, LifeCycle, MailboxKind, RejectionPolicy, RuntimeConfig,
};
pub use envelope::{Envelope, MessageSender, Payload, SystemNotice};
pub use fault::{Fault, FaultHandling, FaultKind, LinkageFault};
pub use id::ActorId;
pub use message::Message;
pub use reply::ReplyFuture;
pub use transaction::{DeadTransactionError, JoinMode, Stm, TransactionSet};
pub use transport::{NodeAddress, RemoteTransport, TransportError, WireEnvelope};
