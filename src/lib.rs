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

//! Hive: a supervised actor runtime
//!
//! An actor is an addressable, single-threaded handler of asynchronous
//! messages. A handle to it can be held by many sites, can point at a local
//! or a remote instance, and can be restarted or replaced without the
//! holders noticing. Hive provides the handle and lifecycle core, a family
//! of interchangeable dispatchers, and the supervision hierarchy that turns
//! an unhandled failure into a bounded, policy-driven recovery.
//!
//! The member crates are re-exported here under one roof:
//! - [`core`]: identities, faults, messages, envelopes, configuration, and
//!   the contracts of the external collaborators (STM, transport, codecs)
//! - [`mailbox`]: the envelope queue and its serial-execution token
//! - [`dispatch`]: thread-based, event-driven, cooperative and pinned
//!   dispatchers
//! - [`actor`]: handles, lifecycle, supervision, registry, remote proxies

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub use hive_actor as actor;
pub use hive_core as core;
pub use hive_dispatch as dispatch;
pub use hive_mailbox as mailbox;

// The working set most applications need
pub use hive_actor::{
    Actor, ActorBuilder, ActorContext, ActorRef, ActorRegistry, ActorRuntime, ActorState,
    CurrentMessage, SupervisionEvent,
};
pub use hive_core::{
    ActorId, Fault, FaultHandling, FaultKind, LifeCycle, Message, NodeAddress, ReplyFuture,
    RuntimeConfig,
};

/// Everything needed to define and drive actors, in one import
pub mod prelude {
    pub use crate::actor::timer;
    pub use hive_actor::{
        Actor, ActorBuilder, ActorContext, ActorRef, ActorRuntime, ActorState, SupervisionEvent,
    };
    pub use hive_core::{
        ActorId, DispatcherKind, Fault, FaultHandling, FaultKind, LifeCycle, MailboxKind, Message,
        NodeAddress, RejectionPolicy, ReplyFuture, RuntimeConfig,
    };
    pub use hive_dispatch::{
        EventDrivenDispatcher, MessageDispatcher, PinnedDispatcher, ThreadBasedDispatcher,
    };
}
