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

//! Actor handles, lifecycle and supervision for the Hive runtime
//!
//! ## Purpose
//! This crate turns user-defined message handlers ([`Actor`]) into
//! independently schedulable entities behind identity-preserving handles
//! ([`ActorRef`]): local or remote, restartable under supervision, reachable
//! through the registry, all with at-most-one-message-at-a-time execution
//! of the mutable instance.
//!
//! ## Key pieces
//! - [`ActorRef`]: the cloneable, location-transparent handle
//! - [`Actor`]: the trait user message handlers implement
//! - [`ActorBuilder`]: factory, tag, dispatcher, mailbox, supervision knobs
//! - [`ActorRuntime`]: registry + default dispatcher + collaborators
//! - [`ActorContext`]: per-invocation sender/reply/transaction frame
//! - [`timer`]: one-shot and periodic scheduled sends
//!
//! Supervision (trap sets, one-for-one / all-for-one strategies, restart
//! windows, Temporary removal, escalation) runs inside the crate; user code
//! observes it through the [`Actor`] hooks and the linkage operations on
//! [`ActorRef`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod actor;
mod actor_ref;
mod builder;
mod cell;
mod context;
mod registry;
mod remote;
mod runtime;
mod supervision;
pub mod timer;

pub use actor::{Actor, SupervisionEvent};
pub use actor_ref::{ActorRef, ActorState, CurrentMessage};
pub use builder::ActorBuilder;
pub use context::ActorContext;
pub use registry::ActorRegistry;
pub use runtime::{ActorRuntime, RuntimeBuilder};
