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

//! Mailboxes for the Hive actor runtime
//!
//! A mailbox is a FIFO of envelopes plus the *processing token*: the
//! per-actor permit that guarantees at most one worker drains the mailbox
//! (and therefore at most one thread touches the actor instance) at any
//! time. Acquisition rules are dispatcher-specific; the token itself is a
//! single CAS here.
//!
//! ## Backing configurations
//! - `unbounded`: grow without bound (default)
//! - `bounded-linked(n)` / `bounded-array(n, fair)`: cap the queue; a full
//!   queue follows the configured [`RejectionPolicy`], except that a *fair*
//!   array mailbox blocks enqueuers for space in arrival order instead
//! - `synchronous`: rendezvous handoff; an enqueue waits until the
//!   consumer has drained the previous envelope

#![warn(missing_docs)]
#![warn(clippy::all)]

mod mailbox;

pub use mailbox::{Enqueued, Mailbox, MailboxConfig};
