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

//! Fault taxonomy and supervision policy data
//!
//! ## Purpose
//! Every way an operation in the runtime can fail is a [`Fault`] variant.
//! Contract violations (`NotStarted`, `Stopped`, `NoSenderInScope`, linkage
//! and remote misuse) surface synchronously at the offending call site;
//! handler raises never reach a dispatcher worker; they are routed to the
//! supervision engine and, at most, complete an in-flight reply future
//! exceptionally.
//!
//! ## Trap sets
//! A supervisor declares the [`FaultKind`]s it handles. The kind of a fault
//! is its classification for trap-set membership, not its full identity:
//! `UserHandlerRaised` carries the kind the handler raised with, an
//! escalated fault classifies as the kind of its root cause.

use crate::id::ActorId;
use std::fmt;
use std::time::Duration;

/// Classification of a failure, used for trap-exit matching
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FaultKind {
    /// Ordinary runtime failure raised by a handler
    Runtime,
    /// The transaction set attached to the message died
    Transaction,
    /// `init` or `init_transactional_state` failed
    Initialization,
    /// The handler panicked
    Panic,
    /// Application-defined failure kind
    Custom(String),
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Runtime => write!(f, "runtime"),
            FaultKind::Transaction => write!(f, "transaction"),
            FaultKind::Initialization => write!(f, "initialization"),
            FaultKind::Panic => write!(f, "panic"),
            FaultKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Detail for linkage contract violations
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinkageFault {
    /// The subordinate is already supervised; a node has at most one supervisor
    #[error("{subordinate} already has a supervisor")]
    AlreadySupervised {
        /// The subordinate that was being linked
        subordinate: ActorId,
    },

    /// Attempt to unlink an actor that is not in the subordinate map
    #[error("{subordinate} is not linked to {supervisor}")]
    NotLinked {
        /// The supervisor the unlink was issued on
        supervisor: ActorId,
        /// The actor that was not linked
        subordinate: ActorId,
    },
}

/// A failure inside the runtime or raised by user code
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Fault {
    /// The handle has not been started yet
    #[error("actor has not been started")]
    NotStarted,

    /// The handle has been stopped; it never runs again
    #[error("actor has been stopped")]
    Stopped,

    /// A bounded mailbox rejected the envelope
    #[error("mailbox is full")]
    MailboxFull,

    /// The reply future did not complete within the deadline
    #[error("no reply within {0:?}")]
    AskTimeout(Duration),

    /// `reply` or `forward` was called with no sender and no reply future in scope
    #[error("no sender or reply future in scope")]
    NoSenderInScope,

    /// Link-graph contract violation
    #[error("linkage error: {0}")]
    Linkage(#[from] LinkageFault),

    /// A local-only operation was invoked on a remote handle
    #[error("`{0}` is not supported on a remote handle")]
    RemoteOperationUnsupported(&'static str),

    /// The transaction set attached to the in-flight message was aborted
    #[error("transaction set aborted: {0}")]
    TransactionSetAborted(String),

    /// The user message handler raised
    #[error("handler raised ({kind}): {message}")]
    UserHandlerRaised {
        /// Classification used for trap-set matching
        kind: FaultKind,
        /// Human-readable cause
        message: String,
    },

    /// A subordinate failed more than `max_retries` times within `within`
    #[error("{subordinate} exceeded {max_retries} restarts within {within:?}")]
    MaxRestartsExceeded {
        /// The subordinate that was stopped
        subordinate: ActorId,
        /// The configured retry bound
        max_retries: u32,
        /// The configured window
        within: Duration,
        /// The failure that tipped it over
        cause: Box<Fault>,
    },

    /// `init` or `init_transactional_state` failed during start or restart
    #[error("actor initialization failed: {0}")]
    InitializationFailed(String),

    /// A subordinate's untrapped failure escalated to its supervisor
    #[error("subordinate {subordinate} escalated: {cause}")]
    Escalated {
        /// The failing subordinate
        subordinate: ActorId,
        /// Its failure
        cause: Box<Fault>,
    },

    /// The remote transport failed to deliver
    #[error("transport: {0}")]
    Transport(String),

    /// An operation was issued in a lifecycle state that does not allow it
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl Fault {
    /// A handler-raised fault with an explicit kind
    pub fn raised(kind: FaultKind, message: impl Into<String>) -> Self {
        Fault::UserHandlerRaised {
            kind,
            message: message.into(),
        }
    }

    /// A handler-raised fault of kind [`FaultKind::Runtime`]
    pub fn runtime(message: impl Into<String>) -> Self {
        Fault::raised(FaultKind::Runtime, message)
    }

    /// Classification for trap-set membership
    ///
    /// Escalated faults classify as their root cause so a grand-supervisor
    /// trapping `Runtime` also traps a `Runtime` failure that bubbled up
    /// through an intermediate supervisor.
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::UserHandlerRaised { kind, .. } => kind.clone(),
            Fault::TransactionSetAborted(_) => FaultKind::Transaction,
            Fault::InitializationFailed(_) => FaultKind::Initialization,
            Fault::Escalated { cause, .. } => cause.kind(),
            Fault::MaxRestartsExceeded { cause, .. } => cause.kind(),
            _ => FaultKind::Runtime,
        }
    }
}

/// Fault-handling strategy of a supervisor, as data
///
/// The restart counter lives on the failing subordinate for `OneForOne` and
/// on the supervisor itself for `AllForOne`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum FaultHandling {
    /// The supervisor has no strategy; untrapped failures escalate
    #[default]
    None,
    /// Restart only the failing subordinate
    OneForOne {
        /// Restarts tolerated inside the window
        max_retries: u32,
        /// Width of the failure window
        within: Duration,
    },
    /// Restart every subordinate of the supervisor
    AllForOne {
        /// Restarts tolerated inside the window
        max_retries: u32,
        /// Width of the failure window
        within: Duration,
    },
}
