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

//! ActorRef, the location-transparent handle
//!
//! ## Purpose
//! The only externally visible reference to an actor. A handle is cheap to
//! clone, safe to share, and multiplexes between a local cell and a remote
//! proxy behind one operation table. Identity is stable across restarts and
//! across serialization to another node, so holders keep reaching the
//! logical actor while the instance behind it is replaced or moved.
//!
//! ## Local vs remote
//! Local-only operations (`start`, `stop`, `link`, lifecycle setters)
//! surface [`Fault::RemoteOperationUnsupported`] at the call site on a
//! remote handle rather than pretending to succeed. `tell`, `ask` and
//! `ask_future` work on both; remote failures surface as exceptional
//! completions of the reply future.

use crate::cell::LocalActorCell;
use crate::remote::RemoteProxy;
use hive_core::{
    ActorId, Envelope, Fault, FaultHandling, FaultKind, Message, MessageSender, NodeAddress,
    ReplyFuture,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle state of a handle
///
/// ```text
/// NotStarted --start--> Running
/// Running    --fail--> BeingRestarted --restartedOK--> Running
/// Running    --stop--> Stopped
/// BeingRestarted --restartLimitExceeded--> Stopped
/// ```
///
/// `Stopped` is terminal: a stopped handle never runs again and its
/// identity is not reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ActorState {
    /// Built but not yet started
    NotStarted = 0,
    /// Processing messages
    Running = 1,
    /// Between a failure and the completed instance swap
    BeingRestarted = 2,
    /// Terminal
    Stopped = 3,
}

impl ActorState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorState::NotStarted,
            1 => ActorState::Running,
            2 => ActorState::BeingRestarted,
            _ => ActorState::Stopped,
        }
    }
}

/// Observational snapshot of the message a handler is processing right now
///
/// The slot behind this is written only by the worker draining the mailbox
/// and is non-empty only for the duration of one handler call.
#[derive(Clone, Debug)]
pub struct CurrentMessage {
    /// Identity of the sending actor, when the send originated inside one
    pub sender: Option<ActorId>,
    /// Whether the message carries a reply future
    pub expects_reply: bool,
}

#[derive(Clone)]
enum ActorRefInner {
    Local(Arc<LocalActorCell>),
    Remote(Arc<RemoteProxy>),
}

/// A cloneable, location-transparent handle to an actor
#[derive(Clone)]
pub struct ActorRef {
    inner: ActorRefInner,
}

impl ActorRef {
    pub(crate) fn from_local(cell: Arc<LocalActorCell>) -> Self {
        ActorRef {
            inner: ActorRefInner::Local(cell),
        }
    }

    pub(crate) fn from_remote(proxy: Arc<RemoteProxy>) -> Self {
        ActorRef {
            inner: ActorRefInner::Remote(proxy),
        }
    }

    pub(crate) fn local_cell(&self) -> Option<Arc<LocalActorCell>> {
        match &self.inner {
            ActorRefInner::Local(cell) => Some(cell.clone()),
            ActorRefInner::Remote(_) => None,
        }
    }

    fn require_local(&self, operation: &'static str) -> Result<&Arc<LocalActorCell>, Fault> {
        match &self.inner {
            ActorRefInner::Local(cell) => Ok(cell),
            ActorRefInner::Remote(_) => Err(Fault::RemoteOperationUnsupported(operation)),
        }
    }

    fn as_sender(&self) -> Arc<dyn MessageSender> {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.clone() as Arc<dyn MessageSender>,
            ActorRefInner::Remote(proxy) => proxy.clone() as Arc<dyn MessageSender>,
        }
    }

    // ------------------------------------------------------------------
    // Identity and observation
    // ------------------------------------------------------------------

    /// Stable identity; preserved across restarts and serialization
    pub fn id(&self) -> ActorId {
        match &self.inner {
            ActorRefInner::Local(cell) => *cell.id(),
            ActorRefInner::Remote(proxy) => proxy.id(),
        }
    }

    /// User-facing label; defaults to the stringified identity
    pub fn tag(&self) -> String {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.tag(),
            ActorRefInner::Remote(proxy) => proxy.tag(),
        }
    }

    /// Relabel the actor (local handles only)
    pub fn set_tag(&self, tag: impl Into<String>) -> Result<(), Fault> {
        self.require_local("set_tag")?.set_tag(tag);
        Ok(())
    }

    /// Current lifecycle state
    ///
    /// A remote proxy reports `Running`: it tracks no lifecycle of its own,
    /// and failures surface at the transport instead.
    pub fn state(&self) -> ActorState {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.state(),
            ActorRefInner::Remote(_) => ActorState::Running,
        }
    }

    /// Whether the handle can currently accept sends
    pub fn is_running(&self) -> bool {
        matches!(self.state(), ActorState::Running | ActorState::BeingRestarted)
    }

    /// Whether the handle points at a remote node
    pub fn is_remote(&self) -> bool {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.remote_address().is_some(),
            ActorRefInner::Remote(_) => true,
        }
    }

    /// Queued envelope count (zero for remote handles)
    pub fn mailbox_size(&self) -> usize {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.mailbox_size(),
            ActorRefInner::Remote(_) => 0,
        }
    }

    /// Snapshot of the message currently being processed, if any
    pub fn current_message(&self) -> Option<CurrentMessage> {
        self.local_cell().and_then(|cell| cell.current_message())
    }

    /// The node that owns the actor: the remote home for remote-homed
    /// handles and proxies, this runtime's address otherwise
    pub fn home_address(&self) -> NodeAddress {
        match &self.inner {
            ActorRefInner::Local(cell) => cell
                .remote_address()
                .unwrap_or_else(|| cell.runtime().home_address()),
            ActorRefInner::Remote(proxy) => proxy.address().clone(),
        }
    }

    /// Identity of this actor's supervisor, if it is linked under one
    pub fn supervisor_id(&self) -> Option<ActorId> {
        self.local_cell()
            .and_then(|cell| cell.supervisor_cell())
            .map(|supervisor| *supervisor.id())
    }

    /// Identities in this actor's subordinate map
    pub fn subordinate_ids(&self) -> Vec<ActorId> {
        self.local_cell()
            .map(|cell| cell.subordinate_ids())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start processing messages
    pub async fn start(&self) -> Result<(), Fault> {
        self.require_local("start")?.start().await
    }

    /// Stop for good: subordinates are stopped and unlinked first, then the
    /// instance's `shutdown` runs, remaining envelopes are discarded with
    /// their reply futures completed exceptionally, and the handle leaves
    /// the registry
    pub async fn stop(&self) -> Result<(), Fault> {
        self.require_local("stop")?.stop().await
    }

    /// Home this actor on a remote node; legal only before `start` (or
    /// while being restarted)
    pub fn make_remote(&self, addr: NodeAddress) -> Result<(), Fault> {
        self.require_local("make_remote")?.make_remote(addr)
    }

    /// Replace the dispatcher; legal only before `start`
    pub fn set_dispatcher(
        &self,
        dispatcher: Arc<dyn hive_dispatch::MessageDispatcher>,
    ) -> Result<(), Fault> {
        self.require_local("set_dispatcher")?.set_dispatcher(dispatcher)
    }

    /// Deliver a `ReceiveTimeout` notice whenever the mailbox stays empty
    /// this long; `None` disarms
    pub fn set_receive_timeout(&self, timeout: Option<Duration>) -> Result<(), Fault> {
        self.require_local("set_receive_timeout")?
            .set_receive_timeout(timeout);
        Ok(())
    }

    /// Default deadline for `ask` on this handle
    pub fn set_reply_timeout(&self, timeout: Duration) -> Result<(), Fault> {
        self.require_local("set_reply_timeout")?
            .set_reply_timeout(timeout);
        Ok(())
    }

    /// Failure kinds this actor, as a supervisor, handles itself
    pub fn set_trap_exits(&self, kinds: HashSet<FaultKind>) -> Result<(), Fault> {
        self.require_local("set_trap_exits")?.set_trap_exits(kinds);
        Ok(())
    }

    /// Fault-handling strategy applied to trapped subordinate failures
    pub fn set_fault_handling(&self, strategy: FaultHandling) -> Result<(), Fault> {
        self.require_local("set_fault_handling")?
            .set_fault_handling(strategy);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Fire-and-forget send
    ///
    /// Fails with [`Fault::NotStarted`] before `start` and
    /// [`Fault::Stopped`] after `stop`.
    pub async fn tell(&self, message: Message) -> Result<(), Fault> {
        self.tell_from(message, None).await
    }

    /// Fire-and-forget send with an explicit sender handle
    pub async fn tell_from(
        &self,
        message: Message,
        sender: Option<&ActorRef>,
    ) -> Result<(), Fault> {
        let sender = sender.map(ActorRef::as_sender);
        match &self.inner {
            ActorRefInner::Local(cell) => cell.tell(message, sender).await,
            ActorRefInner::Remote(proxy) => proxy.tell(message, sender).await,
        }
    }

    /// Send and wait for the reply
    ///
    /// ## Returns
    /// - `Ok(Some(reply))` when the handler replied in time
    /// - `Ok(None)` when `timeout` (or the handle's default) elapsed
    /// - `Err(fault)` when the handler raised and the reply future completed
    ///   exceptionally
    pub async fn ask(
        &self,
        message: Message,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, Fault> {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.ask(message, None, timeout).await,
            ActorRefInner::Remote(proxy) => proxy.ask(message, None, timeout).await,
        }
    }

    /// Send and return the reply future without waiting
    pub async fn ask_future(&self, message: Message) -> Result<ReplyFuture, Fault> {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.ask_future(message, None).await,
            ActorRefInner::Remote(proxy) => Ok(proxy.ask_future(message, None)),
        }
    }

    pub(crate) async fn dispatch_envelope(&self, envelope: Envelope) -> Result<(), Fault> {
        match &self.inner {
            ActorRefInner::Local(cell) => cell.dispatch_envelope(envelope).await,
            ActorRefInner::Remote(proxy) => proxy.dispatch_envelope(envelope).await,
        }
    }

    // ------------------------------------------------------------------
    // Linkage
    // ------------------------------------------------------------------

    /// Install this actor as `subordinate`'s supervisor
    ///
    /// Fails with a linkage fault when the subordinate already has one; a
    /// node has at most one supervisor.
    pub async fn link(&self, subordinate: &ActorRef) -> Result<(), Fault> {
        let supervisor = self.require_local("link")?;
        let subordinate = subordinate.require_local("link")?;
        supervisor.link(subordinate).await
    }

    /// Remove `subordinate` from this actor's subordinate map
    pub async fn unlink(&self, subordinate: &ActorRef) -> Result<(), Fault> {
        let supervisor = self.require_local("unlink")?;
        let subordinate = subordinate.require_local("unlink")?;
        supervisor.unlink(subordinate).await
    }

    /// Link, then start the subordinate
    pub async fn start_link(&self, subordinate: &ActorRef) -> Result<(), Fault> {
        self.link(subordinate).await?;
        subordinate.start().await
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ActorRef {}

impl std::fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id())
            .field("tag", &self.tag())
            .field("state", &self.state())
            .field("remote", &self.is_remote())
            .finish()
    }
}
