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

//! The local actor cell
//!
//! ## Purpose
//! The cell is everything behind a local handle: identity, lifecycle state,
//! the mutable actor instance and the factory that rebuilds it, the link
//! graph edges at this node, and the invoke path a dispatcher worker drives.
//!
//! ## Guard discipline
//! The cell guard (an async mutex) covers lifecycle transitions and link
//! mutations only; it is never held across user code. Serial execution of
//! the instance is enforced by the mailbox's processing token, which the
//! dispatcher worker holds for the whole of `invoke`, including the
//! supervision decision on a raise, so a restart's instance swap is visible
//! to the next drain.

use crate::actor::Actor;
use crate::actor_ref::{ActorRef, ActorState, CurrentMessage};
use crate::context::ActorContext;
use crate::runtime::ActorRuntime;
use crate::supervision;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use hive_core::{
    ActorId, Envelope, Fault, FaultHandling, FaultKind, JoinMode, LifeCycle, Message,
    MessageSender, NodeAddress, Payload, ReplyFuture, SystemNotice, TransactionSet, WireEnvelope,
};
use hive_dispatch::{DispatchTarget, MessageDispatcher};
use hive_mailbox::MailboxConfig;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

pub(crate) type ActorFactory = Arc<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

/// Restart accounting for one counter (per-subordinate for one-for-one,
/// per-supervisor for all-for-one)
#[derive(Debug, Default)]
pub(crate) struct RestartWindow {
    pub count: u32,
    pub window_start: Option<Instant>,
}

pub(crate) struct LocalActorCell {
    id: ActorId,
    self_weak: Weak<LocalActorCell>,
    tag: RwLock<String>,
    state: AtomicU8,
    reply_timeout: RwLock<Duration>,
    receive_timeout: RwLock<Option<Duration>>,
    trap_exits: RwLock<HashSet<FaultKind>>,
    fault_handling: RwLock<FaultHandling>,
    lifecycle: RwLock<LifeCycle>,
    dispatcher: RwLock<Arc<dyn MessageDispatcher>>,
    mailbox_config: MailboxConfig,
    remote_address: RwLock<Option<NodeAddress>>,
    supervisor: RwLock<Option<Weak<LocalActorCell>>>,
    subordinates: Mutex<IndexMap<ActorId, ActorRef>>,
    current_message: RwLock<Option<CurrentMessage>>,
    instance: tokio::sync::Mutex<Box<dyn Actor>>,
    factory: ActorFactory,
    type_name: &'static str,
    restart_window: Mutex<RestartWindow>,
    strategy_window: Mutex<RestartWindow>,
    guard: tokio::sync::Mutex<()>,
    timeout_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    transactional: bool,
    serialize_messages: bool,
    runtime: ActorRuntime,
}

/// Everything a builder has decided about a new cell
pub(crate) struct CellSettings {
    pub tag: Option<String>,
    pub reply_timeout: Duration,
    pub receive_timeout: Option<Duration>,
    pub trap_exits: HashSet<FaultKind>,
    pub fault_handling: FaultHandling,
    pub lifecycle: LifeCycle,
    pub dispatcher: Arc<dyn MessageDispatcher>,
    pub mailbox_config: MailboxConfig,
    pub transactional: bool,
    pub serialize_messages: bool,
}

impl LocalActorCell {
    pub(crate) fn new(
        factory: ActorFactory,
        type_name: &'static str,
        settings: CellSettings,
        runtime: ActorRuntime,
    ) -> Arc<Self> {
        let id = ActorId::new();
        let instance = factory();
        Arc::new_cyclic(|weak| LocalActorCell {
            id,
            self_weak: weak.clone(),
            tag: RwLock::new(settings.tag.unwrap_or_else(|| id.to_string())),
            state: AtomicU8::new(ActorState::NotStarted as u8),
            reply_timeout: RwLock::new(settings.reply_timeout),
            receive_timeout: RwLock::new(settings.receive_timeout),
            trap_exits: RwLock::new(settings.trap_exits),
            fault_handling: RwLock::new(settings.fault_handling),
            lifecycle: RwLock::new(settings.lifecycle),
            dispatcher: RwLock::new(settings.dispatcher),
            mailbox_config: settings.mailbox_config,
            remote_address: RwLock::new(None),
            supervisor: RwLock::new(None),
            subordinates: Mutex::new(IndexMap::new()),
            current_message: RwLock::new(None),
            instance: tokio::sync::Mutex::new(instance),
            factory,
            type_name,
            restart_window: Mutex::new(RestartWindow::default()),
            strategy_window: Mutex::new(RestartWindow::default()),
            guard: tokio::sync::Mutex::new(()),
            timeout_task: Mutex::new(None),
            transactional: settings.transactional,
            serialize_messages: settings.serialize_messages,
            runtime,
        })
    }

    // ------------------------------------------------------------------
    // Plain accessors
    // ------------------------------------------------------------------

    pub(crate) fn id(&self) -> &ActorId {
        &self.id
    }

    pub(crate) fn tag(&self) -> String {
        self.tag.read().clone()
    }

    pub(crate) fn set_tag(&self, tag: impl Into<String>) {
        let tag = tag.into();
        let old = std::mem::replace(&mut *self.tag.write(), tag.clone());
        self.runtime.registry().update_tag(&self.id, &old, tag);
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn state(&self) -> ActorState {
        ActorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: ActorState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn lifecycle(&self) -> LifeCycle {
        *self.lifecycle.read()
    }

    pub(crate) fn fault_handling(&self) -> FaultHandling {
        self.fault_handling.read().clone()
    }

    pub(crate) fn set_fault_handling(&self, strategy: FaultHandling) {
        *self.fault_handling.write() = strategy;
    }

    pub(crate) fn traps(&self, kind: &FaultKind) -> bool {
        self.trap_exits.read().contains(kind)
    }

    pub(crate) fn set_trap_exits(&self, kinds: HashSet<FaultKind>) {
        *self.trap_exits.write() = kinds;
    }

    pub(crate) fn reply_timeout(&self) -> Duration {
        *self.reply_timeout.read()
    }

    pub(crate) fn set_reply_timeout(&self, timeout: Duration) {
        *self.reply_timeout.write() = timeout;
    }

    pub(crate) fn set_receive_timeout(&self, timeout: Option<Duration>) {
        *self.receive_timeout.write() = timeout;
        match timeout {
            Some(_) if self.state() == ActorState::Running => self.arm_receive_timeout(),
            _ => self.cancel_receive_timeout(),
        }
    }

    pub(crate) fn dispatcher(&self) -> Arc<dyn MessageDispatcher> {
        self.dispatcher.read().clone()
    }

    pub(crate) fn set_dispatcher(&self, dispatcher: Arc<dyn MessageDispatcher>) -> Result<(), Fault> {
        if self.state() != ActorState::NotStarted {
            return Err(Fault::InvalidState(
                "dispatcher can only be changed before start".into(),
            ));
        }
        *self.dispatcher.write() = dispatcher;
        Ok(())
    }

    pub(crate) fn remote_address(&self) -> Option<NodeAddress> {
        self.remote_address.read().clone()
    }

    pub(crate) fn make_remote(&self, addr: NodeAddress) -> Result<(), Fault> {
        match self.state() {
            ActorState::NotStarted | ActorState::BeingRestarted => {
                *self.remote_address.write() = Some(addr);
                Ok(())
            }
            other => Err(Fault::InvalidState(format!(
                "make_remote is only legal before start or while restarting, not in {:?}",
                other
            ))),
        }
    }

    pub(crate) fn runtime(&self) -> &ActorRuntime {
        &self.runtime
    }

    pub(crate) fn self_ref(&self) -> ActorRef {
        // the weak always upgrades while any caller can reach the cell
        ActorRef::from_local(
            self.self_weak
                .upgrade()
                .expect("cell outlives its own invocation"),
        )
    }

    fn self_arc(&self) -> Option<Arc<LocalActorCell>> {
        self.self_weak.upgrade()
    }

    pub(crate) fn current_message(&self) -> Option<CurrentMessage> {
        self.current_message.read().clone()
    }

    pub(crate) fn mailbox_size(&self) -> usize {
        self.dispatcher().mailbox_size(&self.id)
    }

    // ------------------------------------------------------------------
    // Link graph
    // ------------------------------------------------------------------

    pub(crate) fn supervisor_cell(&self) -> Option<Arc<LocalActorCell>> {
        self.supervisor.read().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn subordinate_ids(&self) -> Vec<ActorId> {
        self.subordinates.lock().keys().copied().collect()
    }

    pub(crate) fn subordinate_cells(&self) -> Vec<Arc<LocalActorCell>> {
        self.subordinates
            .lock()
            .values()
            .filter_map(ActorRef::local_cell)
            .collect()
    }

    /// Remove one subordinate; returns true when the map is empty afterwards
    pub(crate) fn remove_subordinate(&self, id: &ActorId) -> bool {
        let mut subordinates = self.subordinates.lock();
        subordinates.shift_remove(id);
        subordinates.is_empty()
    }

    pub(crate) async fn link(self: &Arc<Self>, subordinate: &Arc<LocalActorCell>) -> Result<(), Fault> {
        let _guard = self.guard.lock().await;
        {
            let mut slot = subordinate.supervisor.write();
            if slot.as_ref().and_then(Weak::upgrade).is_some() {
                return Err(hive_core::LinkageFault::AlreadySupervised {
                    subordinate: subordinate.id,
                }
                .into());
            }
            *slot = Some(Arc::downgrade(self));
        }
        self.subordinates
            .lock()
            .insert(subordinate.id, subordinate.self_ref());
        tracing::debug!(supervisor = %self.id, subordinate = %subordinate.id, "linked");
        Ok(())
    }

    pub(crate) async fn unlink(self: &Arc<Self>, subordinate: &Arc<LocalActorCell>) -> Result<(), Fault> {
        let _guard = self.guard.lock().await;
        let removed = self.subordinates.lock().shift_remove(&subordinate.id);
        if removed.is_none() {
            return Err(hive_core::LinkageFault::NotLinked {
                supervisor: self.id,
                subordinate: subordinate.id,
            }
            .into());
        }
        *subordinate.supervisor.write() = None;
        tracing::debug!(supervisor = %self.id, subordinate = %subordinate.id, "unlinked");
        Ok(())
    }

    /// Drain the subordinate map, clearing each backlink
    fn take_subordinates(&self) -> Vec<ActorRef> {
        let subordinates: Vec<ActorRef> = {
            let mut map = self.subordinates.lock();
            map.drain(..).map(|(_, subordinate)| subordinate).collect()
        };
        for subordinate in &subordinates {
            if let Some(cell) = subordinate.local_cell() {
                *cell.supervisor.write() = None;
            }
        }
        subordinates
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub(crate) async fn start(self: &Arc<Self>) -> Result<(), Fault> {
        let _guard = self.guard.lock().await;
        match self.state() {
            ActorState::Running | ActorState::BeingRestarted => return Ok(()),
            ActorState::Stopped => return Err(Fault::Stopped),
            ActorState::NotStarted => {}
        }

        if let Some(addr) = self.remote_address() {
            // client-managed remote actor: the instance is hosted behind
            // `addr`; this node only forwards envelopes
            let transport = self
                .runtime
                .transport()
                .ok_or_else(|| Fault::Transport("no remote transport configured".into()))?;
            transport
                .register_handle(&addr, &self.id)
                .await
                .map_err(Fault::from)?;
            self.runtime.registry().register(self);
            self.set_state(ActorState::Running);
            tracing::debug!(actor = %self.id, %addr, "started as remote-homed handle");
            return Ok(());
        }

        let dispatcher = self.dispatcher();
        dispatcher
            .attach(self.clone() as Arc<dyn DispatchTarget>, self.mailbox_config)
            .await?;
        self.runtime.registry().register(self);
        self.set_state(ActorState::Running);

        let ctx = self.base_context();
        let init_result = {
            let mut instance = self.instance.lock().await;
            let mut result = instance.init(&ctx).await;
            if result.is_ok() && self.transactional {
                result = instance.init_transactional_state(&ctx).await;
            }
            result
        };
        if let Err(cause) = init_result {
            tracing::error!(actor = %self.id, %cause, "actor initialization failed");
            self.runtime.registry().unregister(self);
            for envelope in dispatcher.detach(&self.id).await {
                envelope.complete_exceptionally(Fault::Stopped).await;
            }
            self.set_state(ActorState::Stopped);
            return Err(Fault::InitializationFailed(cause.to_string()));
        }

        self.arm_receive_timeout();
        tracing::debug!(actor = %self.id, tag = %self.tag(), "started");
        Ok(())
    }

    pub(crate) fn stop(self: &Arc<Self>) -> BoxFuture<'static, Result<(), Fault>> {
        let cell = self.clone();
        Box::pin(async move {
            {
                let _guard = cell.guard.lock().await;
                match cell.state() {
                    ActorState::Stopped => return Ok(()),
                    ActorState::NotStarted => {
                        // never ran; the id is still burned
                        cell.set_state(ActorState::Stopped);
                        return Ok(());
                    }
                    _ => cell.set_state(ActorState::Stopped),
                }
            }

            // subordinates are stopped and unlinked before the actor itself
            for subordinate in cell.take_subordinates() {
                if let Some(sub_cell) = subordinate.local_cell() {
                    if let Err(cause) = sub_cell.stop().await {
                        tracing::warn!(subordinate = %sub_cell.id, %cause, "failed to stop subordinate");
                    }
                }
            }

            // shutdown callback; deferred when the handler is self-stopping
            // (the instance lock is held by the very frame that called us)
            match cell.instance.try_lock() {
                Ok(mut instance) => {
                    if AssertUnwindSafe(instance.shutdown()).catch_unwind().await.is_err() {
                        tracing::warn!(actor = %cell.id, "shutdown callback panicked");
                    }
                }
                Err(_) => {
                    let deferred = cell.clone();
                    tokio::spawn(async move {
                        let mut instance = deferred.instance.lock().await;
                        if AssertUnwindSafe(instance.shutdown()).catch_unwind().await.is_err() {
                            tracing::warn!(actor = %deferred.id, "shutdown callback panicked");
                        }
                    });
                }
            }

            cell.cancel_receive_timeout();

            if let Some(addr) = cell.remote_address() {
                if let Some(transport) = cell.runtime.transport() {
                    if let Err(err) = transport.unregister_handle(&addr, &cell.id).await {
                        tracing::warn!(actor = %cell.id, %err, "failed to unregister remote handle");
                    }
                }
            } else {
                // enqueued but undrained envelopes are discarded; their
                // reply futures complete exceptionally
                for envelope in cell.dispatcher().detach(&cell.id).await {
                    envelope.complete_exceptionally(Fault::Stopped).await;
                }
            }

            cell.runtime.registry().unregister(&cell);
            tracing::debug!(actor = %cell.id, tag = %cell.tag(), "stopped");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    fn check_send_state(&self) -> Result<(), Fault> {
        match self.state() {
            ActorState::NotStarted => Err(Fault::NotStarted),
            ActorState::Stopped => Err(Fault::Stopped),
            // in-flight envelopes queue across a restart
            ActorState::Running | ActorState::BeingRestarted => Ok(()),
        }
    }

    fn current_transaction(&self) -> Option<Arc<dyn TransactionSet>> {
        self.runtime
            .stm()
            .and_then(|stm| stm.current_transaction_set())
    }

    fn wire_envelope(&self, message: Message, sender: Option<&Arc<dyn MessageSender>>) -> WireEnvelope {
        WireEnvelope {
            target: self.id,
            target_tag: self.tag(),
            message,
            sender: sender.map(|s| s.sender_id()),
            sender_home: self.runtime.transport().map(|t| t.self_address()),
        }
    }

    pub(crate) async fn dispatch_envelope(&self, envelope: Envelope) -> Result<(), Fault> {
        self.check_send_state()?;
        self.dispatcher().dispatch(&self.id, envelope).await
    }

    pub(crate) async fn tell(
        &self,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<(), Fault> {
        self.check_send_state()?;
        let message = self.runtime.prepare_payload(message, self.serialize_messages)?;

        if let Some(addr) = self.remote_address() {
            let transport = self
                .runtime
                .transport()
                .ok_or_else(|| Fault::Transport("no remote transport configured".into()))?;
            let wire = self.wire_envelope(message, sender.as_ref());
            return transport
                .send_one_way(&addr, wire)
                .await
                .map_err(Fault::from);
        }

        let envelope = Envelope::user(message)
            .with_sender(sender)
            .with_transaction(self.current_transaction());
        self.dispatcher().dispatch(&self.id, envelope).await
    }

    pub(crate) async fn ask(
        &self,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, Fault> {
        let timeout = timeout.unwrap_or_else(|| self.reply_timeout());
        let reply = self.ask_future(message, sender).await?;
        match reply.wait(timeout).await {
            Ok(message) => Ok(Some(message)),
            Err(Fault::AskTimeout(_)) => Ok(None),
            Err(fault) => Err(fault),
        }
    }

    pub(crate) async fn ask_future(
        &self,
        message: Message,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<ReplyFuture, Fault> {
        self.check_send_state()?;
        let message = self.runtime.prepare_payload(message, self.serialize_messages)?;
        let reply = ReplyFuture::new();

        if let Some(addr) = self.remote_address() {
            let transport = self
                .runtime
                .transport()
                .ok_or_else(|| Fault::Transport("no remote transport configured".into()))?;
            let wire = self.wire_envelope(message, sender.as_ref());
            let timeout = self.reply_timeout();
            let future = reply.clone();
            tokio::spawn(async move {
                match transport.send_expecting_reply(&addr, wire, timeout).await {
                    Ok(answer) => {
                        future.complete(answer.message).await;
                    }
                    Err(err) => {
                        future.complete_exceptionally(err.into()).await;
                    }
                }
            });
            return Ok(reply);
        }

        let envelope = Envelope::user(message)
            .with_sender(sender)
            .with_reply(reply.clone())
            .with_transaction(self.current_transaction());
        self.dispatcher().dispatch(&self.id, envelope).await?;
        Ok(reply)
    }

    pub(crate) async fn notify_system(&self, notice: SystemNotice) {
        if let Err(cause) = self.dispatch_envelope(Envelope::system(notice)).await {
            tracing::warn!(actor = %self.id, %cause, "dropping system notice");
        }
    }

    // ------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------

    pub(crate) fn base_context(&self) -> ActorContext {
        let self_sender: Arc<dyn MessageSender> = self
            .self_weak
            .upgrade()
            .expect("cell outlives its own invocation");
        ActorContext::new(
            self.self_ref(),
            self_sender,
            None,
            None,
            None,
            self.runtime.clone(),
        )
    }

    async fn run_handler(
        &self,
        ctx: &ActorContext,
        payload: Payload,
    ) -> Result<(), Fault> {
        match payload {
            Payload::User(message) => {
                let mut instance = self.instance.lock().await;
                match AssertUnwindSafe(instance.handle(ctx, message))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(panic) => Err(Fault::raised(FaultKind::Panic, panic_message(panic))),
                }
            }
            Payload::System(notice) => self.handle_system(notice, ctx).await,
        }
    }

    async fn handle_system(&self, notice: SystemNotice, ctx: &ActorContext) -> Result<(), Fault> {
        match notice {
            SystemNotice::ReceiveTimeout => {
                let mut instance = self.instance.lock().await;
                instance.on_receive_timeout(ctx).await
            }
            SystemNotice::Failed { subordinate, cause } => {
                let mut instance = self.instance.lock().await;
                instance.on_failed_subordinate(ctx, subordinate, cause).await
            }
            SystemNotice::MaxRestartsExceeded {
                subordinate,
                max_retries,
                within,
                cause,
            } => {
                let mut instance = self.instance.lock().await;
                instance
                    .on_supervision_event(
                        ctx,
                        crate::actor::SupervisionEvent::MaxRestartsExceeded {
                            subordinate,
                            max_retries,
                            within,
                            cause,
                        },
                    )
                    .await;
                Ok(())
            }
            SystemNotice::UnlinkAndStop { subordinate } => {
                let mut instance = self.instance.lock().await;
                instance
                    .on_supervision_event(
                        ctx,
                        crate::actor::SupervisionEvent::UnlinkAndStop { subordinate },
                    )
                    .await;
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Restart support (driven by the supervision engine)
    // ------------------------------------------------------------------

    /// Record a failure against this cell's own counter (one-for-one);
    /// true while within budget
    pub(crate) fn note_failure(&self, max_retries: u32, within: Duration) -> bool {
        Self::bump_window(&mut self.restart_window.lock(), max_retries, within)
    }

    /// Record a subordinate failure against this cell's per-supervisor
    /// counter (all-for-one); true while within budget
    pub(crate) fn note_strategy_failure(&self, max_retries: u32, within: Duration) -> bool {
        Self::bump_window(&mut self.strategy_window.lock(), max_retries, within)
    }

    fn bump_window(window: &mut RestartWindow, max_retries: u32, within: Duration) -> bool {
        let now = Instant::now();
        match window.window_start {
            None => {
                window.window_start = Some(now);
                window.count = 1;
            }
            Some(start) => {
                window.count += 1;
                if now.duration_since(start) > within {
                    window.count = 1;
                    window.window_start = Some(now);
                }
            }
        }
        window.count <= max_retries
    }

    /// Swap in a fresh instance: pre_restart, factory, init, post_restart
    pub(crate) async fn rebuild_instance(&self, cause: &Fault) -> Result<(), Fault> {
        let ctx = self.base_context();
        let mut instance = self.instance.lock().await;
        if AssertUnwindSafe(instance.pre_restart(&ctx, cause))
            .catch_unwind()
            .await
            .is_err()
        {
            tracing::warn!(actor = %self.id, "pre_restart panicked");
        }
        *instance = (self.factory)();
        instance
            .init(&ctx)
            .await
            .map_err(|err| Fault::InitializationFailed(err.to_string()))?;
        if self.transactional {
            instance
                .init_transactional_state(&ctx)
                .await
                .map_err(|err| Fault::InitializationFailed(err.to_string()))?;
        }
        if AssertUnwindSafe(instance.post_restart(&ctx, cause))
            .catch_unwind()
            .await
            .is_err()
        {
            tracing::warn!(actor = %self.id, "post_restart panicked");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Receive timeout
    // ------------------------------------------------------------------

    pub(crate) fn arm_receive_timeout(&self) {
        let duration = match *self.receive_timeout.read() {
            Some(duration) => duration,
            None => return,
        };
        if self.state() != ActorState::Running {
            return;
        }
        let weak = self.self_weak.clone();
        let mut slot = self.timeout_task.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(cell) = weak.upgrade() {
                if cell.state() == ActorState::Running {
                    cell.notify_system(SystemNotice::ReceiveTimeout).await;
                }
            }
        }));
    }

    pub(crate) fn cancel_receive_timeout(&self) {
        if let Some(task) = self.timeout_task.lock().take() {
            task.abort();
        }
    }
}

#[async_trait]
impl DispatchTarget for LocalActorCell {
    fn target_id(&self) -> ActorId {
        self.id
    }

    async fn invoke(&self, envelope: Envelope) {
        if self.state() == ActorState::Stopped {
            tracing::debug!(actor = %self.id, "discarding envelope for stopped actor");
            envelope.complete_exceptionally(Fault::Stopped).await;
            return;
        }

        let Envelope {
            payload,
            sender,
            reply,
            transaction,
        } = envelope;

        // a message is being processed: the pending receive-timeout one-shot
        // is stale
        self.cancel_receive_timeout();

        // transaction resolution for this invocation
        let mut created_transaction = false;
        let transaction: Option<Arc<dyn TransactionSet>> = match (&transaction, self.runtime.stm()) {
            (Some(set), _) => match set.join(JoinMode::Requires) {
                Ok(()) => Some(set.clone()),
                Err(dead) => {
                    let cause = Fault::TransactionSetAborted(dead.0);
                    if let Some(reply) = &reply {
                        reply.complete_exceptionally(cause.clone()).await;
                    }
                    if let Some(cell) = self.self_arc() {
                        supervision::handle_failure(cell, cause).await;
                    }
                    return;
                }
            },
            (None, Some(stm)) if self.transactional => {
                created_transaction = true;
                Some(stm.create_new_transaction_set())
            }
            _ => None,
        };

        *self.current_message.write() = Some(CurrentMessage {
            sender: sender.as_ref().map(|s| s.sender_id()),
            expects_reply: reply.is_some(),
        });

        let self_sender: Arc<dyn MessageSender> = match self.self_arc() {
            Some(cell) => cell as Arc<dyn MessageSender>,
            None => return,
        };
        let ctx = ActorContext::new(
            self.self_ref(),
            self_sender,
            sender.clone(),
            reply.clone(),
            transaction.clone(),
            self.runtime.clone(),
        );

        let mut outcome = self.run_handler(&ctx, payload).await;

        if outcome.is_ok() && created_transaction {
            if let Some(set) = &transaction {
                outcome = set
                    .commit()
                    .map_err(|dead| Fault::TransactionSetAborted(dead.0));
            }
        }

        // the current-message slot is non-empty only for the duration of
        // one handler call, on every exit path
        *self.current_message.write() = None;

        match outcome {
            Ok(()) => {
                self.arm_receive_timeout();
            }
            Err(cause) => {
                if let Some(set) = &transaction {
                    set.abort();
                }
                if let Some(stm) = self.runtime.stm() {
                    stm.clear_transaction_set();
                }
                if let Some(reply) = &reply {
                    reply.complete_exceptionally(cause.clone()).await;
                }
                tracing::debug!(actor = %self.id, %cause, "handler raised; deferring to supervision");
                if let Some(cell) = self.self_arc() {
                    supervision::handle_failure(cell, cause).await;
                }
                if self.state() == ActorState::Running {
                    self.arm_receive_timeout();
                }
            }
        }
    }
}

#[async_trait]
impl MessageSender for LocalActorCell {
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

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
