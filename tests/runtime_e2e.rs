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

//! End-to-end runs through the facade crate: configured dispatchers, the
//! STM collaborator, payload serialization checking, and timers.

use async_trait::async_trait;
use hive::core::{
    CodecError, DeadTransactionError, JoinMode, MessageCodec, Stm, TransactionSet,
};
use hive::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Echo;

#[async_trait]
impl Actor for Echo {
    async fn handle(&mut self, ctx: &ActorContext, message: Message) -> Result<(), Fault> {
        let text = message.text().unwrap_or_default().to_uppercase();
        ctx.reply(Message::text(text)).await
    }
}

// ----------------------------------------------------------------------
// Dispatcher variants picked through configuration
// ----------------------------------------------------------------------

async fn echo_round_trip(config: RuntimeConfig) {
    let runtime = ActorRuntime::with_config(config);
    let echo = ActorBuilder::new(|| Echo).spawn(&runtime).await.unwrap();
    let reply = echo
        .ask(Message::text("hello"), Some(Duration::from_millis(2000)))
        .await
        .unwrap();
    assert_eq!(reply.unwrap().text(), Some("HELLO"));
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_thread_based_dispatcher_from_config() {
    let config =
        RuntimeConfig::from_json(r#"{ "default-dispatcher": "thread-based" }"#).unwrap();
    echo_round_trip(config).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_executor_event_driven_dispatcher_from_config() {
    let config =
        RuntimeConfig::from_json(r#"{ "default-dispatcher": "executor-event-driven" }"#).unwrap();
    echo_round_trip(config).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pinned_dispatcher_from_config() {
    let config = RuntimeConfig::from_json(r#"{ "default-dispatcher": "pinned" }"#).unwrap();
    echo_round_trip(config).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cooperative_single_thread_dispatcher_from_config() {
    let config =
        RuntimeConfig::from_json(r#"{ "default-dispatcher": "cooperative-single-thread" }"#)
            .unwrap();
    echo_round_trip(config).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bounded_mailbox_aborts_at_capacity() {
    let runtime = ActorRuntime::new();

    struct Slow;
    #[async_trait]
    impl Actor for Slow {
        async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        }
    }

    let slow = ActorBuilder::new(|| Slow)
        .mailbox(MailboxKind::BoundedLinked { capacity: 2 }, RejectionPolicy::Abort)
        .spawn(&runtime)
        .await
        .unwrap();

    // first send occupies the worker; two more fill the bounded queue
    slow.tell(Message::text("working")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    slow.tell(Message::text("q1")).await.unwrap();
    slow.tell(Message::text("q2")).await.unwrap();

    let err = slow.tell(Message::text("overflow")).await.unwrap_err();
    assert!(matches!(err, Fault::MailboxFull));
    runtime.shutdown().await;
}

// ----------------------------------------------------------------------
// STM collaborator
// ----------------------------------------------------------------------

#[derive(Debug)]
struct StubTransactionSet {
    commits: Arc<AtomicU32>,
    aborts: Arc<AtomicU32>,
    dead: bool,
}

impl TransactionSet for StubTransactionSet {
    fn join(&self, _mode: JoinMode) -> Result<(), DeadTransactionError> {
        if self.dead {
            Err(DeadTransactionError("joined a dead set".into()))
        } else {
            Ok(())
        }
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }

    fn commit(&self) -> Result<(), DeadTransactionError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubStm {
    commits: Arc<AtomicU32>,
    aborts: Arc<AtomicU32>,
    created: Arc<AtomicU32>,
}

impl Stm for StubStm {
    fn current_transaction_set(&self) -> Option<Arc<dyn TransactionSet>> {
        None
    }

    fn create_new_transaction_set(&self) -> Arc<dyn TransactionSet> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(StubTransactionSet {
            commits: self.commits.clone(),
            aborts: self.aborts.clone(),
            dead: false,
        })
    }

    fn clear_transaction_set(&self) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transactional_actor_commits_on_success_and_aborts_on_raise() {
    let commits = Arc::new(AtomicU32::new(0));
    let aborts = Arc::new(AtomicU32::new(0));
    let created = Arc::new(AtomicU32::new(0));
    let runtime = ActorRuntime::builder()
        .stm(Arc::new(StubStm {
            commits: commits.clone(),
            aborts: aborts.clone(),
            created: created.clone(),
        }))
        .build();

    struct Transactional;
    #[async_trait]
    impl Actor for Transactional {
        async fn handle(&mut self, ctx: &ActorContext, message: Message) -> Result<(), Fault> {
            assert!(ctx.transaction().is_some());
            match message.text() {
                Some("boom") => Err(Fault::runtime("boom")),
                _ => Ok(()),
            }
        }
    }

    let actor = ActorBuilder::new(|| Transactional)
        .transactional()
        .spawn(&runtime)
        .await
        .unwrap();

    actor.tell(Message::text("ok")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(commits.load(Ordering::SeqCst), 1);
    assert_eq!(aborts.load(Ordering::SeqCst), 0);

    actor.tell(Message::text("boom")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
    runtime.shutdown().await;
}

/// STM whose ambient set is already dead: every send attaches it, and the
/// join inside `invoke` fails before the handler runs
struct DeadStm;

impl Stm for DeadStm {
    fn current_transaction_set(&self) -> Option<Arc<dyn TransactionSet>> {
        Some(Arc::new(StubTransactionSet {
            commits: Arc::new(AtomicU32::new(0)),
            aborts: Arc::new(AtomicU32::new(0)),
            dead: true,
        }))
    }

    fn create_new_transaction_set(&self) -> Arc<dyn TransactionSet> {
        Arc::new(StubTransactionSet {
            commits: Arc::new(AtomicU32::new(0)),
            aborts: Arc::new(AtomicU32::new(0)),
            dead: true,
        })
    }

    fn clear_transaction_set(&self) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dead_transaction_surfaces_as_transaction_set_aborted() {
    let runtime = ActorRuntime::builder().stm(Arc::new(DeadStm)).build();
    let handled = Arc::new(AtomicU32::new(0));
    let restarts = Arc::new(AtomicU32::new(0));

    struct TxChild {
        handled: Arc<AtomicU32>,
        restarts: Arc<AtomicU32>,
    }
    #[async_trait]
    impl Actor for TxChild {
        async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn post_restart(&mut self, _ctx: &ActorContext, cause: &Fault) {
            assert_eq!(cause.kind(), FaultKind::Transaction);
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Quiet;
    #[async_trait]
    impl Actor for Quiet {
        async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
            Ok(())
        }
    }

    // a supervisor trapping the Transaction kind restarts the child
    let sup = ActorBuilder::new(|| Quiet)
        .trap_exit(FaultKind::Transaction)
        .fault_handling(FaultHandling::OneForOne {
            max_retries: 3,
            within: Duration::from_millis(1000),
        })
        .spawn(&runtime)
        .await
        .unwrap();
    let handled_counter = handled.clone();
    let restart_counter = restarts.clone();
    let child = ActorBuilder::new(move || TxChild {
        handled: handled_counter.clone(),
        restarts: restart_counter.clone(),
    })
    .build(&runtime);
    sup.start_link(&child).await.unwrap();

    child.tell(Message::text("tx")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // the dead join failed the invocation before the handler ran
    assert_eq!(handled.load(Ordering::SeqCst), 0);
    assert_eq!(restarts.load(Ordering::SeqCst), 1);
    runtime.shutdown().await;
}

// ----------------------------------------------------------------------
// serialize_messages with a codec
// ----------------------------------------------------------------------

struct CountingJsonCodec {
    encodes: Arc<AtomicUsize>,
}

impl MessageCodec for CountingJsonCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        serde_json::to_vec(message).map_err(|err| CodecError(err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Message, CodecError> {
        serde_json::from_slice(bytes).map_err(|err| CodecError(err.to_string()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serialize_messages_round_trips_payloads_through_the_codec() {
    let encodes = Arc::new(AtomicUsize::new(0));
    let config = RuntimeConfig::from_json(r#"{ "serialize-messages": true }"#).unwrap();
    let runtime = ActorRuntime::builder()
        .config(config)
        .codec(Arc::new(CountingJsonCodec {
            encodes: encodes.clone(),
        }))
        .build();

    let echo = ActorBuilder::new(|| Echo).spawn(&runtime).await.unwrap();
    let reply = echo
        .ask(Message::text("codec"), Some(Duration::from_millis(1000)))
        .await
        .unwrap();
    assert_eq!(reply.unwrap().text(), Some("CODEC"));
    assert!(encodes.load(Ordering::SeqCst) >= 1);
    runtime.shutdown().await;
}

// ----------------------------------------------------------------------
// Timers
// ----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_schedule_once_delivers_after_the_delay() {
    let runtime = ActorRuntime::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }
    #[async_trait]
    impl Actor for Recorder {
        async fn handle(&mut self, _ctx: &ActorContext, message: Message) -> Result<(), Fault> {
            self.seen
                .lock()
                .unwrap()
                .push(message.text().unwrap_or_default().to_string());
            Ok(())
        }
    }

    let recorder_seen = seen.clone();
    let actor = ActorBuilder::new(move || Recorder {
        seen: recorder_seen.clone(),
    })
    .spawn(&runtime)
    .await
    .unwrap();

    timer::schedule_once(actor.clone(), Message::text("later"), Duration::from_millis(50));
    assert!(seen.lock().unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(seen.lock().unwrap().as_slice(), ["later".to_string()]);
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_periodic_timer_repeats_until_canceled() {
    let runtime = ActorRuntime::new();
    let ticks = Arc::new(AtomicU32::new(0));

    struct Ticker {
        ticks: Arc<AtomicU32>,
    }
    #[async_trait]
    impl Actor for Ticker {
        async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let counter = ticks.clone();
    let actor = ActorBuilder::new(move || Ticker {
        ticks: counter.clone(),
    })
    .spawn(&runtime)
    .await
    .unwrap();

    let handle = timer::schedule_periodic(
        actor.clone(),
        Message::text("tick"),
        Duration::from_millis(20),
        Duration::from_millis(20),
    );
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.cancel();
    // let any in-flight tick land before snapshotting
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_cancel = ticks.load(Ordering::SeqCst);
    assert!(after_cancel >= 3);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    runtime.shutdown().await;
}
