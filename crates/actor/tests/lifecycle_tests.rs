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

//! Lifecycle transitions, registry visibility, receive timeouts.

use async_trait::async_trait;
use hive_actor::{Actor, ActorBuilder, ActorContext, ActorRuntime, ActorState};
use hive_core::{Fault, Message};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Tracker {
    events: Arc<Mutex<Vec<String>>>,
}

impl Tracker {
    fn record(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }
}

#[async_trait]
impl Actor for Tracker {
    async fn handle(&mut self, _ctx: &ActorContext, message: Message) -> Result<(), Fault> {
        self.record(message.text().unwrap_or_default());
        Ok(())
    }

    async fn init(&mut self, _ctx: &ActorContext) -> Result<(), Fault> {
        self.record("init");
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.record("shutdown");
    }
}

fn tracker_builder(events: &Arc<Mutex<Vec<String>>>) -> ActorBuilder {
    let events = events.clone();
    ActorBuilder::new(move || Tracker {
        events: events.clone(),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tell_before_start_fails_not_started() {
    let runtime = ActorRuntime::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let actor = tracker_builder(&events).build(&runtime);

    assert_eq!(actor.state(), ActorState::NotStarted);
    let err = actor.tell(Message::text("early")).await.unwrap_err();
    assert!(matches!(err, Fault::NotStarted));
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tell_after_stop_fails_stopped() {
    let runtime = ActorRuntime::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let actor = tracker_builder(&events).spawn(&runtime).await.unwrap();

    actor.tell(Message::text("one")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    actor.stop().await.unwrap();
    assert_eq!(actor.state(), ActorState::Stopped);

    let err = actor.tell(Message::text("late")).await.unwrap_err();
    assert!(matches!(err, Fault::Stopped));

    // "late" never reached the handler
    let seen = events.lock().unwrap().clone();
    assert_eq!(seen, vec!["init", "one", "shutdown"]);
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_is_idempotent_and_stop_is_terminal() {
    let runtime = ActorRuntime::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let actor = tracker_builder(&events).spawn(&runtime).await.unwrap();

    actor.start().await.unwrap(); // second start is a no-op
    actor.stop().await.unwrap();
    actor.stop().await.unwrap(); // second stop is a no-op

    let err = actor.start().await.unwrap_err();
    assert!(matches!(err, Fault::Stopped));
    // init ran exactly once
    assert_eq!(
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == "init")
            .count(),
        1
    );
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_registry_lookup_by_id_tag_and_type() {
    let runtime = ActorRuntime::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let actor = tracker_builder(&events)
        .tag("bookkeeper")
        .spawn(&runtime)
        .await
        .unwrap();

    let by_id = runtime.registry().find_by_id(&actor.id()).unwrap();
    assert_eq!(by_id.id(), actor.id());

    let by_tag = runtime.registry().find_by_tag("bookkeeper");
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id(), actor.id());

    let by_type = runtime.registry().find_by_impl_type::<Tracker>();
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].id(), actor.id());

    actor.stop().await.unwrap();
    assert!(runtime.registry().find_by_id(&actor.id()).is_none());
    assert!(runtime.registry().find_by_tag("bookkeeper").is_empty());
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_retagging_moves_the_tag_index() {
    let runtime = ActorRuntime::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let actor = tracker_builder(&events)
        .tag("before")
        .spawn(&runtime)
        .await
        .unwrap();

    actor.set_tag("after").unwrap();
    assert!(runtime.registry().find_by_tag("before").is_empty());
    assert_eq!(runtime.registry().find_by_tag("after").len(), 1);
    assert_eq!(actor.tag(), "after");
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_default_tag_is_the_stringified_identity() {
    let runtime = ActorRuntime::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let actor = tracker_builder(&events).spawn(&runtime).await.unwrap();
    assert_eq!(actor.tag(), actor.id().to_string());
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_receive_timeout_fires_when_mailbox_stays_empty() {
    let runtime = ActorRuntime::new();
    let timeouts = Arc::new(AtomicU32::new(0));

    struct Sleepy {
        timeouts: Arc<AtomicU32>,
    }
    #[async_trait]
    impl Actor for Sleepy {
        async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
            Ok(())
        }
        async fn on_receive_timeout(&mut self, _ctx: &ActorContext) -> Result<(), Fault> {
            self.timeouts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let counter = timeouts.clone();
    let actor = ActorBuilder::new(move || Sleepy {
        timeouts: counter.clone(),
    })
    .receive_timeout(Duration::from_millis(50))
    .spawn(&runtime)
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(timeouts.load(Ordering::SeqCst) >= 1);

    actor.stop().await.unwrap();
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_completes_pending_asks_exceptionally() {
    let runtime = ActorRuntime::new();

    struct Slow;
    #[async_trait]
    impl Actor for Slow {
        async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }
    }

    let slow = ActorBuilder::new(|| Slow).spawn(&runtime).await.unwrap();
    // first message occupies the worker; the second stays queued
    slow.tell(Message::text("busy")).await.unwrap();
    let pending = slow.ask_future(Message::text("queued")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    slow.stop().await.unwrap();
    let err = pending.wait(Duration::from_millis(500)).await.unwrap_err();
    assert!(matches!(err, Fault::Stopped));
    runtime.shutdown().await;
}
