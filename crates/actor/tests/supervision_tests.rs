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

//! Supervision: trap sets, one-for-one and all-for-one restarts, restart
//! budgets, Temporary removal, escalation.

use async_trait::async_trait;
use hive_actor::{
    Actor, ActorBuilder, ActorContext, ActorRuntime, ActorState, SupervisionEvent,
};
use hive_core::{Fault, FaultHandling, FaultKind, LifeCycle, Message};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared event log; factories capture it so it survives restarts
type EventLog = Arc<Mutex<Vec<String>>>;

fn log(events: &EventLog, entry: impl Into<String>) {
    events.lock().unwrap().push(entry.into());
}

fn entries(events: &EventLog) -> Vec<String> {
    events.lock().unwrap().clone()
}

fn count_of(events: &EventLog, entry: &str) -> usize {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.as_str() == entry)
        .count()
}

/// Raises a Runtime fault on "boom", records lifecycle hooks
struct FaultyChild {
    name: &'static str,
    events: EventLog,
}

#[async_trait]
impl Actor for FaultyChild {
    async fn handle(&mut self, _ctx: &ActorContext, message: Message) -> Result<(), Fault> {
        match message.text() {
            Some("boom") => Err(Fault::runtime("boom")),
            other => {
                log(&self.events, format!("{}:handled:{}", self.name, other.unwrap_or("")));
                Ok(())
            }
        }
    }

    async fn pre_restart(&mut self, _ctx: &ActorContext, _cause: &Fault) {
        log(&self.events, format!("{}:pre_restart", self.name));
    }

    async fn post_restart(&mut self, _ctx: &ActorContext, _cause: &Fault) {
        log(&self.events, format!("{}:post_restart", self.name));
    }
}

/// Supervisor that records supervision events
struct Supervisor {
    events: EventLog,
}

#[async_trait]
impl Actor for Supervisor {
    async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
        Ok(())
    }

    async fn on_supervision_event(&mut self, _ctx: &ActorContext, event: SupervisionEvent) {
        match event {
            SupervisionEvent::MaxRestartsExceeded {
                subordinate,
                max_retries,
                within,
                ..
            } => log(
                &self.events,
                format!(
                    "max_restarts:{}:{}:{}",
                    subordinate,
                    max_retries,
                    within.as_millis()
                ),
            ),
            SupervisionEvent::UnlinkAndStop { subordinate } => {
                log(&self.events, format!("unlink_and_stop:{}", subordinate))
            }
        }
    }
}

fn faulty_child(name: &'static str, events: &EventLog) -> ActorBuilder {
    let events = events.clone();
    ActorBuilder::new(move || FaultyChild {
        name,
        events: events.clone(),
    })
}

fn supervisor(events: &EventLog, strategy: FaultHandling) -> ActorBuilder {
    let events = events.clone();
    ActorBuilder::new(move || Supervisor {
        events: events.clone(),
    })
    .trap_exit(FaultKind::Runtime)
    .fault_handling(strategy)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_for_one_restarts_until_budget_then_stops() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup = supervisor(
        &events,
        FaultHandling::OneForOne {
            max_retries: 3,
            within: Duration::from_millis(1000),
        },
    )
    .spawn(&runtime)
    .await
    .unwrap();
    let child = faulty_child("c", &events).build(&runtime);
    sup.start_link(&child).await.unwrap();
    let child_id = child.id();

    for _ in 0..4 {
        child.tell(Message::text("boom")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    // three restarts, then the fourth failure stops the child
    assert_eq!(count_of(&events, "c:pre_restart"), 3);
    assert_eq!(count_of(&events, "c:post_restart"), 3);
    assert_eq!(child.state(), ActorState::Stopped);

    // identity survived every restart; the supervisor got exactly one notice
    let notice = format!("max_restarts:{}:3:1000", child_id);
    assert_eq!(
        entries(&events)
            .iter()
            .filter(|e| **e == notice)
            .count(),
        1
    );
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restart_preserves_identity_and_keeps_processing() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup = supervisor(
        &events,
        FaultHandling::OneForOne {
            max_retries: 5,
            within: Duration::from_millis(1000),
        },
    )
    .spawn(&runtime)
    .await
    .unwrap();
    let child = faulty_child("c", &events).build(&runtime);
    sup.start_link(&child).await.unwrap();
    let id_before = child.id();

    child.tell(Message::text("boom")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(child.id(), id_before);
    assert_eq!(child.state(), ActorState::Running);
    assert!(runtime.registry().find_by_id(&id_before).is_some());

    // the restarted instance still handles messages
    child.tell(Message::text("after")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count_of(&events, "c:handled:after"), 1);
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_all_for_one_restarts_every_subordinate() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup = supervisor(
        &events,
        FaultHandling::AllForOne {
            max_retries: 5,
            within: Duration::from_millis(1000),
        },
    )
    .spawn(&runtime)
    .await
    .unwrap();
    let c1 = faulty_child("c1", &events).build(&runtime);
    let c2 = faulty_child("c2", &events).build(&runtime);
    sup.start_link(&c1).await.unwrap();
    sup.start_link(&c2).await.unwrap();

    c1.tell(Message::text("boom")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // both subordinates observed the restart pair
    assert_eq!(count_of(&events, "c1:pre_restart"), 1);
    assert_eq!(count_of(&events, "c1:post_restart"), 1);
    assert_eq!(count_of(&events, "c2:pre_restart"), 1);
    assert_eq!(count_of(&events, "c2:post_restart"), 1);
    assert_eq!(c1.state(), ActorState::Running);
    assert_eq!(c2.state(), ActorState::Running);
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_temporary_subordinate_is_removed_not_restarted() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup = supervisor(
        &events,
        FaultHandling::OneForOne {
            max_retries: 3,
            within: Duration::from_millis(1000),
        },
    )
    .spawn(&runtime)
    .await
    .unwrap();
    let temp = faulty_child("t", &events)
        .lifecycle(LifeCycle::Temporary)
        .build(&runtime);
    sup.start_link(&temp).await.unwrap();
    let temp_id = temp.id();

    temp.tell(Message::text("boom")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // removed within one supervision step, never restarted
    assert_eq!(temp.state(), ActorState::Stopped);
    assert_eq!(count_of(&events, "t:pre_restart"), 0);
    assert!(sup.subordinate_ids().is_empty());
    assert_eq!(
        count_of(&events, &format!("unlink_and_stop:{}", temp_id)),
        1
    );
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_untrapped_kind_escalates_to_grand_supervisor() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    struct CustomFaultChild {
        events: EventLog,
    }
    #[async_trait]
    impl Actor for CustomFaultChild {
        async fn handle(&mut self, _ctx: &ActorContext, message: Message) -> Result<(), Fault> {
            match message.text() {
                Some("boom") => Err(Fault::raised(FaultKind::Custom("db".into()), "db down")),
                _ => Ok(()),
            }
        }
        async fn post_restart(&mut self, _ctx: &ActorContext, _cause: &Fault) {
            log(&self.events, "child:post_restart");
        }
    }

    /// Middle supervisor records its own restarts; traps only Runtime
    struct Middle {
        events: EventLog,
    }
    #[async_trait]
    impl Actor for Middle {
        async fn handle(&mut self, _ctx: &ActorContext, _message: Message) -> Result<(), Fault> {
            Ok(())
        }
        async fn post_restart(&mut self, _ctx: &ActorContext, _cause: &Fault) {
            log(&self.events, "middle:post_restart");
        }
    }

    let grand = {
        let events = events.clone();
        ActorBuilder::new(move || Supervisor {
            events: events.clone(),
        })
        .trap_exit(FaultKind::Custom("db".into()))
        .fault_handling(FaultHandling::OneForOne {
            max_retries: 3,
            within: Duration::from_millis(1000),
        })
        .spawn(&runtime)
        .await
        .unwrap()
    };

    let middle = {
        let events = events.clone();
        ActorBuilder::new(move || Middle {
            events: events.clone(),
        })
        .trap_exit(FaultKind::Runtime)
        .fault_handling(FaultHandling::OneForOne {
            max_retries: 3,
            within: Duration::from_millis(1000),
        })
        .build(&runtime)
    };
    grand.start_link(&middle).await.unwrap();

    let child = {
        let events = events.clone();
        ActorBuilder::new(move || CustomFaultChild {
            events: events.clone(),
        })
        .build(&runtime)
    };
    middle.start_link(&child).await.unwrap();

    // the custom kind passes through the middle supervisor untouched and
    // the grand supervisor restarts the middle's whole subtree
    child.tell(Message::text("boom")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(count_of(&events, "middle:post_restart"), 1);
    assert_eq!(count_of(&events, "child:post_restart"), 1);
    assert_eq!(middle.state(), ActorState::Running);
    assert_eq!(child.state(), ActorState::Running);
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsupervised_failure_stops_the_actor_and_its_subtree() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let parent = faulty_child("p", &events).spawn(&runtime).await.unwrap();
    let child = faulty_child("c", &events).build(&runtime);
    parent.start_link(&child).await.unwrap();

    parent.tell(Message::text("boom")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(parent.state(), ActorState::Stopped);
    assert_eq!(child.state(), ActorState::Stopped);
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_link_rejects_a_second_supervisor() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup_a = supervisor(&events, FaultHandling::None).spawn(&runtime).await.unwrap();
    let sup_b = supervisor(&events, FaultHandling::None).spawn(&runtime).await.unwrap();
    let child = faulty_child("c", &events).spawn(&runtime).await.unwrap();

    sup_a.link(&child).await.unwrap();
    let err = sup_b.link(&child).await.unwrap_err();
    assert!(matches!(err, Fault::Linkage(_)));
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_link_then_unlink_leaves_the_graph_unchanged() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup = supervisor(&events, FaultHandling::None).spawn(&runtime).await.unwrap();
    let child = faulty_child("c", &events).spawn(&runtime).await.unwrap();

    sup.link(&child).await.unwrap();
    assert_eq!(child.supervisor_id(), Some(sup.id()));
    assert_eq!(sup.subordinate_ids(), vec![child.id()]);

    sup.unlink(&child).await.unwrap();
    assert_eq!(child.supervisor_id(), None);
    assert!(sup.subordinate_ids().is_empty());

    // unlinking twice is a linkage error
    let err = sup.unlink(&child).await.unwrap_err();
    assert!(matches!(err, Fault::Linkage(_)));

    // and the child is linkable again
    sup.link(&child).await.unwrap();
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopping_a_supervisor_stops_its_subordinates_first() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup = supervisor(&events, FaultHandling::None).spawn(&runtime).await.unwrap();
    let c1 = faulty_child("c1", &events).build(&runtime);
    let c2 = faulty_child("c2", &events).build(&runtime);
    sup.start_link(&c1).await.unwrap();
    sup.start_link(&c2).await.unwrap();

    sup.stop().await.unwrap();
    assert_eq!(c1.state(), ActorState::Stopped);
    assert_eq!(c2.state(), ActorState::Stopped);
    assert!(sup.subordinate_ids().is_empty());
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_window_expiry_resets_the_restart_budget() {
    let runtime = ActorRuntime::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let sup = supervisor(
        &events,
        FaultHandling::OneForOne {
            max_retries: 1,
            within: Duration::from_millis(80),
        },
    )
    .spawn(&runtime)
    .await
    .unwrap();
    let child = faulty_child("c", &events).build(&runtime);
    sup.start_link(&child).await.unwrap();

    // each failure lands in its own window, so the budget never trips
    for _ in 0..3 {
        child.tell(Message::text("boom")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    assert_eq!(child.state(), ActorState::Running);
    assert_eq!(count_of(&events, "c:pre_restart"), 3);
    runtime.shutdown().await;
}
