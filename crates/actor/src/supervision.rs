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

//! The supervision engine
//!
//! ## Failure routing
//! A raise inside `invoke` lands in [`handle_failure`], still on the worker
//! that holds the failing actor's processing token. If the failure kind is
//! in the supervisor's trap set, the supervisor's strategy is applied
//! (restart the one subordinate for one-for-one, every subordinate for
//! all-for-one). An untrapped kind escalates: the supervisor receives a
//! `Failed` notice, and its own hook (default: fail with the subordinate's
//! fault as cause) decides. An unsupervised failing actor stops.
//!
//! ## Restart budget
//! The window counter lives on the failing subordinate for one-for-one and
//! on the supervisor for all-for-one. A subordinate over budget is stopped
//! and its supervisor receives exactly one `MaxRestartsExceeded` notice. A
//! `Temporary` subordinate is never restarted: it is stopped and removed,
//! and when that empties the supervisor's subordinate map the supervisor is
//! told `UnlinkAndStop`.

use crate::actor_ref::ActorState;
use crate::cell::LocalActorCell;
use futures::future::BoxFuture;
use hive_core::{Fault, FaultHandling, LifeCycle, SystemNotice};
use std::sync::Arc;
use std::time::Duration;

/// Entry point for a raise inside `invoke`
///
/// The caller still holds the failing actor's processing token; every
/// restart decision below completes before the token is released, so the
/// next drain sees the reconstructed instance.
pub(crate) async fn handle_failure(cell: Arc<LocalActorCell>, cause: Fault) {
    let supervisor = match cell.supervisor_cell() {
        Some(supervisor) => supervisor,
        None => {
            tracing::warn!(actor = %cell.id(), %cause, "unsupervised actor failed; stopping");
            stop_quietly(&cell).await;
            return;
        }
    };

    if supervisor.state() == ActorState::Stopped {
        on_stopped_supervisor(&supervisor, &cell, &cause).await;
        return;
    }

    if !supervisor.traps(&cause.kind()) {
        tracing::debug!(
            supervisor = %supervisor.id(),
            subordinate = %cell.id(),
            kind = %cause.kind(),
            "failure kind not trapped; escalating"
        );
        supervisor
            .notify_system(SystemNotice::Failed {
                subordinate: *cell.id(),
                cause,
            })
            .await;
        return;
    }

    match supervisor.fault_handling() {
        FaultHandling::OneForOne {
            max_retries,
            within,
        } => {
            restart_with_limit(cell, max_retries, within, cause).await;
        }
        FaultHandling::AllForOne {
            max_retries,
            within,
        } => {
            all_for_one(&supervisor, &cell, max_retries, within, cause).await;
        }
        FaultHandling::None => {
            tracing::debug!(
                supervisor = %supervisor.id(),
                subordinate = %cell.id(),
                "trapped failure but no fault-handling strategy; escalating"
            );
            supervisor
                .notify_system(SystemNotice::Failed {
                    subordinate: *cell.id(),
                    cause,
                })
                .await;
        }
    }
}

/// One supervision step for one subordinate, against its own counter
///
/// Boxed because restarting recurses into the subordinate's own linked
/// subtree.
pub(crate) fn restart_with_limit(
    cell: Arc<LocalActorCell>,
    max_retries: u32,
    within: Duration,
    cause: Fault,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if !cell.note_failure(max_retries, within) {
            over_budget(&cell, max_retries, within, cause).await;
            return;
        }

        if cell.lifecycle() == LifeCycle::Temporary {
            remove_temporary(&cell).await;
            return;
        }

        perform_restart(&cell, max_retries, within, &cause).await;
    })
}

/// Restart one Permanent subordinate and, recursively, its linked subtree
async fn perform_restart(
    cell: &Arc<LocalActorCell>,
    max_retries: u32,
    within: Duration,
    cause: &Fault,
) {
    tracing::info!(actor = %cell.id(), tag = %cell.tag(), %cause, "restarting");
    cell.set_state(ActorState::BeingRestarted);

    for subordinate in cell.subordinate_cells() {
        restart_with_limit(subordinate, max_retries, within, cause.clone()).await;
    }

    match cell.rebuild_instance(cause).await {
        Ok(()) => {
            cell.set_state(ActorState::Running);
            cell.arm_receive_timeout();
            tracing::debug!(actor = %cell.id(), "restart complete");
        }
        Err(init_fault) => {
            tracing::error!(actor = %cell.id(), %init_fault, "restart failed during init; stopping");
            stop_quietly(cell).await;
            if let Some(supervisor) = cell.supervisor_cell() {
                supervisor.remove_subordinate(cell.id());
                supervisor
                    .notify_system(SystemNotice::Failed {
                        subordinate: *cell.id(),
                        cause: init_fault,
                    })
                    .await;
            }
        }
    }
}

/// All-for-one: one failure consumes the supervisor's budget and restarts
/// every subordinate
async fn all_for_one(
    supervisor: &Arc<LocalActorCell>,
    failing: &Arc<LocalActorCell>,
    max_retries: u32,
    within: Duration,
    cause: Fault,
) {
    if !supervisor.note_strategy_failure(max_retries, within) {
        tracing::warn!(
            supervisor = %supervisor.id(),
            subordinate = %failing.id(),
            "all-for-one restart budget exceeded; stopping all subordinates"
        );
        for subordinate in supervisor.subordinate_cells() {
            stop_quietly(&subordinate).await;
            supervisor.remove_subordinate(subordinate.id());
        }
        supervisor
            .notify_system(SystemNotice::MaxRestartsExceeded {
                subordinate: *failing.id(),
                max_retries,
                within,
                cause,
            })
            .await;
        return;
    }

    for subordinate in supervisor.subordinate_cells() {
        if subordinate.lifecycle() == LifeCycle::Temporary {
            remove_temporary(&subordinate).await;
        } else {
            perform_restart(&subordinate, max_retries, within, &cause).await;
        }
    }
}

/// Stop a subordinate that blew its restart budget and tell its supervisor
async fn over_budget(
    cell: &Arc<LocalActorCell>,
    max_retries: u32,
    within: Duration,
    cause: Fault,
) {
    tracing::warn!(
        actor = %cell.id(),
        tag = %cell.tag(),
        max_retries,
        "restart budget exceeded; stopping"
    );
    stop_quietly(cell).await;
    if let Some(supervisor) = cell.supervisor_cell() {
        supervisor.remove_subordinate(cell.id());
        supervisor
            .notify_system(SystemNotice::MaxRestartsExceeded {
                subordinate: *cell.id(),
                max_retries,
                within,
                cause,
            })
            .await;
    }
}

/// Stop and remove a Temporary subordinate; `UnlinkAndStop` when it was the
/// supervisor's last one
async fn remove_temporary(cell: &Arc<LocalActorCell>) {
    tracing::debug!(actor = %cell.id(), "temporary actor failed; removing");
    stop_quietly(cell).await;
    if let Some(supervisor) = cell.supervisor_cell() {
        let now_empty = supervisor.remove_subordinate(cell.id());
        if now_empty {
            supervisor
                .notify_system(SystemNotice::UnlinkAndStop {
                    subordinate: *cell.id(),
                })
                .await;
        }
    }
}

/// A failure whose supervisor is already stopped
///
/// The original left this case open; it is a configuration choice here.
async fn on_stopped_supervisor(
    supervisor: &Arc<LocalActorCell>,
    cell: &Arc<LocalActorCell>,
    cause: &Fault,
) {
    let stop_tree = cell
        .runtime()
        .config()
        .stop_linked_on_supervisor_stop;
    tracing::warn!(
        supervisor = %supervisor.id(),
        subordinate = %cell.id(),
        %cause,
        stop_tree,
        "supervisor already stopped at failure time"
    );
    stop_quietly(cell).await;
    if stop_tree {
        for sibling in supervisor.subordinate_cells() {
            stop_quietly(&sibling).await;
        }
    }
}

async fn stop_quietly(cell: &Arc<LocalActorCell>) {
    if let Err(cause) = cell.stop().await {
        tracing::warn!(actor = %cell.id(), %cause, "failed to stop actor");
    }
}
