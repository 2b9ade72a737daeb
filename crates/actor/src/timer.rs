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

//! One-shot and periodic message timers
//!
//! The same machinery backs the receive-timeout one-shots the cell arms
//! internally and user-scheduled messages. Timers hold the target weakly
//! through its handle and give up silently once the target stops; cancel a
//! [`TimerHandle`] to stop a timer early.

use crate::actor_ref::ActorRef;
use hive_core::Message;
use std::time::Duration;

/// A cancelable scheduled send
pub struct TimerHandle {
    task: tokio::task::JoinHandle<()>,
}

impl TimerHandle {
    /// Stop the timer; a one-shot that has already fired is unaffected
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the timer task has finished (fired, failed or canceled)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Deliver `message` to `target` once, after `delay`
pub fn schedule_once(target: ActorRef, message: Message, delay: Duration) -> TimerHandle {
    TimerHandle {
        task: tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(cause) = target.tell(message).await {
                tracing::debug!(target_actor = %target.id(), %cause, "scheduled send dropped");
            }
        }),
    }
}

/// Deliver `message` to `target` after `initial_delay` and then every `every`
pub fn schedule_periodic(
    target: ActorRef,
    message: Message,
    initial_delay: Duration,
    every: Duration,
) -> TimerHandle {
    TimerHandle {
        task: tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            loop {
                if let Err(cause) = target.tell(message.clone()).await {
                    tracing::debug!(target_actor = %target.id(), %cause, "periodic send stopped");
                    break;
                }
                tokio::time::sleep(every).await;
            }
        }),
    }
}
