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

//! Reply futures for the ask pattern
//!
//! ## Design
//! A [`ReplyFuture`] is a cloneable, single-completion slot: a mutex-held
//! `Option<Result<Message, Fault>>` plus a notify. Completion and waiting
//! are decoupled so an envelope can travel through `forward` chains carrying
//! the same future, and whichever handler finally replies completes the
//! original caller. The first completion wins; later completions are
//! ignored with a debug log.

use crate::fault::Fault;
use crate::message::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// A completable reply slot shared between sender and receiver
#[derive(Clone)]
pub struct ReplyFuture {
    slot: Arc<Mutex<Option<Result<Message, Fault>>>>,
    notify: Arc<Notify>,
}

impl ReplyFuture {
    /// An empty, incomplete future
    pub fn new() -> Self {
        ReplyFuture {
            slot: Arc::new(Mutex::new(None)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Complete with a reply value
    ///
    /// Returns `false` if the future was already completed.
    pub async fn complete(&self, reply: Message) -> bool {
        self.install(Ok(reply)).await
    }

    /// Complete exceptionally with a fault
    ///
    /// Returns `false` if the future was already completed.
    pub async fn complete_exceptionally(&self, fault: Fault) -> bool {
        self.install(Err(fault)).await
    }

    async fn install(&self, result: Result<Message, Fault>) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            tracing::debug!("reply future already completed, dropping late completion");
            return false;
        }
        *slot = Some(result);
        drop(slot);
        self.notify.notify_one();
        true
    }

    /// Whether a completion has been installed
    pub async fn is_completed(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Take the completion without waiting, if there is one
    pub async fn try_take(&self) -> Option<Result<Message, Fault>> {
        self.slot.lock().await.take()
    }

    /// Wait for the completion, up to `timeout`
    ///
    /// ## Returns
    /// - `Ok(message)` on a normal completion
    /// - `Err(fault)` on an exceptional completion
    /// - `Err(Fault::AskTimeout)` if nothing completed in time
    pub async fn wait(&self, timeout: Duration) -> Result<Message, Fault> {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            if let Some(result) = self.slot.lock().await.take() {
                return result;
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = &mut deadline => return Err(Fault::AskTimeout(timeout)),
            }
        }
    }
}

impl Default for ReplyFuture {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReplyFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyFuture").finish_non_exhaustive()
    }
}
