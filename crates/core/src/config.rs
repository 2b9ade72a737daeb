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

//! Runtime configuration
//!
//! All recognized options, with their defaults. Parsed from JSON via
//! [`RuntimeConfig::from_json`]; every field is optional in the input and
//! falls back to its default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which dispatcher variant newly built actors get by default
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatcherKind {
    /// One dedicated OS thread per actor
    ThreadBased,
    /// Shared pool of dedicated executor threads, throughput-bounded drains
    ExecutorEventDriven,
    /// All actors share one worker; one envelope per drain
    CooperativeSingleThread,
    /// Shared pool with a work queue of ready mailboxes
    CooperativePool,
    /// Like the executor pool, but each actor always runs on the same worker
    Pinned,
}

/// Mailbox backing configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MailboxKind {
    /// Grow without bound
    Unbounded,
    /// Bounded queue backed by a linked structure
    BoundedLinked {
        /// Maximum queued envelopes
        capacity: usize,
    },
    /// Bounded queue with storage reserved up front
    BoundedArray {
        /// Maximum queued envelopes
        capacity: usize,
        /// Wake blocked enqueuers in arrival order
        fair: bool,
    },
    /// Rendezvous handoff: an enqueue waits until the consumer has drained
    Synchronous,
}

/// What a bounded mailbox does with an envelope it cannot hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionPolicy {
    /// Surface `MailboxFull` at the caller
    Abort,
    /// The caller drains one envelope itself, then enqueues
    CallerRuns,
    /// Silently drop the new envelope
    Discard,
    /// Silently drop the oldest queued envelope
    DiscardOldest,
}

/// Restart policy of an actor whose handler failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifeCycle {
    /// Restart on failure
    Permanent,
    /// Do not restart; remove from the supervisor on failure
    Temporary,
}

/// Process-wide runtime options
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Default deadline for `ask` when the caller gives none (ms)
    pub default_reply_timeout_ms: u64,
    /// Dispatcher variant used when a builder does not override it
    pub default_dispatcher: DispatcherKind,
    /// Envelopes drained per scheduling turn in shared-pool dispatchers
    pub throughput: usize,
    /// Default mailbox backing
    pub mailbox: MailboxKind,
    /// Default bounded-mailbox rejection policy
    pub rejection_policy: RejectionPolicy,
    /// Round-trip payloads through the configured codec at send time, to
    /// catch payloads that do not survive encoding
    pub serialize_messages: bool,
    /// Default lifecycle of newly built actors
    pub default_lifecycle: LifeCycle,
    /// When a failure notification targets an already-stopped supervisor:
    /// `true` stops the failing actor's linked subtree, `false` stops only
    /// the failing actor
    pub stop_linked_on_supervisor_stop: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            default_reply_timeout_ms: 5000,
            default_dispatcher: DispatcherKind::CooperativePool,
            throughput: 5,
            mailbox: MailboxKind::Unbounded,
            rejection_policy: RejectionPolicy::Abort,
            serialize_messages: false,
            default_lifecycle: LifeCycle::Permanent,
            stop_linked_on_supervisor_stop: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The default reply deadline as a [`Duration`]
    pub fn default_reply_timeout(&self) -> Duration {
        Duration::from_millis(self.default_reply_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.default_reply_timeout(), Duration::from_millis(5000));
        assert_eq!(config.throughput, 5);
        assert_eq!(config.default_dispatcher, DispatcherKind::CooperativePool);
        assert_eq!(config.mailbox, MailboxKind::Unbounded);
        assert_eq!(config.default_lifecycle, LifeCycle::Permanent);
        assert!(!config.serialize_messages);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json(
            r#"{
                "throughput": 10,
                "mailbox": { "type": "bounded-linked", "capacity": 64 },
                "rejection-policy": "discard-oldest"
            }"#,
        )
        .unwrap();
        assert_eq!(config.throughput, 10);
        assert_eq!(config.mailbox, MailboxKind::BoundedLinked { capacity: 64 });
        assert_eq!(config.rejection_policy, RejectionPolicy::DiscardOldest);
        assert_eq!(config.default_reply_timeout_ms, 5000);
    }

    #[test]
    fn test_dispatcher_kind_names() {
        let config =
            RuntimeConfig::from_json(r#"{ "default-dispatcher": "thread-based" }"#).unwrap();
        assert_eq!(config.default_dispatcher, DispatcherKind::ThreadBased);
    }
}
