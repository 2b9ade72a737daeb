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

//! Software-transactional-memory collaborator contract
//!
//! The STM itself is external. The runtime only attaches an opaque
//! transaction-set token to envelopes, joins or creates one around a handler
//! invocation, and commits or aborts it on the way out. A
//! [`DeadTransactionError`] raised by the collaborator during invocation is
//! translated to a `TransactionSetAborted` fault for supervision.

use std::fmt;
use std::sync::Arc;

/// How a handler invocation joins a transaction set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinMode {
    /// Join the existing set; error if there is none
    RequiresExisting,
    /// Join the existing set, or create one if there is none
    Requires,
    /// Always create a fresh set
    RequiresNew,
}

/// The transaction set died under the participant
#[derive(Debug, Clone, thiserror::Error)]
#[error("transaction set is dead: {0}")]
pub struct DeadTransactionError(pub String);

/// An opaque transaction-set token attached to a message
pub trait TransactionSet: Send + Sync + fmt::Debug {
    /// Join this set from the current participant
    fn join(&self, mode: JoinMode) -> Result<(), DeadTransactionError>;

    /// Abort the set; idempotent
    fn abort(&self);

    /// Commit the set
    fn commit(&self) -> Result<(), DeadTransactionError>;
}

/// Factory and ambient-state surface of the external STM
pub trait Stm: Send + Sync {
    /// The transaction set the calling context is running under, if any
    fn current_transaction_set(&self) -> Option<Arc<dyn TransactionSet>>;

    /// Create a fresh transaction set and install it as current
    fn create_new_transaction_set(&self) -> Arc<dyn TransactionSet>;

    /// Clear the ambient current-set slot
    fn clear_transaction_set(&self);
}
