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

//! Serialization collaborator contracts
//!
//! Two codecs, both external: the message payload codec (applied when the
//! transport moves an envelope, and at send time when `serialize_messages`
//! is enabled) and the actor-state codec (applied when a handle is
//! migrated). The runtime does not interpret the bytes either one produces.

use crate::message::Message;

/// Encoding or decoding failed
#[derive(Debug, Clone, thiserror::Error)]
#[error("codec error: {0}")]
pub struct CodecError(pub String);

/// Encodes and decodes message payloads
pub trait MessageCodec: Send + Sync {
    /// Encode a message to wire bytes
    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError>;

    /// Decode wire bytes back to a message
    fn decode(&self, bytes: &[u8]) -> Result<Message, CodecError>;
}

/// Frames actor-state snapshots for migration
pub trait ActorStateCodec: Send + Sync {
    /// Encode a state snapshot for the wire
    fn encode_state(&self, snapshot: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode a wire frame back to a state snapshot
    fn decode_state(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError>;
}
