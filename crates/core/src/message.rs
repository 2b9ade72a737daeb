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

//! User message payloads
//!
//! The runtime never interprets payload bytes; encoding and decoding belong
//! to the serialization collaborator ([`crate::codec`]). A [`Message`] is
//! the unit an actor handler receives and the unit a reply completes with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An opaque payload with a routing type and string metadata
///
/// ## Examples
/// ```
/// use hive_core::Message;
///
/// let msg = Message::text("hello").with_message_type("greeting");
/// assert_eq!(msg.text(), Some("hello"));
/// assert_eq!(msg.message_type(), "greeting");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    message_type: String,
    payload: Vec<u8>,
    metadata: HashMap<String, String>,
}

impl Message {
    /// A message with the given payload bytes and no type
    pub fn new(payload: Vec<u8>) -> Self {
        Message {
            message_type: String::new(),
            payload,
            metadata: HashMap::new(),
        }
    }

    /// A message whose payload is a UTF-8 string
    pub fn text(payload: impl Into<String>) -> Self {
        Message::new(payload.into().into_bytes())
    }

    /// Set the routing type
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The routing type, empty if unset
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// The raw payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The payload as UTF-8 text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// The metadata map
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}
