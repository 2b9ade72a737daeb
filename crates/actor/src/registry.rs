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

//! The actor registry
//!
//! ## Purpose
//! Process-wide map from identity to live handle, with secondary indexes by
//! user-facing tag and by implementation type. Entries hold the cell weakly
//! so a stopped, dropped handle is collectable; lookups only surface actors
//! that are Running or BeingRestarted. The remote layer resolves inbound
//! wire envelopes through [`ActorRegistry::find_by_id`].
//!
//! Reads take no lock on the fast path (sharded concurrent maps); the tag
//! and type indexes are maintained incrementally as handles register,
//! retag and unregister.

use crate::actor::Actor;
use crate::actor_ref::{ActorRef, ActorState};
use crate::cell::LocalActorCell;
use dashmap::DashMap;
use hive_core::ActorId;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

struct RegistryEntry {
    cell: Weak<LocalActorCell>,
    tag: String,
    type_name: &'static str,
}

/// Identity, tag and type indexes over the live actors of one runtime
pub struct ActorRegistry {
    by_id: DashMap<ActorId, RegistryEntry>,
    by_tag: DashMap<String, HashSet<ActorId>>,
    by_type: DashMap<&'static str, HashSet<ActorId>>,
}

impl ActorRegistry {
    pub(crate) fn new() -> Self {
        ActorRegistry {
            by_id: DashMap::new(),
            by_tag: DashMap::new(),
            by_type: DashMap::new(),
        }
    }

    pub(crate) fn register(&self, cell: &Arc<LocalActorCell>) {
        let id = *cell.id();
        let tag = cell.tag();
        let type_name = cell.type_name();
        self.by_id.insert(
            id,
            RegistryEntry {
                cell: Arc::downgrade(cell),
                tag: tag.clone(),
                type_name,
            },
        );
        self.by_tag.entry(tag).or_default().insert(id);
        self.by_type.entry(type_name).or_default().insert(id);
        tracing::trace!(actor = %id, "registered");
    }

    pub(crate) fn unregister(&self, cell: &Arc<LocalActorCell>) {
        let id = cell.id();
        if let Some((_, entry)) = self.by_id.remove(id) {
            self.drop_index_entry(&entry.tag, entry.type_name, id);
        }
        tracing::trace!(actor = %id, "unregistered");
    }

    pub(crate) fn update_tag(&self, id: &ActorId, old_tag: &str, new_tag: String) {
        let mut known = false;
        if let Some(mut entry) = self.by_id.get_mut(id) {
            entry.tag = new_tag.clone();
            known = true;
        }
        if !known {
            return;
        }
        if let Some(mut ids) = self.by_tag.get_mut(old_tag) {
            ids.remove(id);
        }
        self.by_tag.entry(new_tag).or_default().insert(*id);
    }

    fn drop_index_entry(&self, tag: &str, type_name: &'static str, id: &ActorId) {
        let tag_empty = match self.by_tag.get_mut(tag) {
            Some(mut ids) => {
                ids.remove(id);
                ids.is_empty()
            }
            None => false,
        };
        if tag_empty {
            self.by_tag.remove_if(tag, |_, ids| ids.is_empty());
        }
        let type_empty = match self.by_type.get_mut(type_name) {
            Some(mut ids) => {
                ids.remove(id);
                ids.is_empty()
            }
            None => false,
        };
        if type_empty {
            self.by_type.remove_if(type_name, |_, ids| ids.is_empty());
        }
    }

    fn live_ref(&self, id: &ActorId) -> Option<ActorRef> {
        let entry = self.by_id.get(id)?;
        let cell = entry.cell.upgrade()?;
        drop(entry);
        match cell.state() {
            ActorState::Running | ActorState::BeingRestarted => Some(ActorRef::from_local(cell)),
            _ => None,
        }
    }

    /// The handle for `id`, while the actor is Running or BeingRestarted
    pub fn find_by_id(&self, id: &ActorId) -> Option<ActorRef> {
        self.live_ref(id)
    }

    /// Every live actor carrying `tag` (tags are not unique)
    pub fn find_by_tag(&self, tag: &str) -> Vec<ActorRef> {
        let ids: Vec<ActorId> = match self.by_tag.get(tag) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };
        ids.iter().filter_map(|id| self.live_ref(id)).collect()
    }

    /// Every live actor whose instance has the given implementation type name
    pub fn find_by_implementation(&self, type_name: &str) -> Vec<ActorRef> {
        let ids: Vec<ActorId> = match self.by_type.get(type_name) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };
        ids.iter().filter_map(|id| self.live_ref(id)).collect()
    }

    /// Every live actor implemented by `A`
    pub fn find_by_impl_type<A: Actor>(&self) -> Vec<ActorRef> {
        self.find_by_implementation(std::any::type_name::<A>())
    }

    /// Number of registered ids (including ones mid-teardown)
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub(crate) fn all_cells(&self) -> Vec<Arc<LocalActorCell>> {
        self.by_id
            .iter()
            .filter_map(|entry| entry.cell.upgrade())
            .collect()
    }
}
