// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-frame resource IDs used to fill sort keys.
//!
//! IDs live in a side table owned by the lane rather than on the resources,
//! keyed by the resources' stable handles. Effects and vertex buffers draw from
//! frame-wide counters; materials count per effect and submeshes count per
//! vertex buffer. The batch processor releases entries as it consumes jobs and
//! the lane clears the table wholesale at the end of every frame.

use super::error::BatchError;
use super::sort_key::{MAX_EFFECT_ID, MAX_MATERIAL_ID, MAX_SUBMESH_ID, MAX_VERTEX_BUFFER_ID};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use strata_core::renderer::BufferId;
use strata_core::AssetUUID;

/// The four kinds of per-frame IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdSpace {
    Effect,
    Material,
    VertexBuffer,
    Submesh,
}

impl IdSpace {
    /// Largest ID the matching key field can hold.
    pub const fn limit(self) -> u32 {
        match self {
            IdSpace::Effect => MAX_EFFECT_ID,
            IdSpace::Material => MAX_MATERIAL_ID,
            IdSpace::VertexBuffer => MAX_VERTEX_BUFFER_ID,
            IdSpace::Submesh => MAX_SUBMESH_ID,
        }
    }
}

impl fmt::Display for IdSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdSpace::Effect => "effect",
            IdSpace::Material => "material",
            IdSpace::VertexBuffer => "vertex buffer",
            IdSpace::Submesh => "submesh",
        })
    }
}

/// An ID plus the counter for the IDs it owns.
#[derive(Debug)]
struct Slot<K> {
    id: u32,
    counter: u32,
    children: HashMap<K, u32>,
}

impl<K: Eq + Hash> Slot<K> {
    fn child_id(&mut self, key: K, space: IdSpace) -> Result<u32, BatchError> {
        if let Some(&id) = self.children.get(&key) {
            return Ok(id);
        }
        let id = next_id(&mut self.counter, space)?;
        self.children.insert(key, id);
        Ok(id)
    }
}

fn next_id(counter: &mut u32, space: IdSpace) -> Result<u32, BatchError> {
    if *counter >= space.limit() {
        return Err(BatchError::IdSpaceExhausted {
            resource: space,
            limit: space.limit(),
        });
    }
    *counter += 1;
    Ok(*counter)
}

fn slot<'m, K, C>(
    map: &'m mut HashMap<K, Slot<C>>,
    counter: &mut u32,
    key: K,
    space: IdSpace,
) -> Result<&'m mut Slot<C>, BatchError>
where
    K: Eq + Hash,
{
    match map.entry(key) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let id = next_id(counter, space)?;
            Ok(entry.insert(Slot {
                id,
                counter: 0,
                children: HashMap::new(),
            }))
        }
    }
}

/// Side table of per-frame IDs. IDs start at 1; absence means unassigned.
#[derive(Debug, Default)]
pub struct ResourceIdAllocator {
    effects: HashMap<AssetUUID, Slot<AssetUUID>>,
    vertex_buffers: HashMap<BufferId, Slot<AssetUUID>>,
    effect_counter: u32,
    vertex_buffer_counter: u32,
}

impl ResourceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the effect's ID, assigning the next one on first use.
    pub fn effect_id(&mut self, effect: AssetUUID) -> Result<u32, BatchError> {
        slot(&mut self.effects, &mut self.effect_counter, effect, IdSpace::Effect).map(|s| s.id)
    }

    /// Returns the material's ID within `effect`, assigning the effect's ID too if needed.
    pub fn material_id(&mut self, effect: AssetUUID, material: AssetUUID) -> Result<u32, BatchError> {
        slot(&mut self.effects, &mut self.effect_counter, effect, IdSpace::Effect)?
            .child_id(material, IdSpace::Material)
    }

    /// Returns the vertex buffer's ID, assigning the next one on first use.
    pub fn vertex_buffer_id(&mut self, buffer: BufferId) -> Result<u32, BatchError> {
        slot(
            &mut self.vertex_buffers,
            &mut self.vertex_buffer_counter,
            buffer,
            IdSpace::VertexBuffer,
        )
        .map(|s| s.id)
    }

    /// Returns the submesh's ID within `buffer`, assigning the buffer's ID too if needed.
    pub fn submesh_id(&mut self, buffer: BufferId, submesh: AssetUUID) -> Result<u32, BatchError> {
        slot(
            &mut self.vertex_buffers,
            &mut self.vertex_buffer_counter,
            buffer,
            IdSpace::VertexBuffer,
        )?
        .child_id(submesh, IdSpace::Submesh)
    }

    /// Unassigns the effect's ID together with its material IDs and material counter.
    pub fn release_effect(&mut self, effect: AssetUUID) {
        self.effects.remove(&effect);
    }

    /// Unassigns one material ID.
    pub fn release_material(&mut self, effect: AssetUUID, material: AssetUUID) {
        if let Some(slot) = self.effects.get_mut(&effect) {
            slot.children.remove(&material);
        }
    }

    /// Unassigns the buffer's ID together with its submesh IDs and submesh counter.
    pub fn release_vertex_buffer(&mut self, buffer: BufferId) {
        self.vertex_buffers.remove(&buffer);
    }

    /// Unassigns one submesh ID.
    pub fn release_submesh(&mut self, buffer: BufferId, submesh: AssetUUID) {
        if let Some(slot) = self.vertex_buffers.get_mut(&buffer) {
            slot.children.remove(&submesh);
        }
    }

    /// Number of IDs still assigned.
    pub fn live_count(&self) -> usize {
        let effects: usize = self.effects.values().map(|s| 1 + s.children.len()).sum();
        let buffers: usize = self.vertex_buffers.values().map(|s| 1 + s.children.len()).sum();
        effects + buffers
    }

    /// Whether no ID is assigned and every counter is back to zero.
    pub fn is_clear(&self) -> bool {
        self.live_count() == 0 && self.effect_counter == 0 && self.vertex_buffer_counter == 0
    }

    /// Drops every ID and resets all counters. Returns how many IDs were still assigned.
    pub fn clear(&mut self) -> usize {
        let live = self.live_count();
        self.effects.clear();
        self.vertex_buffers.clear();
        self.effect_counter = 0;
        self.vertex_buffer_counter = 0;
        live
    }
}
