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

//! Packed sort keys.
//!
//! Three `u32` keys are computed per job so that sorting and grouping only
//! compare integers:
//!
//! ```text
//! material key  | effect:12 | material:12 | technique:7 | static:1 |
//! submesh key   | stride/4:6 |00| vertex buffer:13 | submesh:13 |
//! distance key  | 0:16 | top 16 bits of the sortable distance |
//! ```
//!
//! Field values are per-frame IDs from the [`ResourceIdAllocator`](super::ResourceIdAllocator),
//! which refuses to hand out IDs that would not fit. The encoders mask in
//! release builds and assert in debug builds.

/// Submesh key of jobs drawn from a node's own instance buffer. Never merged.
pub const UNMERGEABLE_SUBMESH_KEY: u32 = 0xFFFF_FFFF;

/// Largest effect ID a material key can hold.
pub const MAX_EFFECT_ID: u32 = 0xFFF;
/// Largest material ID a material key can hold.
pub const MAX_MATERIAL_ID: u32 = 0xFFF;
/// Largest technique index a material key can hold.
pub const MAX_TECHNIQUE_ID: u8 = 0x7F;
/// Largest vertex-buffer ID a submesh key can hold.
pub const MAX_VERTEX_BUFFER_ID: u32 = 0x1FFF;
/// Largest submesh ID a submesh key can hold.
pub const MAX_SUBMESH_ID: u32 = 0x1FFF;

/// Packs the state a job needs bound into a material key.
#[inline]
pub fn material_key(effect_id: u32, material_id: u32, technique_id: u8, is_static: bool) -> u32 {
    debug_assert!(effect_id <= MAX_EFFECT_ID, "effect id {effect_id} overflows its key field");
    debug_assert!(material_id <= MAX_MATERIAL_ID, "material id {material_id} overflows its key field");
    debug_assert!(technique_id <= MAX_TECHNIQUE_ID, "technique {technique_id} overflows its key field");
    (effect_id & MAX_EFFECT_ID) << 20
        | (material_id & MAX_MATERIAL_ID) << 8
        | u32::from(technique_id & MAX_TECHNIQUE_ID) << 1
        | u32::from(is_static)
}

/// Packs a submesh's geometry identity into a submesh key.
///
/// `stride` must be a multiple of 4 no larger than 255.
#[inline]
pub fn submesh_key(stride: u32, vertex_buffer_id: u32, submesh_id: u32) -> u32 {
    debug_assert!(stride <= 0xFF && stride % 4 == 0, "vertex stride {stride} has no key class");
    debug_assert!(vertex_buffer_id <= MAX_VERTEX_BUFFER_ID);
    debug_assert!(submesh_id <= MAX_SUBMESH_ID);
    (stride & 0xFC) << 24 | (vertex_buffer_id & MAX_VERTEX_BUFFER_ID) << 13 | (submesh_id & MAX_SUBMESH_ID)
}

/// Maps a signed view depth to an unsigned key with the same ordering.
///
/// Uses the usual float-to-sortable-integer flip and keeps the top 16 bits,
/// so distances closer than the quantisation step can share a key.
#[inline]
pub fn distance_key(distance: f32) -> u32 {
    let bits = distance.to_bits();
    let sortable = if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    };
    sortable >> 16
}

/// The fields of a material key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialKeyFields {
    pub effect_id: u32,
    pub material_id: u32,
    pub technique_id: u8,
    pub is_static: bool,
}

/// Unpacks a material key.
#[inline]
pub fn decode_material_key(key: u32) -> MaterialKeyFields {
    MaterialKeyFields {
        effect_id: key >> 20,
        material_id: (key >> 8) & MAX_MATERIAL_ID,
        technique_id: ((key >> 1) & u32::from(MAX_TECHNIQUE_ID)) as u8,
        is_static: key & 1 == 1,
    }
}
