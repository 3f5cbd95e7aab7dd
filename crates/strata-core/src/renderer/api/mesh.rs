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

//! Mesh geometry: submeshes, their buffers and morph targets.

use super::buffer::{IndexBuffer, VertexBuffer};
use super::material::Material;
use super::state::PrimitiveTopology;
use crate::asset::AssetUUID;
use std::rc::Rc;

/// An alternative vertex stream blended over the base geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTarget {
    /// Name used to look the weight up in [`MorphWeights`](super::MorphWeights).
    pub name: String,
    /// Vertex data of the target.
    pub vertex_buffer: VertexBuffer,
}

/// A contiguous range of geometry drawn with a single material.
#[derive(Debug, Clone, PartialEq)]
pub struct Submesh {
    uuid: AssetUUID,
    /// Base vertex stream. Submeshes without one are never drawn.
    pub vertex_buffer: Option<VertexBuffer>,
    /// Optional index buffer.
    pub index_buffer: Option<IndexBuffer>,
    /// How vertices are assembled.
    pub topology: PrimitiveTopology,
    /// First vertex used (base vertex for indexed draws).
    pub start_vertex: u32,
    /// Number of vertices used. Zero means nothing to draw.
    pub vertex_count: u32,
    /// First index used for indexed draws.
    pub start_index: u32,
    /// Number of primitives drawn.
    pub primitive_count: u32,
    /// Index of the material instance on the owning node.
    pub material_index: usize,
    /// Morph targets, in declaration order.
    pub morph_targets: Vec<MorphTarget>,
}

impl Submesh {
    /// A non-indexed submesh covering the whole vertex buffer.
    pub fn new(vertex_buffer: VertexBuffer, topology: PrimitiveTopology, material_index: usize) -> Self {
        Self {
            uuid: AssetUUID::new(),
            vertex_buffer: Some(vertex_buffer),
            index_buffer: None,
            topology,
            start_vertex: 0,
            vertex_count: vertex_buffer.vertex_count,
            start_index: 0,
            primitive_count: topology.primitive_count(vertex_buffer.vertex_count),
            material_index,
            morph_targets: Vec::new(),
        }
    }

    /// Makes the submesh indexed, drawing the whole index buffer.
    pub fn with_index_buffer(mut self, index_buffer: IndexBuffer) -> Self {
        self.primitive_count = self.topology.primitive_count(index_buffer.index_count);
        self.index_buffer = Some(index_buffer);
        self
    }

    /// Appends a morph target.
    pub fn with_morph_target(mut self, name: impl Into<String>, vertex_buffer: VertexBuffer) -> Self {
        self.morph_targets.push(MorphTarget {
            name: name.into(),
            vertex_buffer,
        });
        self
    }

    /// Stable identity of the submesh.
    pub fn uuid(&self) -> AssetUUID {
        self.uuid
    }

    /// Whether the submesh has geometry to submit.
    pub fn is_drawable(&self) -> bool {
        self.vertex_buffer.is_some() && self.vertex_count > 0
    }
}

/// Geometry plus the materials its submeshes refer to.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Debug name.
    pub name: String,
    /// Submeshes, drawn in this order when no sorting applies.
    pub submeshes: Vec<Submesh>,
    /// Materials indexed by [`Submesh::material_index`].
    pub materials: Vec<Rc<Material>>,
}

impl Mesh {
    /// Creates a mesh.
    pub fn new(name: impl Into<String>, submeshes: Vec<Submesh>, materials: Vec<Rc<Material>>) -> Self {
        Self {
            name: name.into(),
            submeshes,
            materials,
        }
    }
}
