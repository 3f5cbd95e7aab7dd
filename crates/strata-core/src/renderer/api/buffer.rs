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

//! Defines data structures related to GPU buffer resources.

use std::borrow::Cow;

/// Describes how a buffer will be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// The buffer can be bound as a vertex stream.
    Vertex,
    /// The buffer can be bound as an index buffer.
    Index,
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// How the buffer will be bound.
    pub usage: BufferUsage,
}

/// An opaque handle to a GPU buffer resource.
///
/// This ID is returned by [`GraphicsDevice::create_buffer`](crate::renderer::GraphicsDevice::create_buffer)
/// and is used to reference the buffer in all subsequent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

/// Specifies the format of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// Indices are 16-bit unsigned integers.
    Uint16,
    /// Indices are 32-bit unsigned integers.
    Uint32,
}

/// A vertex buffer together with its layout summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBuffer {
    /// The device buffer holding the vertices.
    pub id: BufferId,
    /// Size of one vertex in bytes.
    pub stride: u32,
    /// Number of vertices stored in the buffer.
    pub vertex_count: u32,
}

/// An index buffer bound alongside a submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBuffer {
    /// The device buffer holding the indices.
    pub id: BufferId,
    /// Width of one index.
    pub format: IndexFormat,
    /// Number of indices stored in the buffer.
    pub index_count: u32,
}

/// Whether a vertex stream advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    /// The stream advances once per vertex.
    Vertex,
    /// The stream advances once per instance.
    Instance,
}

/// One vertex stream handed to [`GraphicsDevice::set_vertex_buffers`](crate::renderer::GraphicsDevice::set_vertex_buffers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferBinding {
    /// The bound buffer.
    pub buffer: BufferId,
    /// Size of one element in bytes.
    pub stride: u32,
    /// First element read from the buffer.
    pub offset: u32,
    /// Step rate of the stream.
    pub step_mode: VertexStepMode,
}

impl VertexBufferBinding {
    /// A per-vertex stream starting at element 0.
    pub fn per_vertex(buffer: &VertexBuffer) -> Self {
        Self {
            buffer: buffer.id,
            stride: buffer.stride,
            offset: 0,
            step_mode: VertexStepMode::Vertex,
        }
    }

    /// A per-instance stream starting at element 0.
    pub fn per_instance(buffer: BufferId, stride: u32) -> Self {
        Self {
            buffer,
            stride,
            offset: 0,
            step_mode: VertexStepMode::Instance,
        }
    }
}
