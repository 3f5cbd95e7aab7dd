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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// An immediate-mode graphics device.
///
/// The batching lane owns the device exclusively for the duration of a frame
/// and drives it from a single thread, so every method takes `&mut self`.
pub trait GraphicsDevice: Debug {
    /// Returns the current fixed-function state.
    fn render_state(&self) -> RenderStateBlock;

    /// Replaces the fixed-function state.
    fn set_render_state(&mut self, state: &RenderStateBlock);

    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - Size, usage and label of the buffer.
    /// ## Errors
    /// * `ResourceError` - If the backend cannot allocate the buffer.
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to be destroyed.
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If `id` is unknown.
    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes `data` into a buffer at byte `offset`.
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If `id` is unknown.
    /// * `ResourceError::OutOfBounds` - If the write does not fit the buffer.
    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Binds vertex streams, replacing every previously bound stream.
    fn set_vertex_buffers(&mut self, bindings: &[VertexBufferBinding]);

    /// Binds (or unbinds) the index buffer.
    fn set_index_buffer(&mut self, buffer: Option<&IndexBuffer>);

    /// Sets the value of an effect parameter.
    fn set_parameter(&mut self, effect: &Effect, name: &str, value: &ParameterValue);

    /// Applies a pass: binds its program and any state it declares.
    fn apply_pass(&mut self, effect: &Effect, technique: &Technique, pass: &EffectPass);

    /// Draws non-indexed primitives.
    fn draw_primitives(&mut self, topology: PrimitiveTopology, start_vertex: u32, primitive_count: u32);

    /// Draws indexed primitives.
    fn draw_indexed_primitives(
        &mut self,
        topology: PrimitiveTopology,
        base_vertex: u32,
        start_index: u32,
        primitive_count: u32,
    );

    /// Draws indexed primitives once per instance of the bound per-instance stream.
    fn draw_instanced_primitives(
        &mut self,
        topology: PrimitiveTopology,
        base_vertex: u32,
        start_index: u32,
        primitive_count: u32,
        instance_count: u32,
    );
}
