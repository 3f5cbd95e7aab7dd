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

//! A [`GraphicsDevice`] that records what it is asked to do instead of drawing.
//!
//! Used by the sandbox and by tests to inspect the exact command stream the
//! batching lane produces.

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::collections::HashMap;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// [`GraphicsDevice::set_render_state`].
    SetRenderState(RenderStateBlock),
    /// [`GraphicsDevice::create_buffer`].
    CreateBuffer {
        /// Returned handle.
        id: BufferId,
        /// Requested size in bytes.
        size: u64,
    },
    /// [`GraphicsDevice::destroy_buffer`].
    DestroyBuffer(BufferId),
    /// [`GraphicsDevice::write_buffer`].
    WriteBuffer {
        /// Target buffer.
        id: BufferId,
        /// Byte offset.
        offset: u64,
        /// Bytes written.
        len: usize,
    },
    /// [`GraphicsDevice::set_vertex_buffers`].
    SetVertexBuffers(Vec<VertexBufferBinding>),
    /// [`GraphicsDevice::set_index_buffer`].
    SetIndexBuffer(Option<BufferId>),
    /// [`GraphicsDevice::set_parameter`].
    SetParameter {
        /// Effect name.
        effect: String,
        /// Parameter name.
        name: String,
        /// Value set.
        value: ParameterValue,
    },
    /// [`GraphicsDevice::apply_pass`].
    ApplyPass {
        /// Effect name.
        effect: String,
        /// Technique name.
        technique: String,
        /// Pass name.
        pass: String,
    },
    /// [`GraphicsDevice::draw_primitives`].
    Draw {
        /// Topology.
        topology: PrimitiveTopology,
        /// First vertex.
        start_vertex: u32,
        /// Primitive count.
        primitive_count: u32,
    },
    /// [`GraphicsDevice::draw_indexed_primitives`].
    DrawIndexed {
        /// Topology.
        topology: PrimitiveTopology,
        /// Base vertex.
        base_vertex: u32,
        /// First index.
        start_index: u32,
        /// Primitive count.
        primitive_count: u32,
    },
    /// [`GraphicsDevice::draw_instanced_primitives`].
    DrawInstanced {
        /// Topology.
        topology: PrimitiveTopology,
        /// Base vertex.
        base_vertex: u32,
        /// First index.
        start_index: u32,
        /// Primitive count.
        primitive_count: u32,
        /// Instance count.
        instance_count: u32,
    },
}

impl DeviceCommand {
    /// Whether the command issues a draw.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DeviceCommand::Draw { .. }
                | DeviceCommand::DrawIndexed { .. }
                | DeviceCommand::DrawInstanced { .. }
        )
    }
}

/// A recording device with CPU-side buffer storage.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: RenderStateBlock,
    commands: Vec<DeviceCommand>,
    buffers: HashMap<BufferId, Vec<u8>>,
    next_buffer: usize,
    memory_budget: Option<u64>,
    allocated: u64,
}

impl HeadlessDevice {
    /// Creates a device with default render state and unlimited memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the total bytes [`create_buffer`](GraphicsDevice::create_buffer) may allocate.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Every command recorded so far.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Returns and clears the recorded commands.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded draw commands only.
    pub fn draw_calls(&self) -> Vec<&DeviceCommand> {
        self.commands.iter().filter(|c| c.is_draw()).collect()
    }

    /// Number of buffers created and not yet destroyed.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Bytes held by live buffers.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    /// Contents of a buffer, if it exists.
    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn render_state(&self) -> RenderStateBlock {
        self.state
    }

    fn set_render_state(&mut self, state: &RenderStateBlock) {
        self.state = *state;
        self.commands.push(DeviceCommand::SetRenderState(*state));
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        if let Some(budget) = self.memory_budget {
            if self.allocated + descriptor.size > budget {
                return Err(ResourceError::BackendError(format!(
                    "out of memory allocating {} bytes for '{}'",
                    descriptor.size,
                    descriptor.label.as_deref().unwrap_or("unnamed")
                )));
            }
        }
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.allocated += descriptor.size;
        self.buffers.insert(id, vec![0; descriptor.size as usize]);
        self.commands.push(DeviceCommand::CreateBuffer {
            id,
            size: descriptor.size,
        });
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        let storage = self.buffers.remove(&id).ok_or(ResourceError::InvalidHandle)?;
        self.allocated -= storage.len() as u64;
        self.commands.push(DeviceCommand::DestroyBuffer(id));
        Ok(())
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let storage = self.buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle)?;
        let start = offset as usize;
        let end = start + data.len();
        if end > storage.len() {
            return Err(ResourceError::OutOfBounds);
        }
        storage[start..end].copy_from_slice(data);
        self.commands.push(DeviceCommand::WriteBuffer {
            id,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn set_vertex_buffers(&mut self, bindings: &[VertexBufferBinding]) {
        self.commands
            .push(DeviceCommand::SetVertexBuffers(bindings.to_vec()));
    }

    fn set_index_buffer(&mut self, buffer: Option<&IndexBuffer>) {
        self.commands
            .push(DeviceCommand::SetIndexBuffer(buffer.map(|b| b.id)));
    }

    fn set_parameter(&mut self, effect: &Effect, name: &str, value: &ParameterValue) {
        self.commands.push(DeviceCommand::SetParameter {
            effect: effect.name().to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
    }

    fn apply_pass(&mut self, effect: &Effect, technique: &Technique, pass: &EffectPass) {
        if let Some(state) = pass.render_state {
            self.state = state;
        }
        self.commands.push(DeviceCommand::ApplyPass {
            effect: effect.name().to_string(),
            technique: technique.name().to_string(),
            pass: pass.name.clone(),
        });
    }

    fn draw_primitives(&mut self, topology: PrimitiveTopology, start_vertex: u32, primitive_count: u32) {
        self.commands.push(DeviceCommand::Draw {
            topology,
            start_vertex,
            primitive_count,
        });
    }

    fn draw_indexed_primitives(
        &mut self,
        topology: PrimitiveTopology,
        base_vertex: u32,
        start_index: u32,
        primitive_count: u32,
    ) {
        self.commands.push(DeviceCommand::DrawIndexed {
            topology,
            base_vertex,
            start_index,
            primitive_count,
        });
    }

    fn draw_instanced_primitives(
        &mut self,
        topology: PrimitiveTopology,
        base_vertex: u32,
        start_index: u32,
        primitive_count: u32,
        instance_count: u32,
    ) {
        self.commands.push(DeviceCommand::DrawInstanced {
            topology,
            base_vertex,
            start_index,
            primitive_count,
            instance_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn descriptor(size: u64) -> BufferDescriptor<'static> {
        BufferDescriptor {
            label: Some(Cow::Borrowed("test")),
            size,
            usage: BufferUsage::Vertex,
        }
    }

    #[test]
    fn test_write_buffer_bounds() {
        let mut device = HeadlessDevice::new();
        let id = device.create_buffer(&descriptor(8)).unwrap();
        device.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.buffer_contents(id), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
        assert_eq!(
            device.write_buffer(id, 6, &[0; 4]),
            Err(ResourceError::OutOfBounds)
        );
        assert_eq!(
            device.write_buffer(BufferId(99), 0, &[0]),
            Err(ResourceError::InvalidHandle)
        );
    }

    #[test]
    fn test_memory_budget() {
        let mut device = HeadlessDevice::new().with_memory_budget(16);
        assert!(device.create_buffer(&descriptor(10)).is_ok());
        assert!(matches!(
            device.create_buffer(&descriptor(10)),
            Err(ResourceError::BackendError(_))
        ));
    }

    #[test]
    fn test_destroy_buffer_returns_memory() {
        let mut device = HeadlessDevice::new().with_memory_budget(16);
        let id = device.create_buffer(&descriptor(10)).unwrap();
        device.destroy_buffer(id).unwrap();
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.allocated_bytes(), 0);
        assert!(
            device.create_buffer(&descriptor(10)).is_ok(),
            "Destroyed memory must be reusable"
        );
        assert_eq!(device.destroy_buffer(id), Err(ResourceError::InvalidHandle));
        assert_eq!(device.write_buffer(id, 0, &[1]), Err(ResourceError::InvalidHandle));
    }

    #[test]
    fn test_apply_pass_changes_state() {
        let mut device = HeadlessDevice::new();
        let blended = RenderStateBlock {
            blend: BlendState::AlphaBlend,
            ..Default::default()
        };
        let effect = Effect::new(
            "Glass",
            vec![Technique::new(
                "Main",
                vec![EffectPass::new("p0").with_render_state(blended)],
            )],
        );
        let technique = &effect.techniques()[0];
        device.apply_pass(&effect, technique, &technique.passes()[0]);
        assert_eq!(device.render_state(), blended);
        assert_eq!(device.take_commands().len(), 1);
        assert!(device.commands().is_empty());
    }
}
