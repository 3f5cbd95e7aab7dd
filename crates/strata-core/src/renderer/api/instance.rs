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

//! Per-instance vertex data and nodes that supply their own instance buffers.

use super::buffer::{BufferDescriptor, BufferId, BufferUsage, VertexBufferBinding};
use crate::math::{Mat4, Vec3};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};

/// One element of a per-instance vertex stream.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    /// World transform, column-major.
    pub world: [[f32; 4]; 4],
    /// RGBA tint. White and opaque unless a per-instance parameter says otherwise.
    pub color: [f32; 4],
}

impl InstanceData {
    /// Size of one element in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<InstanceData>() as u32;

    /// Size in bytes of a buffer holding `count` instances.
    ///
    /// Fails with [`ResourceError::OutOfBounds`] when the size does not fit in a `u64`.
    pub fn buffer_size(count: usize) -> Result<u64, ResourceError> {
        u64::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(u64::from(Self::STRIDE)))
            .ok_or(ResourceError::OutOfBounds)
    }

    /// An untinted instance at `world`.
    pub fn new(world: &Mat4) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            color: [1.0; 4],
        }
    }

    /// Replaces the RGB part of the tint.
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color[..3].copy_from_slice(&color.to_array());
        self
    }

    /// Replaces the alpha part of the tint.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.color[3] = alpha;
        self
    }
}

/// A scene node that owns a prebuilt per-instance vertex buffer.
///
/// The lane draws such nodes with one instanced draw per submesh and never
/// merges them with other nodes.
pub trait InstancingSource {
    /// Uploads pending instance data. Called once per frame while jobs are built.
    fn update_instance_buffer(&self, device: &mut dyn GraphicsDevice) -> Result<(), ResourceError>;

    /// The instance stream, once uploaded.
    fn instance_buffer(&self) -> Option<VertexBufferBinding>;

    /// Number of instances in the uploaded stream.
    fn instance_count(&self) -> u32;
}

/// A fixed set of instances uploaded whenever it changes.
#[derive(Debug)]
pub struct StaticInstanceSet {
    label: String,
    instances: RefCell<Vec<InstanceData>>,
    buffer: Cell<Option<(BufferId, usize)>>,
    uploaded: Cell<u32>,
    dirty: Cell<bool>,
}

impl StaticInstanceSet {
    /// Creates the set. Nothing is uploaded until the first frame.
    pub fn new(label: impl Into<String>, instances: Vec<InstanceData>) -> Self {
        Self {
            label: label.into(),
            instances: RefCell::new(instances),
            buffer: Cell::new(None),
            uploaded: Cell::new(0),
            dirty: Cell::new(true),
        }
    }

    /// Replaces the instances; they are uploaded on the next frame.
    pub fn set_instances(&self, instances: Vec<InstanceData>) {
        *self.instances.borrow_mut() = instances;
        self.dirty.set(true);
    }

    /// Number of instances held on the CPU side.
    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    /// Whether the set holds no instance.
    pub fn is_empty(&self) -> bool {
        self.instances.borrow().is_empty()
    }
}

impl InstancingSource for StaticInstanceSet {
    fn update_instance_buffer(&self, device: &mut dyn GraphicsDevice) -> Result<(), ResourceError> {
        if !self.dirty.get() {
            return Ok(());
        }
        let instances = self.instances.borrow();
        if instances.is_empty() {
            self.uploaded.set(0);
            self.dirty.set(false);
            return Ok(());
        }

        let buffer = match self.buffer.get() {
            Some((id, capacity)) if capacity >= instances.len() => id,
            _ => {
                let size = InstanceData::buffer_size(instances.len())?;
                if let Some((stale, _)) = self.buffer.take() {
                    self.uploaded.set(0);
                    device.destroy_buffer(stale)?;
                }
                let id = device.create_buffer(&BufferDescriptor {
                    label: Some(Cow::Borrowed(self.label.as_str())),
                    size,
                    usage: BufferUsage::Vertex,
                })?;
                self.buffer.set(Some((id, instances.len())));
                id
            }
        };
        device.write_buffer(buffer, 0, bytemuck::cast_slice(instances.as_slice()))?;

        self.uploaded.set(instances.len() as u32);
        self.dirty.set(false);
        log::trace!(
            "StaticInstanceSet '{}': uploaded {} instances",
            self.label,
            instances.len()
        );
        Ok(())
    }

    fn instance_buffer(&self) -> Option<VertexBufferBinding> {
        self.buffer
            .get()
            .map(|(id, _)| VertexBufferBinding::per_instance(id, InstanceData::STRIDE))
    }

    fn instance_count(&self) -> u32 {
        self.uploaded.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::HeadlessDevice;

    #[test]
    fn test_instance_data_layout() {
        assert_eq!(InstanceData::STRIDE, 80);
        let data = InstanceData::new(&Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)))
            .with_color(Vec3::new(0.5, 0.25, 0.0))
            .with_alpha(0.5);
        assert_eq!(data.world[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(data.color, [0.5, 0.25, 0.0, 0.5]);
    }

    #[test]
    fn test_static_set_uploads_only_when_dirty() {
        let mut device = HeadlessDevice::new();
        let set = StaticInstanceSet::new("trees", vec![InstanceData::new(&Mat4::IDENTITY); 3]);
        assert!(set.instance_buffer().is_none());

        set.update_instance_buffer(&mut device).unwrap();
        assert_eq!(set.instance_count(), 3);
        let first = set.instance_buffer().expect("buffer should exist after upload");
        let commands = device.commands().len();

        set.update_instance_buffer(&mut device).unwrap();
        assert_eq!(device.commands().len(), commands, "Clean set must not re-upload");

        set.set_instances(vec![InstanceData::new(&Mat4::IDENTITY); 2]);
        set.update_instance_buffer(&mut device).unwrap();
        assert_eq!(set.instance_count(), 2);
        assert_eq!(
            set.instance_buffer().map(|b| b.buffer),
            Some(first.buffer),
            "Shrinking reuses the buffer"
        );
    }

    #[test]
    fn test_static_set_growth_replaces_the_buffer() {
        let stride = u64::from(InstanceData::STRIDE);
        // Room for the grown buffer only: the old one must go first.
        let mut device = HeadlessDevice::new().with_memory_budget(stride * 5);
        let set = StaticInstanceSet::new("rocks", vec![InstanceData::new(&Mat4::IDENTITY); 2]);
        set.update_instance_buffer(&mut device).unwrap();
        let first = set.instance_buffer().expect("buffer should exist after upload");

        set.set_instances(vec![InstanceData::new(&Mat4::IDENTITY); 5]);
        set.update_instance_buffer(&mut device)
            .expect("Growth should fit once the old buffer is released");

        assert_eq!(set.instance_count(), 5);
        assert_ne!(set.instance_buffer().map(|b| b.buffer), Some(first.buffer));
        assert_eq!(device.live_buffers(), 1, "Only the grown buffer may stay alive");
        assert_eq!(device.allocated_bytes(), stride * 5);
    }

    #[test]
    fn test_buffer_size_overflow() {
        assert_eq!(InstanceData::buffer_size(4), Ok(320));
        assert_eq!(
            InstanceData::buffer_size(usize::MAX),
            Err(ResourceError::OutOfBounds)
        );
    }
}
