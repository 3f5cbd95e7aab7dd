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

//! The dynamic instance buffer and per-instance parameter gathering.

use super::error::BatchError;
use super::job::Job;
use std::borrow::Cow;
use strata_core::renderer::{
    semantics, BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, InstanceData, ParameterHint,
    ParameterType, ParameterValue, ResourceError, VertexBufferBinding,
};

/// A fixed-capacity scratch buffer for instances merged at submission time.
///
/// The CPU side fills up to `capacity` instances; [`upload`](Self::upload)
/// copies them into a device buffer that is created once and reused.
///
/// Every upload writes at offset 0, so a run split over several flushes
/// rewrites the same region. This relies on the device consuming each draw
/// before the next write, which holds for the immediate-mode
/// [`GraphicsDevice`] contract.
#[derive(Debug)]
pub struct InstanceBatch {
    data: Vec<InstanceData>,
    capacity: usize,
    buffer: Option<(BufferId, usize)>,
}

impl InstanceBatch {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            buffer: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity. The device buffer is recreated on the next upload if it is too small.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the next push would exceed the capacity. A full batch must be flushed.
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn push(&mut self, instance: InstanceData) {
        debug_assert!(!self.is_full(), "instance batch overflow");
        self.data.push(instance);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Copies the pending instances to the device and returns the instance stream.
    pub fn upload(
        &mut self,
        device: &mut dyn GraphicsDevice,
    ) -> Result<VertexBufferBinding, ResourceError> {
        let id = match self.buffer {
            Some((id, capacity)) if capacity >= self.capacity => id,
            _ => {
                let size = InstanceData::buffer_size(self.capacity)?;
                self.release(device)?;
                let id = device.create_buffer(&BufferDescriptor {
                    label: Some(Cow::Borrowed("MeshRenderLane instances")),
                    size,
                    usage: BufferUsage::Vertex,
                })?;
                log::debug!(
                    "MeshRenderLane: created instance buffer {:?} for {} instances",
                    id,
                    self.capacity
                );
                self.buffer = Some((id, self.capacity));
                id
            }
        };
        device.write_buffer(id, 0, bytemuck::cast_slice(&self.data))?;
        Ok(VertexBufferBinding::per_instance(id, InstanceData::STRIDE))
    }

    /// Destroys the device buffer, if one was created. The next upload creates a new one.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), ResourceError> {
        match self.buffer.take() {
            Some((id, _)) => device.destroy_buffer(id),
            None => Ok(()),
        }
    }
}

/// Builds the instance record of `job` from its per-instance parameters.
///
/// The node's world transform is the default; `World`, `InstanceColor` and
/// `InstanceAlpha` parameters override it. Any other per-instance parameter,
/// or one whose type does not fit its semantic, is a configuration error.
pub fn gather_instance(job: &Job<'_>) -> Result<InstanceData, BatchError> {
    let mut instance = InstanceData::new(&job.node.world());

    for binding in job.instance_binding.parameters_with_hint(ParameterHint::PerInstance) {
        let parameter = binding.parameter();
        let semantic = match parameter.semantic.as_deref() {
            Some(
                semantic @ (semantics::WORLD | semantics::INSTANCE_COLOR | semantics::INSTANCE_ALPHA),
            ) => semantic,
            other => {
                return Err(BatchError::UnknownInstanceSemantic {
                    mesh: job.node.name().to_string(),
                    parameter: parameter.name.clone(),
                    semantic: other.map(str::to_string),
                });
            }
        };

        match (semantic, parameter.value_type, binding.value()) {
            (semantics::WORLD, ParameterType::Matrix, ParameterValue::Matrix(world)) => {
                instance.world = world.to_cols_array_2d();
            }
            (semantics::INSTANCE_COLOR, ParameterType::Vec3, ParameterValue::Vec3(color)) => {
                instance = instance.with_color(color);
            }
            (semantics::INSTANCE_COLOR, ParameterType::Vec4, ParameterValue::Vec4(color)) => {
                instance.color = color.to_array();
            }
            (semantics::INSTANCE_ALPHA, ParameterType::Float, ParameterValue::Float(alpha)) => {
                instance = instance.with_alpha(alpha);
            }
            (semantic, declared, value) => {
                let found = if accepts(semantic, declared) {
                    value.value_type()
                } else {
                    declared
                };
                return Err(BatchError::IncompatibleInstanceParameter {
                    mesh: job.node.name().to_string(),
                    parameter: parameter.name.clone(),
                    semantic: semantic.to_string(),
                    found,
                });
            }
        }
    }
    Ok(instance)
}

fn accepts(semantic: &str, value_type: ParameterType) -> bool {
    matches!(
        (semantic, value_type),
        (semantics::WORLD, ParameterType::Matrix)
            | (semantics::INSTANCE_COLOR, ParameterType::Vec3 | ParameterType::Vec4)
            | (semantics::INSTANCE_ALPHA, ParameterType::Float)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::math::Mat4;
    use strata_core::renderer::{DeviceCommand, HeadlessDevice};

    #[test]
    fn test_batch_fills_to_capacity() {
        let mut batch = InstanceBatch::new(2);
        batch.push(InstanceData::new(&Mat4::IDENTITY));
        assert!(!batch.is_full());
        batch.push(InstanceData::new(&Mat4::IDENTITY));
        assert!(batch.is_full());
        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_upload_reuses_the_device_buffer() {
        let mut device = HeadlessDevice::new();
        let mut batch = InstanceBatch::new(4);
        batch.push(InstanceData::new(&Mat4::IDENTITY));
        let first = batch.upload(&mut device).unwrap();
        let second = batch.upload(&mut device).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.stride, InstanceData::STRIDE);
        let created = device
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::CreateBuffer { .. }))
            .count();
        assert_eq!(created, 1, "Instance buffer must be created once");

        batch.set_capacity(8);
        batch.push(InstanceData::new(&Mat4::IDENTITY));
        assert_ne!(
            batch.upload(&mut device).unwrap().buffer,
            first.buffer,
            "Growing needs a new buffer"
        );
        assert_eq!(device.live_buffers(), 1, "The outgrown buffer must be destroyed");
        assert!(device
            .commands()
            .contains(&DeviceCommand::DestroyBuffer(first.buffer)));
    }

    #[test]
    fn test_release_destroys_the_buffer_once() {
        let mut device = HeadlessDevice::new();
        let mut batch = InstanceBatch::new(2);
        batch.release(&mut device).expect("Nothing to release is fine");
        batch.push(InstanceData::new(&Mat4::IDENTITY));
        batch.upload(&mut device).unwrap();

        batch.release(&mut device).unwrap();
        batch.release(&mut device).unwrap();
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn test_oversized_capacity_fails_upload() {
        let mut device = HeadlessDevice::new();
        let mut batch = InstanceBatch::new(1);
        batch.set_capacity(usize::MAX);
        batch.push(InstanceData::new(&Mat4::IDENTITY));
        assert_eq!(batch.upload(&mut device), Err(ResourceError::OutOfBounds));
        assert!(device.commands().is_empty(), "No buffer may be created");
    }
}
