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

use super::resource_ids::IdSpace;
use strata_core::renderer::{ParameterType, ResourceError};
use thiserror::Error;

/// Why a [`MeshRenderLane::render`](super::MeshRenderLane::render) call failed.
///
/// Every variant is fatal for the frame. The lane has already restored the
/// device state and cleared the context's per-draw fields when one is returned.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Render context has no active camera")]
    MissingCamera,
    #[error("Render context has no active render pass")]
    MissingRenderPass,
    #[error("Mesh '{mesh}' submesh {submesh} is statically instanced but has no index buffer")]
    MissingIndexBuffer { mesh: String, submesh: usize },
    #[error(
        "Mesh '{mesh}': per-instance parameter '{parameter}' with semantic '{semantic}' cannot hold a {found} value"
    )]
    IncompatibleInstanceParameter {
        mesh: String,
        parameter: String,
        semantic: String,
        found: ParameterType,
    },
    #[error("Mesh '{mesh}': per-instance parameter '{parameter}' has unsupported semantic {semantic:?}")]
    UnknownInstanceSemantic {
        mesh: String,
        parameter: String,
        semantic: Option<String>,
    },
    #[error("Ran out of {resource} IDs in one frame (limit {limit})")]
    IdSpaceExhausted { resource: IdSpace, limit: u32 },
    #[error("{count} per-frame resource IDs were not reset after the previous frame")]
    StaleResourceIds { count: usize },
    #[error("Graphics device failed while {context}")]
    Device {
        context: String,
        #[source]
        source: ResourceError,
    },
}

impl BatchError {
    pub(crate) fn device(context: impl Into<String>, source: ResourceError) -> Self {
        BatchError::Device {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_offender() {
        let err = BatchError::IncompatibleInstanceParameter {
            mesh: "Crate".to_string(),
            parameter: "Tint".to_string(),
            semantic: "InstanceColor".to_string(),
            found: ParameterType::Float,
        };
        let message = err.to_string();
        assert!(message.contains("Crate"), "Mesh name missing: {message}");
        assert!(message.contains("Tint"), "Parameter name missing: {message}");
        assert!(message.contains("Float"));
    }

    #[test]
    fn test_device_error_keeps_source() {
        let err = BatchError::device("uploading instances", ResourceError::OutOfBounds);
        assert_eq!(
            err.to_string(),
            "Graphics device failed while uploading instances"
        );
        assert!(err.source().is_some());
    }
}
