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

//! Fixed-function device state and primitive topology.

/// How the output of a pass is blended into the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendState {
    /// Source replaces destination.
    #[default]
    Opaque,
    /// Premultiplied alpha blending.
    AlphaBlend,
    /// Source is added to destination.
    Additive,
    /// Straight (non-premultiplied) alpha blending.
    NonPremultiplied,
}

/// Depth and stencil testing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthStencilState {
    /// Depth test and depth write enabled.
    #[default]
    Default,
    /// Depth test enabled, depth write disabled.
    DepthRead,
    /// No depth testing.
    None,
}

/// Rasterizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RasterizerState {
    /// Cull counter-clockwise faces.
    #[default]
    CullCounterClockwise,
    /// Cull clockwise faces.
    CullClockwise,
    /// No culling.
    CullNone,
    /// Wireframe fill, counter-clockwise culling.
    Wireframe,
}

/// The full fixed-function state of a device.
///
/// Effect passes may change it while applying, so the batching lane captures
/// one of these before drawing and restores it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderStateBlock {
    /// Blend state.
    pub blend: BlendState,
    /// Depth-stencil state.
    pub depth_stencil: DepthStencilState,
    /// Rasterizer state.
    pub rasterizer: RasterizerState,
}

/// Defines how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Every vertex is a point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Consecutive vertices form a connected line strip.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Consecutive vertices form a triangle strip.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Number of primitives assembled from `element_count` vertices or indices.
    pub fn primitive_count(&self, element_count: u32) -> u32 {
        match self {
            PrimitiveTopology::PointList => element_count,
            PrimitiveTopology::LineList => element_count / 2,
            PrimitiveTopology::LineStrip => element_count.saturating_sub(1),
            PrimitiveTopology::TriangleList => element_count / 3,
            PrimitiveTopology::TriangleStrip => element_count.saturating_sub(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_counts() {
        assert_eq!(PrimitiveTopology::TriangleList.primitive_count(36), 12);
        assert_eq!(PrimitiveTopology::TriangleStrip.primitive_count(4), 2);
        assert_eq!(PrimitiveTopology::LineStrip.primitive_count(0), 0);
        assert_eq!(PrimitiveTopology::PointList.primitive_count(7), 7);
    }
}
