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

//! Per-frame rendering context shared between the caller and the lane.

use super::scene::{Camera, MeshNode};
use std::rc::Rc;

/// How jobs are ordered before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderOrder {
    /// Minimise state changes: material, then geometry, then distance.
    #[default]
    Default,
    /// Nearest first, then material and geometry.
    FrontToBack,
    /// Farthest first, then material and geometry.
    BackToFront,
    /// Keep the order the scene nodes were handed in.
    UserDefined,
}

/// State the lane reads from and annotates while it draws.
///
/// `scene_node`, `technique` and `pass_index` are set by the lane for the
/// draw in flight and reset to `None` before it returns.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// The viewpoint. Required.
    pub camera: Option<Camera>,
    /// Name of the render pass being drawn. Required.
    pub render_pass: Option<String>,
    /// Monotonic frame counter.
    pub frame: u64,
    /// Node currently being drawn.
    pub scene_node: Option<Rc<MeshNode>>,
    /// Technique currently applied.
    pub technique: Option<u8>,
    /// Pass currently applied.
    pub pass_index: Option<usize>,
}

impl RenderContext {
    /// A context for `render_pass` seen from `camera`.
    pub fn new(camera: Camera, render_pass: impl Into<String>) -> Self {
        Self {
            camera: Some(camera),
            render_pass: Some(render_pass.into()),
            ..Default::default()
        }
    }

    /// Advances the frame counter.
    pub fn next_frame(&mut self) {
        self.frame += 1;
    }
}
