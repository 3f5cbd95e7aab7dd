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

use std::fmt;

/// Counters for one [`MeshRenderLane::render`](super::MeshRenderLane::render) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Jobs produced by the builder.
    pub jobs: usize,
    /// Draw calls of any kind.
    pub draw_calls: usize,
    /// Draw calls that were instanced (static or dynamic).
    pub instanced_draw_calls: usize,
    /// Instances drawn by instanced draw calls.
    pub instances: usize,
    /// Draw calls that blended morph targets.
    pub morph_draws: usize,
    pub effect_switches: usize,
    pub material_switches: usize,
    pub pass_applications: usize,
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} jobs, {} draws ({} instanced, {} instances, {} morph), {} effect / {} material switches, {} passes",
            self.jobs,
            self.draw_calls,
            self.instanced_draw_calls,
            self.instances,
            self.morph_draws,
            self.effect_switches,
            self.material_switches,
            self.pass_applications
        )
    }
}
