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

use strata_core::renderer::{GraphicsDevice, RenderStateBlock};

/// The device's fixed-function state as it was before the lane started drawing.
///
/// Effect passes may change device state when applied. The lane restores the
/// snapshot before every grouped draw step and once more when the frame ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStateSnapshot {
    state: RenderStateBlock,
}

impl RenderStateSnapshot {
    pub fn capture(device: &dyn GraphicsDevice) -> Self {
        Self {
            state: device.render_state(),
        }
    }

    pub fn state(&self) -> &RenderStateBlock {
        &self.state
    }

    /// Puts the captured state back. Does nothing if the device still has it.
    pub fn restore(&self, device: &mut dyn GraphicsDevice) {
        if device.render_state() != self.state {
            device.set_render_state(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::{BlendState, DeviceCommand, HeadlessDevice, RasterizerState};

    #[test]
    fn test_restore_only_when_changed() {
        let mut device = HeadlessDevice::new();
        let snapshot = RenderStateSnapshot::capture(&device);
        snapshot.restore(&mut device);
        assert!(device.commands().is_empty(), "Unchanged state must not be rewritten");

        device.set_render_state(&RenderStateBlock {
            blend: BlendState::Additive,
            rasterizer: RasterizerState::Wireframe,
            ..Default::default()
        });
        snapshot.restore(&mut device);
        assert_eq!(device.render_state(), *snapshot.state());
        assert_eq!(
            device.commands().last(),
            Some(&DeviceCommand::SetRenderState(RenderStateBlock::default()))
        );
    }
}
