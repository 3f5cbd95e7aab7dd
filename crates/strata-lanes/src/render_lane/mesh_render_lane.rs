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

//! The mesh batching lane.
//!
//! `MeshRenderLane` turns the visible mesh nodes of one render pass into draw
//! calls: it builds one job per (node, submesh), sorts the jobs by the
//! requested order and hands them to the batch processor, which merges
//! neighbours sharing state into as few device calls as it can.
//!
//! The lane owns all of its per-frame scratch state (resource-ID side table,
//! instance buffer, statistics) so several lanes can drive the same device one
//! after the other without interfering.

use super::error::BatchError;
use super::instancing::InstanceBatch;
use super::job::{build_jobs, Job};
use super::processor::BatchProcessor;
use super::resource_ids::ResourceIdAllocator;
use super::sorter::{sort_jobs, JobOrder};
use super::state_snapshot::RenderStateSnapshot;
use super::stats::BatchStats;
use super::validation::validate_resource_ids;
use strata_core::renderer::{
    BatchSettings, Camera, GraphicsDevice, RenderContext, RenderOrder, SceneNode, SettingsError,
};

/// A lane that batches mesh nodes into state-sorted, instanced draw calls.
///
/// # Frame lifecycle
/// - Precondition checks (camera, render pass) run before anything is touched.
/// - The device render state is captured and restored before every grouped
///   draw step and once more at the end.
/// - Per-frame resource IDs are released as jobs are drawn and the side table
///   is cleared when `render` returns, on success or failure.
#[derive(Debug)]
pub struct MeshRenderLane {
    settings: BatchSettings,
    ids: ResourceIdAllocator,
    instances: InstanceBatch,
    stats: BatchStats,
    /// Largest job count seen so far, used to size the next frame's job list.
    job_capacity: usize,
}

impl Default for MeshRenderLane {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshRenderLane {
    /// Creates a lane with default settings.
    pub fn new() -> Self {
        let settings = BatchSettings::default();
        Self {
            instances: InstanceBatch::new(settings.instance_buffer_capacity),
            settings,
            ids: ResourceIdAllocator::new(),
            stats: BatchStats::default(),
            job_capacity: 0,
        }
    }

    /// Creates a lane with the given settings, rejecting out-of-range values.
    pub fn with_settings(settings: BatchSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let mut lane = Self::new();
        lane.instances.set_capacity(settings.instance_buffer_capacity);
        lane.settings = settings;
        Ok(lane)
    }

    pub fn strategy_name(&self) -> &'static str {
        "MeshBatching"
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Replaces the settings. Takes effect on the next `render` call.
    pub fn set_settings(&mut self, settings: BatchSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.instances.set_capacity(settings.instance_buffer_capacity);
        self.settings = settings;
        Ok(())
    }

    /// Statistics of the last `render` call.
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// The per-frame ID side table. Empty between frames.
    pub fn resource_ids(&self) -> &ResourceIdAllocator {
        &self.ids
    }

    /// Draws `nodes` for the context's active render pass.
    ///
    /// Fails before touching the device if the context has no camera or no
    /// render pass. Any later failure aborts the frame; device state and the
    /// context's per-draw fields are restored either way.
    pub fn render(
        &mut self,
        nodes: &[SceneNode],
        context: &mut RenderContext,
        order: RenderOrder,
        device: &mut dyn GraphicsDevice,
    ) -> Result<(), BatchError> {
        let Some(camera) = context.camera else {
            log::error!("MeshRenderLane: render context has no active camera");
            return Err(BatchError::MissingCamera);
        };
        let Some(pass) = context.render_pass.clone() else {
            log::error!("MeshRenderLane: render context has no active render pass");
            return Err(BatchError::MissingRenderPass);
        };
        if self.settings.validate_resource_ids {
            validate_resource_ids(&self.ids)?;
        }

        self.stats = BatchStats::default();
        let snapshot = RenderStateSnapshot::capture(device);

        let mut frame = FrameScope {
            lane: &mut *self,
            context: &mut *context,
            device: &mut *device,
            snapshot,
        };
        let result = frame.render_jobs(nodes, &pass, &camera, order);
        drop(frame);

        match &result {
            Ok(()) => log::debug!("MeshRenderLane: pass '{}': {}", pass, self.stats),
            Err(err) => log::error!("MeshRenderLane: pass '{}' aborted: {}", pass, err),
        }
        result
    }

    /// Destroys the device buffers the lane created. The next `render` recreates them.
    pub fn on_shutdown(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), BatchError> {
        self.instances
            .release(device)
            .map_err(|source| BatchError::device("releasing the instance buffer", source))
    }
}

/// Everything one `render` call has borrowed, put back when the scope ends.
///
/// Dropping the scope restores the captured render state, clears the
/// context's per-draw fields and empties the ID side table. This also runs
/// while unwinding from a panicking binding.
struct FrameScope<'f> {
    lane: &'f mut MeshRenderLane,
    context: &'f mut RenderContext,
    device: &'f mut dyn GraphicsDevice,
    snapshot: RenderStateSnapshot,
}

impl FrameScope<'_> {
    fn render_jobs(
        &mut self,
        nodes: &[SceneNode],
        pass: &str,
        camera: &Camera,
        order: RenderOrder,
    ) -> Result<(), BatchError> {
        let lane = &mut *self.lane;
        let mut jobs: Vec<Job<'_>> = Vec::with_capacity(lane.job_capacity);
        build_jobs(
            nodes,
            self.context,
            pass,
            camera,
            order,
            &mut lane.ids,
            self.device,
            &mut jobs,
        )?;

        let job_order = JobOrder::from(order);
        sort_jobs(&mut jobs, job_order);
        lane.job_capacity = lane.job_capacity.max(jobs.len());
        lane.stats.jobs = jobs.len();
        log::trace!(
            "MeshRenderLane: {} jobs from {} nodes for pass '{}' ({:?})",
            jobs.len(),
            nodes.len(),
            pass,
            job_order
        );

        BatchProcessor::new(
            &lane.settings,
            &mut lane.ids,
            &mut lane.instances,
            &mut lane.stats,
            self.snapshot,
            job_order,
        )
        .process(&jobs, self.context, self.device)
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        self.snapshot.restore(self.device);
        self.context.scene_node = None;
        self.context.technique = None;
        self.context.pass_index = None;
        let leftovers = self.lane.ids.clear();
        if leftovers > 0 {
            log::trace!("MeshRenderLane: dropped {} frame IDs at end of frame", leftovers);
        }
    }
}
