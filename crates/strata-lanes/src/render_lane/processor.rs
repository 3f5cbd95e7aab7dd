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

//! Walks the sorted job list and submits it.
//!
//! Each step starts at job `i`, restores the device state, binds the job's
//! effect and material if they changed, resolves the technique and then
//! consumes one or more jobs with the first strategy that applies:
//!
//! 1. static instancing, when the node owns an instance buffer;
//! 2. dynamic instancing, for runs of identical geometry inside one material span;
//! 3. morphing, when the binding carries non-zero morph weights;
//! 4. plain draws over the run of jobs sharing the material key.

use super::error::BatchError;
use super::instancing::{gather_instance, InstanceBatch};
use super::job::Job;
use super::morph::{gather_weights, has_active_morph, select_morph_targets};
use super::resource_ids::ResourceIdAllocator;
use super::sorter::JobOrder;
use super::state_snapshot::RenderStateSnapshot;
use super::stats::BatchStats;
use strata_core::renderer::{
    BatchSettings, EffectBinding, GraphicsDevice, IndexBuffer, InstancingSource, ParameterHint,
    ParameterValue, RenderContext, Submesh, Technique, VertexBuffer, VertexBufferBinding,
    MAX_MORPH_TARGETS, MORPH_WEIGHTS_PARAMETER,
};
use strata_core::AssetUUID;

pub(crate) struct BatchProcessor<'l> {
    settings: &'l BatchSettings,
    ids: &'l mut ResourceIdAllocator,
    instances: &'l mut InstanceBatch,
    stats: &'l mut BatchStats,
    snapshot: RenderStateSnapshot,
    order: JobOrder,
    current_effect: Option<AssetUUID>,
    current_material: Option<AssetUUID>,
}

impl<'l> BatchProcessor<'l> {
    pub(crate) fn new(
        settings: &'l BatchSettings,
        ids: &'l mut ResourceIdAllocator,
        instances: &'l mut InstanceBatch,
        stats: &'l mut BatchStats,
        snapshot: RenderStateSnapshot,
        order: JobOrder,
    ) -> Self {
        Self {
            settings,
            ids,
            instances,
            stats,
            snapshot,
            order,
            current_effect: None,
            current_material: None,
        }
    }

    pub(crate) fn process(
        &mut self,
        jobs: &[Job<'_>],
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> Result<(), BatchError> {
        let mut i = 0;
        while i < jobs.len() {
            self.snapshot.restore(device);

            let job = &jobs[i];
            self.bind_effect_and_material(job, context, device);

            let effect = job.material_binding.effect();
            let Some(technique) = job.material_binding.technique_binding().technique(effect, context)
            else {
                log::warn!(
                    "MeshRenderLane: effect '{}' lost its technique for mesh '{}'",
                    effect.name(),
                    job.node.name()
                );
                self.release_geometry_ids(job);
                i += 1;
                continue;
            };
            context.technique = Some(technique.index());

            i += if let Some(source) = job.instancing {
                self.draw_static_instanced(job, source, technique, context, device)?;
                1
            } else if let Some(instanced) = self.dynamic_instancing_technique(job, technique) {
                self.draw_instancing_span(&jobs[i..], technique, instanced, context, device)?
            } else if has_active_morph(job.instance_binding, job.submesh) {
                self.draw_morph_run(&jobs[i..], technique, context, device)
            } else {
                self.draw_plain_run(&jobs[i..], technique, context, device)
            };
        }
        Ok(())
    }

    fn bind_effect_and_material(
        &mut self,
        job: &Job<'_>,
        context: &RenderContext,
        device: &mut dyn GraphicsDevice,
    ) {
        let effect = job.material_binding.effect();
        if self.current_effect != Some(effect.uuid()) {
            self.current_effect = Some(effect.uuid());
            self.current_material = None;
            self.ids.release_effect(effect.uuid());
            self.stats.effect_switches += 1;
            update_and_apply(job.material_binding, ParameterHint::Global, context, device);
        }
        if self.current_material != Some(job.material.uuid()) {
            self.current_material = Some(job.material.uuid());
            self.ids.release_material(effect.uuid(), job.material.uuid());
            self.stats.material_switches += 1;
            update_and_apply(job.material_binding, ParameterHint::Material, context, device);
        }
    }

    fn dynamic_instancing_technique<'a>(
        &self,
        job: &Job<'a>,
        technique: &Technique,
    ) -> Option<&'a Technique> {
        if !self.settings.enable_instancing
            || job.submesh.index_buffer.is_none()
            || has_active_morph(job.instance_binding, job.submesh)
        {
            return None;
        }
        job.material_binding.effect().instancing_technique(technique)
    }

    // --- Static instancing ---

    fn draw_static_instanced(
        &mut self,
        job: &Job<'_>,
        source: &dyn InstancingSource,
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> Result<(), BatchError> {
        let Some(index_buffer) = job.submesh.index_buffer else {
            return Err(BatchError::MissingIndexBuffer {
                mesh: job.node.name().to_string(),
                submesh: job.submesh_index,
            });
        };
        let instance_count = source.instance_count();
        let Some(stream) = source.instance_buffer().filter(|_| instance_count > 0) else {
            log::trace!("MeshRenderLane: mesh '{}' has no uploaded instances", job.node.name());
            return Ok(());
        };
        let Some(vertex_buffer) = job.submesh.vertex_buffer else {
            return Ok(());
        };

        let technique = job
            .material_binding
            .effect()
            .instancing_technique(technique)
            .unwrap_or(technique);
        context.technique = Some(technique.index());
        self.bind_node(job, context, device);
        device.set_vertex_buffers(&[VertexBufferBinding::per_vertex(&vertex_buffer), stream]);
        device.set_index_buffer(Some(&index_buffer));

        for pass_index in job.material_binding.technique_binding().passes(technique, context) {
            if !self.apply_pass(job, technique, pass_index, context, device) {
                continue;
            }
            apply_per_pass(job, context, device);
            self.draw_instanced(job.submesh, instance_count, device);
        }
        Ok(())
    }

    // --- Dynamic instancing ---

    /// Consumes the span of jobs sharing the head's material key, merging runs
    /// of identical geometry that reach the threshold. Shorter runs are drawn
    /// one by one, in place, so the span keeps its order.
    fn draw_instancing_span(
        &mut self,
        jobs: &[Job<'_>],
        technique: &Technique,
        instanced: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> Result<usize, BatchError> {
        let key = jobs[0].material_key;
        let span_len = jobs
            .iter()
            .take_while(|job| job.material_key == key && job.instancing.is_none())
            .count();
        let span = &jobs[..span_len];

        let mut deferred: Vec<&Job<'_>> = Vec::new();
        let mut start = 0;
        while start < span.len() {
            let head = &span[start];
            let run_len = if has_active_morph(head.instance_binding, head.submesh) {
                1
            } else {
                span[start..]
                    .iter()
                    .take_while(|job| {
                        job.submesh_key == head.submesh_key
                            && !has_active_morph(job.instance_binding, job.submesh)
                    })
                    .count()
            };
            let run = &span[start..start + run_len];

            if run_len >= self.settings.instancing_threshold && head.submesh.index_buffer.is_some() {
                self.draw_singles(&deferred, technique, context, device);
                deferred.clear();
                self.draw_instanced_run(run, instanced, context, device)?;
            } else {
                deferred.extend(run.iter());
            }
            start += run_len;
        }
        self.draw_singles(&deferred, technique, context, device);
        Ok(span_len)
    }

    fn draw_instanced_run(
        &mut self,
        run: &[Job<'_>],
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> Result<(), BatchError> {
        let head = &run[0];
        let (Some(vertex_buffer), Some(index_buffer)) =
            (head.submesh.vertex_buffer, head.submesh.index_buffer)
        else {
            return Ok(());
        };

        self.instances.clear();
        for job in run {
            context.scene_node = Some(job.node.clone());
            for parameter in job.instance_binding.parameters_with_hint(ParameterHint::PerInstance) {
                parameter.update(context);
            }
            self.instances.push(gather_instance(job)?);
            if self.instances.is_full() {
                self.flush_instances(head, &vertex_buffer, &index_buffer, technique, context, device)?;
            }
        }
        if !self.instances.is_empty() {
            self.flush_instances(head, &vertex_buffer, &index_buffer, technique, context, device)?;
        }

        for job in run {
            self.release_geometry_ids(job);
        }
        Ok(())
    }

    fn flush_instances(
        &mut self,
        head: &Job<'_>,
        vertex_buffer: &VertexBuffer,
        index_buffer: &IndexBuffer,
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> Result<(), BatchError> {
        let count = self.instances.len() as u32;
        let stream = self.instances.upload(device).map_err(|err| {
            BatchError::device(
                format!("uploading {count} instances of mesh '{}'", head.node.name()),
                err,
            )
        })?;
        self.instances.clear();

        device.set_vertex_buffers(&[VertexBufferBinding::per_vertex(vertex_buffer), stream]);
        device.set_index_buffer(Some(index_buffer));
        context.scene_node = Some(head.node.clone());
        context.technique = Some(technique.index());
        update_and_apply(head.instance_binding, ParameterHint::Local, context, device);

        for pass_index in head.material_binding.technique_binding().passes(technique, context) {
            if !self.apply_pass(head, technique, pass_index, context, device) {
                continue;
            }
            apply_per_pass(head, context, device);
            self.draw_instanced(head.submesh, count, device);
        }
        log::trace!(
            "MeshRenderLane: flushed {} instances of mesh '{}'",
            count,
            head.node.name()
        );
        Ok(())
    }

    // --- Morphing ---

    fn draw_morph_run(
        &mut self,
        jobs: &[Job<'_>],
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> usize {
        let key = jobs[0].material_key;
        let run_len = jobs
            .iter()
            .take_while(|job| {
                job.material_key == key
                    && job.instancing.is_none()
                    && has_active_morph(job.instance_binding, job.submesh)
            })
            .count();
        for job in &jobs[..run_len] {
            self.draw_morph(job, technique, context, device);
        }
        run_len
    }

    fn draw_morph(
        &mut self,
        job: &Job<'_>,
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) {
        let selection = select_morph_targets(&gather_weights(job.instance_binding, job.submesh));
        let (Some(vertex_buffer), Some(targets)) =
            (job.submesh.vertex_buffer, selection.stream_targets())
        else {
            self.draw_plain_job(job, technique, context, device);
            return;
        };

        let mut streams = Vec::with_capacity(1 + MAX_MORPH_TARGETS);
        streams.push(VertexBufferBinding::per_vertex(&vertex_buffer));
        streams.extend(
            targets
                .iter()
                .map(|&index| VertexBufferBinding::per_vertex(&job.submesh.morph_targets[index].vertex_buffer)),
        );

        self.bind_node(job, context, device);
        device.set_parameter(
            job.instance_binding.effect(),
            MORPH_WEIGHTS_PARAMETER,
            &ParameterValue::FloatArray(selection.stream_weights().to_vec()),
        );
        device.set_vertex_buffers(&streams);
        device.set_index_buffer(job.submesh.index_buffer.as_ref());

        for pass_index in job.material_binding.technique_binding().passes(technique, context) {
            if !self.apply_pass(job, technique, pass_index, context, device) {
                continue;
            }
            apply_per_pass(job, context, device);
            self.draw(job.submesh, device);
            self.stats.morph_draws += 1;
        }
        self.release_geometry_ids(job);
    }

    // --- Plain draws ---

    /// Consumes the run of plain jobs sharing the head's material key.
    ///
    /// State-first order applies each pass once for the whole run. Other
    /// orders draw job by job so that draw order is kept across passes.
    fn draw_plain_run(
        &mut self,
        jobs: &[Job<'_>],
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> usize {
        let key = jobs[0].material_key;
        let run_len = jobs
            .iter()
            .take_while(|job| {
                job.material_key == key
                    && job.instancing.is_none()
                    && !has_active_morph(job.instance_binding, job.submesh)
            })
            .count();
        let run = &jobs[..run_len];

        if self.order != JobOrder::StateFirst {
            for job in run {
                self.draw_plain_job(job, technique, context, device);
            }
            return run_len;
        }

        let head = &run[0];
        for pass_index in head.material_binding.technique_binding().passes(technique, context) {
            if !self.apply_pass(head, technique, pass_index, context, device) {
                continue;
            }
            for job in run {
                self.bind_node(job, context, device);
                apply_per_pass(job, context, device);
                bind_geometry(job.submesh, device);
                self.draw(job.submesh, device);
            }
        }
        for job in run {
            self.release_geometry_ids(job);
        }
        run_len
    }

    fn draw_singles(
        &mut self,
        jobs: &[&Job<'_>],
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) {
        for job in jobs {
            if has_active_morph(job.instance_binding, job.submesh) {
                self.draw_morph(job, technique, context, device);
            } else {
                self.draw_plain_job(job, technique, context, device);
            }
        }
    }

    fn draw_plain_job(
        &mut self,
        job: &Job<'_>,
        technique: &Technique,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) {
        self.bind_node(job, context, device);
        bind_geometry(job.submesh, device);
        for pass_index in job.material_binding.technique_binding().passes(technique, context) {
            if !self.apply_pass(job, technique, pass_index, context, device) {
                continue;
            }
            apply_per_pass(job, context, device);
            self.draw(job.submesh, device);
        }
        self.release_geometry_ids(job);
    }

    // --- Shared helpers ---

    fn bind_node(&mut self, job: &Job<'_>, context: &mut RenderContext, device: &mut dyn GraphicsDevice) {
        context.scene_node = Some(job.node.clone());
        update_and_apply(job.instance_binding, ParameterHint::Local, context, device);
        update_and_apply(job.instance_binding, ParameterHint::PerInstance, context, device);
    }

    fn apply_pass(
        &mut self,
        job: &Job<'_>,
        technique: &Technique,
        pass_index: usize,
        context: &mut RenderContext,
        device: &mut dyn GraphicsDevice,
    ) -> bool {
        let Some(pass) = technique.passes().get(pass_index) else {
            return false;
        };
        context.pass_index = Some(pass_index);
        device.apply_pass(job.material_binding.effect(), technique, pass);
        self.stats.pass_applications += 1;
        true
    }

    fn draw(&mut self, submesh: &Submesh, device: &mut dyn GraphicsDevice) {
        match submesh.index_buffer {
            Some(_) => device.draw_indexed_primitives(
                submesh.topology,
                submesh.start_vertex,
                submesh.start_index,
                submesh.primitive_count,
            ),
            None => device.draw_primitives(submesh.topology, submesh.start_vertex, submesh.primitive_count),
        }
        self.stats.draw_calls += 1;
    }

    fn draw_instanced(&mut self, submesh: &Submesh, instance_count: u32, device: &mut dyn GraphicsDevice) {
        device.draw_instanced_primitives(
            submesh.topology,
            submesh.start_vertex,
            submesh.start_index,
            submesh.primitive_count,
            instance_count,
        );
        self.stats.draw_calls += 1;
        self.stats.instanced_draw_calls += 1;
        self.stats.instances += instance_count as usize;
    }

    fn release_geometry_ids(&mut self, job: &Job<'_>) {
        if let Some(vertex_buffer) = job.submesh.vertex_buffer {
            self.ids.release_submesh(vertex_buffer.id, job.submesh.uuid());
            self.ids.release_vertex_buffer(vertex_buffer.id);
        }
    }
}

fn update_and_apply(
    binding: &EffectBinding,
    hint: ParameterHint,
    context: &RenderContext,
    device: &mut dyn GraphicsDevice,
) {
    let effect = binding.effect();
    for parameter in binding.parameters_with_hint(hint) {
        parameter.update(context);
        parameter.apply(effect, device);
    }
}

fn apply_per_pass(job: &Job<'_>, context: &RenderContext, device: &mut dyn GraphicsDevice) {
    update_and_apply(job.material_binding, ParameterHint::PerPass, context, device);
    update_and_apply(job.instance_binding, ParameterHint::PerPass, context, device);
}

fn bind_geometry(submesh: &Submesh, device: &mut dyn GraphicsDevice) {
    if let Some(vertex_buffer) = &submesh.vertex_buffer {
        device.set_vertex_buffers(&[VertexBufferBinding::per_vertex(vertex_buffer)]);
    }
    device.set_index_buffer(submesh.index_buffer.as_ref());
}
