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

//! Draw jobs and the builder that produces them from visible scene nodes.

use super::error::BatchError;
use super::resource_ids::ResourceIdAllocator;
use super::sort_key::{self, UNMERGEABLE_SUBMESH_KEY};
use super::sorter::JobKeys;
use std::fmt;
use std::rc::Rc;
use strata_core::renderer::{
    Camera, EffectBinding, GraphicsDevice, InstancingSource, Material, MeshNode, ParameterHint,
    RenderContext, RenderOrder, SceneNode, Submesh,
};

/// One (node, submesh) pair to draw in the current render pass.
///
/// Jobs borrow everything from the scene handed to the lane and never outlive
/// the frame.
#[derive(Clone, Copy)]
pub struct Job<'a> {
    pub material_key: u32,
    pub submesh_key: u32,
    pub distance_key: u32,
    pub node: &'a Rc<MeshNode>,
    pub submesh: &'a Submesh,
    /// Position of `submesh` in its mesh, for error messages.
    pub submesh_index: usize,
    pub material: &'a Material,
    /// The shared material's binding for the pass.
    pub material_binding: &'a EffectBinding,
    /// The node's material-instance binding for the pass.
    pub instance_binding: &'a EffectBinding,
    /// Set when the node supplies its own instance buffer.
    pub instancing: Option<&'a dyn InstancingSource>,
}

impl Job<'_> {
    pub fn keys(&self) -> JobKeys {
        JobKeys {
            material: self.material_key,
            submesh: self.submesh_key,
            distance: self.distance_key,
        }
    }
}

impl fmt::Debug for Job<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("material_key", &format_args!("{:#010x}", self.material_key))
            .field("submesh_key", &format_args!("{:#010x}", self.submesh_key))
            .field("distance_key", &format_args!("{:#06x}", self.distance_key))
            .field("node", &self.node.name())
            .field("submesh", &self.submesh_index)
            .field("material", &self.material.name())
            .field("instanced", &self.instancing.is_some())
            .finish()
    }
}

#[derive(Clone, Copy)]
struct ResolvedBinding<'a> {
    material: &'a Material,
    material_binding: &'a EffectBinding,
    instance_binding: &'a EffectBinding,
    material_key: u32,
}

/// Appends the jobs of `nodes` for `pass` to `jobs`, unsorted.
///
/// Non-mesh nodes are skipped, as are nodes with no binding for the pass,
/// submeshes without geometry and submeshes whose material instance has no
/// binding for the pass. Instance bindings are updated from `context` with
/// `context.scene_node` pointing at their node; per-pass parameters wait until
/// the pass is applied.
#[allow(clippy::too_many_arguments)]
pub fn build_jobs<'a>(
    nodes: &'a [SceneNode],
    context: &mut RenderContext,
    pass: &str,
    camera: &Camera,
    order: RenderOrder,
    ids: &mut ResourceIdAllocator,
    device: &mut dyn GraphicsDevice,
    jobs: &mut Vec<Job<'a>>,
) -> Result<(), BatchError> {
    let mut resolved: Vec<Option<ResolvedBinding<'a>>> = Vec::new();

    for scene_node in nodes {
        let Some(node) = scene_node.as_mesh() else {
            continue;
        };
        node.touch(context.frame);
        context.scene_node = Some(node.clone());

        resolved.clear();
        for instance in node.material_instances() {
            resolved.push(resolve_binding(
                node,
                instance.material(),
                instance.material_binding(pass),
                instance.binding(pass),
                context,
                ids,
            )?);
        }
        if resolved.iter().all(Option::is_none) {
            continue;
        }

        let mut distance = camera.view_depth(node.position());
        if order == RenderOrder::BackToFront {
            distance = -distance;
        }
        let distance_key = sort_key::distance_key(distance);

        let instancing = node.as_instancing_source();
        if let Some(source) = instancing {
            source.update_instance_buffer(device).map_err(|err| {
                BatchError::device(format!("uploading instances of mesh '{}'", node.name()), err)
            })?;
        }

        for (submesh_index, submesh) in node.mesh().submeshes.iter().enumerate() {
            let Some(vertex_buffer) = submesh.vertex_buffer.filter(|_| submesh.is_drawable()) else {
                continue;
            };
            let Some(Some(binding)) = resolved.get(submesh.material_index).copied() else {
                continue;
            };
            let submesh_key = if instancing.is_some() {
                UNMERGEABLE_SUBMESH_KEY
            } else {
                sort_key::submesh_key(
                    vertex_buffer.stride,
                    ids.vertex_buffer_id(vertex_buffer.id)?,
                    ids.submesh_id(vertex_buffer.id, submesh.uuid())?,
                )
            };
            jobs.push(Job {
                material_key: binding.material_key,
                submesh_key,
                distance_key,
                node,
                submesh,
                submesh_index,
                material: binding.material,
                material_binding: binding.material_binding,
                instance_binding: binding.instance_binding,
                instancing,
            });
        }
    }

    context.scene_node = None;
    Ok(())
}

fn resolve_binding<'a>(
    node: &MeshNode,
    material: &'a Rc<Material>,
    material_binding: Option<&'a EffectBinding>,
    instance_binding: Option<&'a EffectBinding>,
    context: &RenderContext,
    ids: &mut ResourceIdAllocator,
) -> Result<Option<ResolvedBinding<'a>>, BatchError> {
    let (Some(material_binding), Some(instance_binding)) = (material_binding, instance_binding) else {
        return Ok(None);
    };

    for parameter in instance_binding.parameters() {
        if parameter.parameter().hint != ParameterHint::PerPass {
            parameter.update(context);
        }
    }

    let effect = material_binding.effect();
    let Some(technique) = material_binding.technique_binding().technique(effect, context) else {
        log::warn!(
            "MeshRenderLane: effect '{}' offers no technique for mesh '{}', skipping material '{}'",
            effect.name(),
            node.name(),
            material.name()
        );
        return Ok(None);
    };

    let effect_id = ids.effect_id(effect.uuid())?;
    let material_id = ids.material_id(effect.uuid(), material.uuid())?;
    Ok(Some(ResolvedBinding {
        material: material.as_ref(),
        material_binding,
        instance_binding,
        material_key: sort_key::material_key(effect_id, material_id, technique.index(), node.is_static()),
    }))
}
