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

//! Scene fixtures shared by the lane integration tests.

#![allow(dead_code)]

use std::rc::Rc;
use strata_core::math::{Mat4, Vec3};
use strata_core::renderer::*;
use strata_lanes::MeshRenderLane;

pub const PASS: &str = "Main";
pub const STRIDE: u32 = 32;

pub fn context() -> RenderContext {
    RenderContext::new(Camera::new(Vec3::ZERO, Vec3::Z), PASS)
}

pub fn lane_with(settings: BatchSettings) -> MeshRenderLane {
    MeshRenderLane::with_settings(settings).expect("Test settings should be valid")
}

pub fn vertex_buffer(id: usize) -> VertexBuffer {
    VertexBuffer {
        id: BufferId(id),
        stride: STRIDE,
        vertex_count: 24,
    }
}

pub fn index_buffer(id: usize) -> IndexBuffer {
    IndexBuffer {
        id: BufferId(id),
        format: IndexFormat::Uint16,
        index_count: 36,
    }
}

/// `Lit`: technique 0 `Forward`, instanced through technique 1 `ForwardInstanced`.
pub fn instancing_effect() -> Rc<Effect> {
    Rc::new(Effect::new(
        "Lit",
        vec![
            Technique::new("Forward", vec![EffectPass::new("p0")]).with_instancing(1),
            Technique::new("ForwardInstanced", vec![EffectPass::new("p0")]),
        ],
    ))
}

/// An effect with a single technique `Main` made of `passes`, without instancing.
pub fn plain_effect(name: &str, passes: &[&str]) -> Rc<Effect> {
    Rc::new(Effect::new(
        name,
        vec![Technique::new(
            "Main",
            passes.iter().map(|pass| EffectPass::new(*pass)).collect(),
        )],
    ))
}

pub fn material(name: &str, effect: &Rc<Effect>) -> Rc<Material> {
    Rc::new(Material::new(name).with_pass(
        PASS,
        EffectBinding::new(effect.clone(), Rc::new(ConstTechniqueBinding::new(0))),
    ))
}

pub fn indexed_submesh(buffer: usize) -> Submesh {
    Submesh::new(vertex_buffer(buffer), PrimitiveTopology::TriangleList, 0)
        .with_index_buffer(index_buffer(buffer + 1000))
}

/// One indexed submesh on vertex buffer `buffer`.
pub fn indexed_mesh(name: &str, buffer: usize, material: &Rc<Material>) -> Rc<Mesh> {
    Rc::new(Mesh::new(name, vec![indexed_submesh(buffer)], vec![material.clone()]))
}

/// One non-indexed submesh on vertex buffer `buffer`.
pub fn plain_mesh(name: &str, buffer: usize, material: &Rc<Material>) -> Rc<Mesh> {
    let submesh = Submesh::new(vertex_buffer(buffer), PrimitiveTopology::TriangleList, 0);
    Rc::new(Mesh::new(name, vec![submesh], vec![material.clone()]))
}

/// A node at `(0, 0, z)` whose instance binding feeds a per-instance `World` matrix.
pub fn node(name: &str, mesh: &Rc<Mesh>, z: f32) -> MeshNode {
    let mut node = MeshNode::new(name, mesh.clone())
        .with_world(Mat4::from_translation(Vec3::new(0.0, 0.0, z)));
    push_instance_parameter(&mut node, DelegateParameterBinding::node_world("World"));
    node
}

/// Adds a parameter to the instance binding of the node's first material.
pub fn push_instance_parameter(node: &mut MeshNode, binding: impl EffectParameterBinding + 'static) {
    node.material_instance_mut(0)
        .and_then(|instance| instance.binding_mut(PASS))
        .expect("Node should have a binding for the test pass")
        .push_parameter(Rc::new(binding));
}

pub fn scene(nodes: Vec<MeshNode>) -> Vec<SceneNode> {
    nodes.into_iter().map(SceneNode::from).collect()
}

/// Condenses a command stream into pass applications and draws.
///
/// Plain draws are tagged with the first bound vertex buffer, instanced draws
/// with the buffer and the instance count.
pub fn draw_trace(commands: &[DeviceCommand]) -> Vec<String> {
    let mut vertex_buffer = None;
    let mut trace = Vec::new();
    for command in commands {
        match command {
            DeviceCommand::SetVertexBuffers(bindings) => {
                vertex_buffer = bindings.first().map(|binding| binding.buffer.0);
            }
            DeviceCommand::ApplyPass { pass, .. } => trace.push(format!("pass:{pass}")),
            DeviceCommand::Draw { .. } | DeviceCommand::DrawIndexed { .. } => {
                trace.push(format!("draw:{}", vertex_buffer.unwrap_or_default()));
            }
            DeviceCommand::DrawInstanced { instance_count, .. } => {
                trace.push(format!(
                    "instanced:{}x{}",
                    vertex_buffer.unwrap_or_default(),
                    instance_count
                ));
            }
            _ => {}
        }
    }
    trace
}

/// Instance counts of every instanced draw, in order.
pub fn instanced_counts(device: &HeadlessDevice) -> Vec<u32> {
    device
        .commands()
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::DrawInstanced { instance_count, .. } => Some(*instance_count),
            _ => None,
        })
        .collect()
}
