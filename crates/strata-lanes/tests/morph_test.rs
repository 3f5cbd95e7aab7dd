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

mod common;

use approx::assert_relative_eq;
use common::*;
use std::rc::Rc;
use strata_core::renderer::*;
use strata_lanes::MeshRenderLane;

/// An indexed face mesh on buffer 200 with six morph targets `t0..t5` on buffers 300..305.
fn face_mesh(material: &Rc<Material>) -> Rc<Mesh> {
    let submesh = (0..6).fold(indexed_submesh(200), |submesh, i| {
        submesh.with_morph_target(format!("t{i}"), vertex_buffer(300 + i))
    });
    Rc::new(Mesh::new("Face", vec![submesh], vec![material.clone()]))
}

fn face(name: &str, mesh: &Rc<Mesh>, weights: &[f32]) -> MeshNode {
    let mut node = node(name, mesh, 1.0);
    let weights = weights
        .iter()
        .enumerate()
        .fold(MorphWeights::new(), |acc, (i, &weight)| acc.with(format!("t{i}"), weight));
    node.material_instance_mut(0)
        .expect("Face has one material")
        .set_morph_weights(Some(weights));
    node
}

fn render(nodes: &[SceneNode]) -> (MeshRenderLane, HeadlessDevice) {
    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    lane.render(nodes, &mut context(), RenderOrder::Default, &mut device)
        .expect("Render should succeed");
    (lane, device)
}

fn bound_streams(device: &HeadlessDevice) -> Vec<Vec<usize>> {
    device
        .commands()
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::SetVertexBuffers(bindings) => {
                Some(bindings.iter().map(|binding| binding.buffer.0).collect())
            }
            _ => None,
        })
        .collect()
}

fn morph_weights_set(device: &HeadlessDevice) -> Vec<Vec<f32>> {
    device
        .commands()
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::SetParameter {
                name,
                value: ParameterValue::FloatArray(weights),
                ..
            } if name == MORPH_WEIGHTS_PARAMETER => Some(weights.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_morph_binds_five_strongest_targets() {
    let material = material("Skin", &instancing_effect());
    let mesh = face_mesh(&material);
    let nodes = scene(vec![face("face", &mesh, &[0.1, -0.9, 0.05, 0.3, 0.0, 0.7])]);

    let (lane, device) = render(&nodes);

    assert_eq!(bound_streams(&device), vec![vec![200, 301, 305, 303, 300, 302]]);
    let weights = morph_weights_set(&device);
    assert_eq!(weights.len(), 1);
    for (actual, expected) in weights[0].iter().zip([-0.9, 0.7, 0.3, 0.1, 0.05]) {
        assert_relative_eq!(*actual, expected);
    }
    assert!(device
        .commands()
        .contains(&DeviceCommand::SetIndexBuffer(Some(BufferId(1200)))));
    assert_eq!(lane.stats().morph_draws, 1);
    assert_eq!(lane.stats().draw_calls, 1);
}

#[test]
fn test_morph_pads_unused_streams_with_lead_target() {
    let material = material("Skin", &instancing_effect());
    let mesh = face_mesh(&material);
    let nodes = scene(vec![face("face", &mesh, &[0.2, 0.6])]);

    let (_, device) = render(&nodes);

    assert_eq!(bound_streams(&device), vec![vec![200, 301, 300, 301, 301, 301]]);
    let weights = &morph_weights_set(&device)[0];
    assert_relative_eq!(weights[0], 0.6);
    assert_relative_eq!(weights[1], 0.2);
    assert!(weights[2..].iter().all(|weight| *weight == 0.0));
}

#[test]
fn test_morphing_nodes_are_never_instanced() {
    let material = material("Skin", &instancing_effect());
    let mesh = face_mesh(&material);
    let nodes = scene(
        (0..4)
            .map(|i| face(&format!("face{i}"), &mesh, &[0.5]))
            .collect(),
    );

    let (lane, device) = render(&nodes);

    assert!(instanced_counts(&device).is_empty());
    assert_eq!(lane.stats().morph_draws, 4);
    assert_eq!(lane.stats().draw_calls, 4);
}

#[test]
fn test_zero_weights_take_the_plain_path() {
    let material = material("Skin", &instancing_effect());
    let mesh = face_mesh(&material);
    let nodes = scene(vec![face("face", &mesh, &[0.0, 0.0, 0.0])]);

    let (lane, device) = render(&nodes);

    assert_eq!(bound_streams(&device), vec![vec![200]]);
    assert!(morph_weights_set(&device).is_empty());
    assert_eq!(lane.stats().morph_draws, 0);
    assert_eq!(lane.stats().draw_calls, 1);
}

#[test]
fn test_morphing_node_after_instanced_run() {
    let material = material("Skin", &instancing_effect());
    let mesh = face_mesh(&material);
    let mut nodes: Vec<MeshNode> = (0..4).map(|i| node(&format!("still{i}"), &mesh, 1.0)).collect();
    nodes.push(face("talking", &mesh, &[0.0, 0.8]));
    let nodes = scene(nodes);

    let (lane, device) = render(&nodes);

    assert_eq!(
        draw_trace(device.commands()),
        vec!["pass:p0", "instanced:200x4", "pass:p0", "draw:200"]
    );
    assert_eq!(lane.stats().morph_draws, 1);
    assert_eq!(lane.stats().instances, 4);
}
