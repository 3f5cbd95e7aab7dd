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

use common::*;
use std::rc::Rc;
use strata_core::math::{Mat4, Vec3};
use strata_core::renderer::*;
use strata_lanes::{BatchError, MeshRenderLane};

/// A scene exercising every submission path: an instanced run, plain draws
/// with a second effect, a morphing node and a statically instanced node.
fn mixed_scene() -> Vec<SceneNode> {
    let stone = material("Stone", &instancing_effect());
    let flat = material("Flat", &plain_effect("Unlit", &["p0", "p1"]));

    let rock = indexed_mesh("Rock", 100, &stone);
    let crate_mesh = plain_mesh("Crate", 110, &flat);
    let face = Rc::new(Mesh::new(
        "Face",
        vec![indexed_submesh(120)
            .with_morph_target("smile", vertex_buffer(121))
            .with_morph_target("blink", vertex_buffer(122))],
        vec![stone.clone()],
    ));
    let tree = indexed_mesh("Tree", 130, &stone);

    let mut nodes: Vec<MeshNode> = (0..5).map(|i| node(&format!("rock{i}"), &rock, i as f32)).collect();
    nodes.push(node("crate0", &crate_mesh, 3.0));
    nodes.push(node("crate1", &crate_mesh, 6.0));

    let mut talking = node("face", &face, 2.0);
    talking
        .material_instance_mut(0)
        .unwrap()
        .set_morph_weights(Some(MorphWeights::new().with("smile", 0.75).with("blink", -0.25)));
    nodes.push(talking);

    let forest = StaticInstanceSet::new(
        "forest",
        (0..3)
            .map(|i| InstanceData::new(&Mat4::from_translation(Vec3::new(i as f32, 0.0, 8.0))))
            .collect(),
    );
    nodes.push(MeshNode::new("forest", tree).with_instancing(Rc::new(forest)));

    let mut nodes = scene(nodes);
    nodes.insert(3, SceneNode::Group("props".into()));
    nodes.push(SceneNode::Light("sun".into()));
    nodes
}

fn draws(commands: &[DeviceCommand]) -> Vec<DeviceCommand> {
    commands.iter().filter(|c| c.is_draw()).cloned().collect()
}

#[test]
fn test_consecutive_frames_are_identical() {
    let nodes = mixed_scene();
    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    let mut context = context();

    let mut frames = Vec::new();
    for _ in 0..3 {
        context.next_frame();
        lane.render(&nodes, &mut context, RenderOrder::Default, &mut device)
            .expect("Render should succeed");
        frames.push(device.take_commands());
    }

    assert_eq!(frames[1], frames[2], "Steady-state frames must match command for command");
    assert_eq!(
        draws(&frames[0]),
        draws(&frames[1]),
        "Buffer creation aside, the first frame draws the same"
    );
    assert!(!draws(&frames[0]).is_empty());
}

#[test]
fn test_every_path_in_one_frame() {
    let nodes = mixed_scene();
    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    lane.render(&nodes, &mut context(), RenderOrder::Default, &mut device)
        .unwrap();

    let stats = *lane.stats();
    assert_eq!(stats.jobs, 9);
    assert_eq!(stats.morph_draws, 1);
    assert_eq!(stats.instanced_draw_calls, 2, "One dynamic run and one static set");
    assert_eq!(stats.instances, 5 + 3);
    assert_eq!(stats.effect_switches, 2);
    // Crates: 2 passes x 2 jobs. Stone: rocks, face, forest.
    assert_eq!(stats.draw_calls, 4 + 3);
    assert_eq!(instanced_counts(&device).iter().sum::<u32>(), 8);
}

#[test]
fn test_resource_ids_clear_after_render() {
    let nodes = mixed_scene();
    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();

    lane.render(&nodes, &mut context(), RenderOrder::FrontToBack, &mut device)
        .unwrap();

    assert!(lane.resource_ids().is_clear());
    assert_eq!(lane.resource_ids().live_count(), 0);
}

#[test]
fn test_validation_passes_across_frames() {
    let settings = BatchSettings {
        validate_resource_ids: true,
        ..Default::default()
    };
    let nodes = mixed_scene();
    let mut lane = lane_with(settings);
    let mut device = HeadlessDevice::new();
    let mut context = context();

    for order in [RenderOrder::Default, RenderOrder::BackToFront, RenderOrder::UserDefined] {
        lane.render(&nodes, &mut context, order, &mut device)
            .expect("Validation should find no stale ID");
    }
}

#[test]
fn test_context_draw_fields_are_reset() {
    let nodes = mixed_scene();
    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    let mut context = context();

    lane.render(&nodes, &mut context, RenderOrder::Default, &mut device)
        .unwrap();

    assert!(context.scene_node.is_none());
    assert!(context.technique.is_none());
    assert!(context.pass_index.is_none());
    assert_eq!(context.render_pass.as_deref(), Some(PASS));
    assert!(context.camera.is_some());
}

#[test]
fn test_render_state_restored_between_steps_and_at_end() {
    let additive = RenderStateBlock {
        blend: BlendState::Additive,
        depth_stencil: DepthStencilState::DepthRead,
        ..Default::default()
    };
    let effect = Rc::new(Effect::new(
        "Particles",
        vec![Technique::new(
            "Main",
            vec![EffectPass::new("p0").with_render_state(additive)],
        )],
    ));
    let sparks = material("Sparks", &effect);
    let smoke = material("Smoke", &effect);
    let nodes = scene(vec![
        node("sparks", &plain_mesh("A", 101, &sparks), 1.0),
        node("smoke", &plain_mesh("B", 102, &smoke), 2.0),
    ]);

    let mut device = HeadlessDevice::new();
    let wireframe = RenderStateBlock {
        rasterizer: RasterizerState::Wireframe,
        ..Default::default()
    };
    device.set_render_state(&wireframe);
    device.take_commands();

    let mut lane = MeshRenderLane::new();
    lane.render(&nodes, &mut context(), RenderOrder::Default, &mut device)
        .unwrap();

    assert_eq!(device.render_state(), wireframe, "The caller's state must survive");
    let restores = device
        .commands()
        .iter()
        .filter(|command| **command == DeviceCommand::SetRenderState(wireframe))
        .count();
    assert_eq!(restores, 2, "Once before the second material, once at the end");
}

#[test]
fn test_render_state_restored_on_error() {
    let additive = RenderStateBlock {
        blend: BlendState::Additive,
        ..Default::default()
    };
    let effect = Rc::new(Effect::new(
        "Particles",
        vec![
            Technique::new("Main", vec![EffectPass::new("p0").with_render_state(additive)])
                .with_instancing(1),
            Technique::new("Instanced", vec![EffectPass::new("p0").with_render_state(additive)]),
        ],
    ));
    let sparks = material("Sparks", &effect);
    let ember = indexed_mesh("Ember", 200, &sparks);
    let spark = indexed_mesh("Spark", 100, &sparks);

    // The lone ember is drawn (and changes state) before the spark run fails.
    let mut nodes = vec![node("ember", &ember, 1.0)];
    for i in 0..4 {
        let mut spark_node = node(&format!("spark{i}"), &spark, 1.0);
        push_instance_parameter(
            &mut spark_node,
            ConstParameterBinding::new(
                EffectParameter::new("Heat", ParameterType::Float, ParameterHint::PerInstance)
                    .with_semantic("Heat"),
                ParameterValue::Float(1.0),
            ),
        );
        nodes.push(spark_node);
    }
    let nodes = scene(nodes);

    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    let mut context = context();
    let result = lane.render(&nodes, &mut context, RenderOrder::Default, &mut device);

    assert!(matches!(result, Err(BatchError::UnknownInstanceSemantic { .. })));
    assert_eq!(device.draw_calls().len(), 1, "Only the ember was drawn");
    assert_eq!(device.render_state(), RenderStateBlock::default());
    assert_eq!(
        device.commands().last(),
        Some(&DeviceCommand::SetRenderState(RenderStateBlock::default()))
    );
    assert!(context.scene_node.is_none());
    assert!(context.technique.is_none());
    assert!(lane.resource_ids().is_clear());
}

#[test]
fn test_render_state_restored_when_a_binding_panics() {
    let blended = RenderStateBlock {
        blend: BlendState::AlphaBlend,
        ..Default::default()
    };
    let effect = Rc::new(Effect::new(
        "Glass",
        vec![Technique::new(
            "Main",
            vec![EffectPass::new("p0").with_render_state(blended)],
        )],
    ));
    let glass = material("Glass", &effect);
    let mut pane = node("pane", &plain_mesh("Pane", 101, &glass), 1.0);
    push_instance_parameter(
        &mut pane,
        DelegateParameterBinding::new(
            EffectParameter::new("Refraction", ParameterType::Float, ParameterHint::PerPass),
            ParameterValue::Float(0.0),
            |context| {
                if context.pass_index.is_some() {
                    panic!("refraction binding failed");
                }
                None
            },
        ),
    );
    let nodes = scene(vec![pane]);

    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    let mut context = context();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        lane.render(&nodes, &mut context, RenderOrder::Default, &mut device)
    }));

    assert!(outcome.is_err(), "The binding panic must propagate");
    assert!(device
        .commands()
        .iter()
        .any(|command| matches!(command, DeviceCommand::ApplyPass { .. })));
    assert_eq!(device.render_state(), RenderStateBlock::default());
    assert!(context.scene_node.is_none());
    assert!(context.technique.is_none());
    assert!(context.pass_index.is_none());
    assert!(lane.resource_ids().is_clear());
}

#[test]
fn test_nodes_are_touched_with_frame() {
    let material = material("Flat", &plain_effect("Unlit", &["p0"]));
    let visible = Rc::new(node("visible", &plain_mesh("A", 101, &material), 1.0));
    let shadow_only = Rc::new(Material::new("ShadowOnly").with_pass(
        "Shadow",
        EffectBinding::new(plain_effect("Depth", &["p0"]), Rc::new(ConstTechniqueBinding::new(0))),
    ));
    let other_pass = Rc::new(MeshNode::new("caster", plain_mesh("B", 102, &shadow_only)));
    let nodes = vec![SceneNode::from(visible.clone()), SceneNode::from(other_pass.clone())];

    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    let mut context = context();
    context.frame = 7;
    lane.render(&nodes, &mut context, RenderOrder::Default, &mut device)
        .unwrap();

    assert_eq!(visible.last_frame(), Some(7));
    assert_eq!(other_pass.last_frame(), Some(7));
    assert_eq!(lane.stats().jobs, 1, "Nodes without a binding for the pass add no job");
}

#[test]
fn test_missing_technique_skips_material() {
    let effect = plain_effect("Unlit", &["p0"]);
    let broken = Rc::new(Material::new("Broken").with_pass(
        PASS,
        EffectBinding::new(effect, Rc::new(ConstTechniqueBinding::new(3))),
    ));
    let nodes = scene(vec![node("ghost", &plain_mesh("A", 101, &broken), 1.0)]);

    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    lane.render(&nodes, &mut context(), RenderOrder::Default, &mut device)
        .unwrap();

    assert!(device.draw_calls().is_empty());
    assert_eq!(lane.stats().jobs, 0);
    assert!(lane.resource_ids().is_clear());
}

#[test]
fn test_missing_camera_leaves_device_untouched() {
    let mut lane = MeshRenderLane::new();
    let mut device = HeadlessDevice::new();
    let mut context = RenderContext {
        render_pass: Some(PASS.into()),
        ..Default::default()
    };

    let result = lane.render(&mixed_scene(), &mut context, RenderOrder::Default, &mut device);

    assert!(matches!(result, Err(BatchError::MissingCamera)));
    assert!(device.commands().is_empty());
}
