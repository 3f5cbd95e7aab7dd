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

// Strata Sandbox
// Renders a small scene through the mesh batching lane on a headless device.
//
// Usage: sandbox [settings.ron]

use std::rc::Rc;

use anyhow::{Context, Result};
use strata_core::math::{Mat4, Vec3, Vec4};
use strata_core::renderer::*;
use strata_lanes::MeshRenderLane;

const PASS: &str = "Main";

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

const fn vertex(x: f32, y: f32, u: f32, v: f32) -> Vertex {
    Vertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [u, v],
    }
}

const QUAD: &[Vertex] = &[
    vertex(-0.5, -0.5, 0.0, 1.0),
    vertex(0.5, -0.5, 1.0, 1.0),
    vertex(0.5, 0.5, 1.0, 0.0),
    vertex(-0.5, 0.5, 0.0, 0.0),
];

const QUAD_INDICES: &[u16] = &[0, 1, 2, 0, 2, 3];

fn upload_vertices(
    device: &mut dyn GraphicsDevice,
    label: &str,
    vertices: &[Vertex],
) -> Result<VertexBuffer> {
    let bytes: &[u8] = bytemuck::cast_slice(vertices);
    let id = device
        .create_buffer(&BufferDescriptor {
            label: Some(label.to_string().into()),
            size: bytes.len() as u64,
            usage: BufferUsage::Vertex,
        })
        .with_context(|| format!("creating vertex buffer '{label}'"))?;
    device
        .write_buffer(id, 0, bytes)
        .with_context(|| format!("filling vertex buffer '{label}'"))?;
    Ok(VertexBuffer {
        id,
        stride: std::mem::size_of::<Vertex>() as u32,
        vertex_count: vertices.len() as u32,
    })
}

fn upload_indices(
    device: &mut dyn GraphicsDevice,
    label: &str,
    indices: &[u16],
) -> Result<IndexBuffer> {
    let bytes: &[u8] = bytemuck::cast_slice(indices);
    let id = device
        .create_buffer(&BufferDescriptor {
            label: Some(label.to_string().into()),
            size: bytes.len() as u64,
            usage: BufferUsage::Index,
        })
        .with_context(|| format!("creating index buffer '{label}'"))?;
    device
        .write_buffer(id, 0, bytes)
        .with_context(|| format!("filling index buffer '{label}'"))?;
    Ok(IndexBuffer {
        id,
        format: IndexFormat::Uint16,
        index_count: indices.len() as u32,
    })
}

/// The quad pushed along its normal, used as a morph target.
fn offset_quad(depth: f32) -> Vec<Vertex> {
    QUAD.iter()
        .map(|v| Vertex {
            position: [v.position[0], v.position[1], depth],
            ..*v
        })
        .collect()
}

fn build_scene(device: &mut dyn GraphicsDevice) -> Result<Vec<SceneNode>> {
    log::info!("Sandbox: building demo scene...");

    // --- Effects and materials ---
    let lit = Rc::new(Effect::new(
        "Lit",
        vec![
            Technique::new("Forward", vec![EffectPass::new("Base")]).with_instancing(1),
            Technique::new("ForwardInstanced", vec![EffectPass::new("Base")]),
        ],
    ));
    let outline = Rc::new(Effect::new(
        "Outline",
        vec![Technique::new(
            "Main",
            vec![
                EffectPass::new("Fill"),
                EffectPass::new("Edge").with_render_state(RenderStateBlock {
                    rasterizer: RasterizerState::Wireframe,
                    depth_stencil: DepthStencilState::DepthRead,
                    ..Default::default()
                }),
            ],
        )],
    ));

    let stone = Rc::new(
        Material::new("Stone").with_pass(
            PASS,
            EffectBinding::new(lit.clone(), Rc::new(ConstTechniqueBinding::new(0)))
                .with_parameter(ConstParameterBinding::new(
                    EffectParameter::new("LightDirection", ParameterType::Vec3, ParameterHint::Global),
                    ParameterValue::Vec3(Vec3::new(0.0, -1.0, 0.5).normalize()),
                ))
                .with_parameter(ConstParameterBinding::new(
                    EffectParameter::new("Albedo", ParameterType::Vec4, ParameterHint::Material),
                    ParameterValue::Vec4(Vec4::new(0.55, 0.5, 0.45, 1.0)),
                )),
        ),
    );
    let glow = Rc::new(Material::new("Glow").with_pass(
        PASS,
        EffectBinding::new(outline, Rc::new(ConstTechniqueBinding::new(0))),
    ));

    // --- Geometry ---
    let quad_vb = upload_vertices(device, "Quad", QUAD)?;
    let quad_ib = upload_indices(device, "Quad", QUAD_INDICES)?;
    let crate_vb = upload_vertices(device, "Crate", QUAD)?;
    let face_vb = upload_vertices(device, "Face", QUAD)?;

    let mut face_submesh =
        Submesh::new(face_vb, PrimitiveTopology::TriangleList, 0).with_index_buffer(quad_ib);
    for (i, name) in ["smile", "frown", "blink"].into_iter().enumerate() {
        let target = upload_vertices(device, name, &offset_quad(0.1 * (i + 1) as f32))?;
        face_submesh = face_submesh.with_morph_target(name, target);
    }

    let rock = Rc::new(Mesh::new(
        "Rock",
        vec![Submesh::new(quad_vb, PrimitiveTopology::TriangleList, 0).with_index_buffer(quad_ib)],
        vec![stone.clone()],
    ));
    let crate_mesh = Rc::new(Mesh::new(
        "Crate",
        vec![Submesh::new(crate_vb, PrimitiveTopology::TriangleList, 0)],
        vec![glow],
    ));
    let face = Rc::new(Mesh::new("Face", vec![face_submesh], vec![stone]));

    // --- Nodes ---
    let with_world = |mut node: MeshNode| {
        if let Some(binding) = node.material_instance_mut(0).and_then(|i| i.binding_mut(PASS)) {
            binding.push_parameter(Rc::new(DelegateParameterBinding::node_world("World")));
        }
        node
    };

    let mut nodes: Vec<SceneNode> = Vec::new();
    nodes.push(SceneNode::Light("Sun".into()));
    nodes.push(SceneNode::Group("Rocks".into()));
    for i in 0..12 {
        let position = Vec3::new((i % 4) as f32 * 2.0, 0.0, 4.0 + (i / 4) as f32 * 2.0);
        let node = MeshNode::new(format!("rock{i}"), rock.clone())
            .with_world(Mat4::from_translation(position))
            .with_static(true);
        nodes.push(with_world(node).into());
    }
    for i in 0..3 {
        let node = MeshNode::new(format!("crate{i}"), crate_mesh.clone())
            .with_world(Mat4::from_translation(Vec3::new(-3.0, 0.0, 3.0 + i as f32 * 4.0)));
        nodes.push(with_world(node).into());
    }

    let mut head = with_world(
        MeshNode::new("head", face).with_world(Mat4::from_translation(Vec3::new(0.0, 1.5, 6.0))),
    );
    if let Some(instance) = head.material_instance_mut(0) {
        instance.set_morph_weights(Some(
            MorphWeights::new()
                .with("smile", 0.8)
                .with("blink", -0.3)
                .with("frown", 0.0),
        ));
    }
    nodes.push(head.into());

    let trees = (0..20)
        .map(|i| {
            let position = Vec3::new(-10.0 + i as f32, 0.0, 20.0);
            InstanceData::new(&Mat4::from_translation(position))
                .with_color(Vec3::new(0.2, 0.6 + 0.01 * i as f32, 0.2))
        })
        .collect();
    let forest = MeshNode::new("forest", rock)
        .with_instancing(Rc::new(StaticInstanceSet::new("forest", trees)));
    nodes.push(forest.into());

    log::info!(" -> {} scene nodes", nodes.len());
    Ok(nodes)
}

fn load_settings() -> Result<BatchSettings> {
    let Some(path) = std::env::args().nth(1) else {
        log::info!("Sandbox: using default batch settings");
        return Ok(BatchSettings::default());
    };
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("reading batch settings '{path}'"))?;
    let settings = BatchSettings::from_ron_str(&source)
        .with_context(|| format!("parsing batch settings '{path}'"))?;
    log::info!("Sandbox: loaded batch settings from '{}': {:?}", path, settings);
    Ok(settings)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    let mut lane = MeshRenderLane::with_settings(settings).context("applying batch settings")?;
    let mut device = HeadlessDevice::new();
    let nodes = build_scene(&mut device)?;
    device.take_commands();

    let camera = Camera::looking_at(Vec3::new(0.0, 2.0, -5.0), Vec3::new(0.0, 0.0, 10.0));
    let mut context = RenderContext::new(camera, PASS);

    for order in [RenderOrder::Default, RenderOrder::Default, RenderOrder::FrontToBack] {
        context.next_frame();
        lane.render(&nodes, &mut context, order, &mut device)
            .with_context(|| format!("rendering frame {}", context.frame))?;

        let commands = device.take_commands();
        log::info!(
            "Frame {} ({:?}): {} | {} device commands",
            context.frame,
            order,
            lane.stats(),
            commands.len()
        );
    }

    lane.on_shutdown(&mut device).context("releasing lane buffers")?;
    log::info!("Sandbox: {} device buffers still alive", device.live_buffers());
    Ok(())
}
