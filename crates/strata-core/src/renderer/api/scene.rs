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

//! Scene nodes, the mesh node model and the camera.

use super::instance::InstancingSource;
use super::material::MaterialInstance;
use super::mesh::Mesh;
use crate::math::{Mat4, Vec3};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// The viewpoint distance keys are computed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space position.
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
}

impl Camera {
    /// Creates a camera; `forward` is normalized.
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize(),
        }
    }

    /// A camera at `position` looking towards `target`.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self::new(position, target - position)
    }

    /// Signed distance of `point` along the view direction.
    pub fn view_depth(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.forward)
    }
}

/// A placed mesh with its per-node material instances.
pub struct MeshNode {
    name: String,
    world: Mat4,
    mesh: Rc<Mesh>,
    material_instances: Vec<MaterialInstance>,
    is_static: bool,
    instancing: Option<Rc<dyn InstancingSource>>,
    last_frame: Cell<Option<u64>>,
}

impl MeshNode {
    /// Creates a node with one material instance per mesh material.
    pub fn new(name: impl Into<String>, mesh: Rc<Mesh>) -> Self {
        let material_instances = mesh
            .materials
            .iter()
            .map(|material| MaterialInstance::new(material.clone()))
            .collect();
        Self {
            name: name.into(),
            world: Mat4::IDENTITY,
            mesh,
            material_instances,
            is_static: false,
            instancing: None,
            last_frame: Cell::new(None),
        }
    }

    /// Sets the world transform.
    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    /// Marks the node as static geometry.
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Gives the node a prebuilt instance buffer.
    pub fn with_instancing(mut self, source: Rc<dyn InstancingSource>) -> Self {
        self.instancing = Some(source);
        self
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World transform.
    pub fn world(&self) -> Mat4 {
        self.world
    }

    /// World-space position.
    pub fn position(&self) -> Vec3 {
        self.world.translation()
    }

    /// The drawn mesh.
    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    /// Material instances, indexed like the mesh materials.
    pub fn material_instances(&self) -> &[MaterialInstance] {
        &self.material_instances
    }

    /// Mutable access to one material instance.
    pub fn material_instance_mut(&mut self, index: usize) -> Option<&mut MaterialInstance> {
        self.material_instances.get_mut(index)
    }

    /// Whether the node is static geometry.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// The node's own instance buffer provider, if any.
    pub fn as_instancing_source(&self) -> Option<&dyn InstancingSource> {
        self.instancing.as_deref()
    }

    /// The last frame in which the node was submitted.
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame.get()
    }

    /// Records that the node is submitted in `frame`.
    pub fn touch(&self, frame: u64) {
        self.last_frame.set(Some(frame));
    }
}

impl fmt::Debug for MeshNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshNode")
            .field("name", &self.name)
            .field("mesh", &self.mesh.name)
            .field("is_static", &self.is_static)
            .field("instanced", &self.instancing.is_some())
            .field("last_frame", &self.last_frame.get())
            .finish()
    }
}

/// Anything handed to the lane for a frame. Only meshes are drawn.
#[derive(Debug, Clone)]
pub enum SceneNode {
    /// A drawable mesh.
    Mesh(Rc<MeshNode>),
    /// A transform group.
    Group(String),
    /// A light source.
    Light(String),
}

impl SceneNode {
    /// The mesh node, if this is one.
    pub fn as_mesh(&self) -> Option<&Rc<MeshNode>> {
        match self {
            SceneNode::Mesh(node) => Some(node),
            _ => None,
        }
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Mesh(node) => node.name(),
            SceneNode::Group(name) | SceneNode::Light(name) => name,
        }
    }
}

impl From<MeshNode> for SceneNode {
    fn from(node: MeshNode) -> Self {
        SceneNode::Mesh(Rc::new(node))
    }
}

impl From<Rc<MeshNode>> for SceneNode {
    fn from(node: Rc<MeshNode>) -> Self {
        SceneNode::Mesh(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_depth_is_signed() {
        let camera = Camera::looking_at(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0));
        assert_relative_eq!(camera.view_depth(Vec3::new(3.0, 1.0, -4.0)), 4.0);
        assert_relative_eq!(camera.view_depth(Vec3::new(0.0, 0.0, 2.0)), -2.0);
    }

    #[test]
    fn test_mesh_node_touch_and_position() {
        let mesh = Rc::new(Mesh::new("empty", Vec::new(), Vec::new()));
        let node = MeshNode::new("n", mesh)
            .with_world(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(node.last_frame(), None);
        node.touch(7);
        assert_eq!(node.last_frame(), Some(7));
        assert_eq!(node.position(), Vec3::Y);
        assert!(node.as_instancing_source().is_none());
        assert!(SceneNode::Light("sun".into()).as_mesh().is_none());
    }
}
