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

//! Materials and their per-node instances.

use super::effect::{EffectBinding, MorphWeights};
use crate::asset::AssetUUID;
use std::rc::Rc;

/// A shared material: one [`EffectBinding`] per render pass name.
#[derive(Debug, Clone)]
pub struct Material {
    uuid: AssetUUID,
    name: String,
    bindings: Vec<(String, EffectBinding)>,
}

impl Material {
    /// Creates a material with no pass bindings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: AssetUUID::new(),
            name: name.into(),
            bindings: Vec::new(),
        }
    }

    /// Binds an effect for the given render pass, replacing any previous one.
    pub fn with_pass(mut self, pass: impl Into<String>, binding: EffectBinding) -> Self {
        let pass = pass.into();
        self.bindings.retain(|(name, _)| *name != pass);
        self.bindings.push((pass, binding));
        self
    }

    /// Stable identity of the material.
    pub fn uuid(&self) -> AssetUUID {
        self.uuid
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The binding used for `pass`.
    pub fn binding(&self, pass: &str) -> Option<&EffectBinding> {
        self.bindings
            .iter()
            .find(|(name, _)| name == pass)
            .map(|(_, binding)| binding)
    }
}

/// Per-node state layered over a shared [`Material`].
///
/// Each pass binding of the material gets an instance binding on the same
/// effect. Instance bindings carry the node-specific parameters (world
/// matrix, tint) and the morph weights.
#[derive(Debug, Clone)]
pub struct MaterialInstance {
    material: Rc<Material>,
    bindings: Vec<(String, EffectBinding)>,
}

impl MaterialInstance {
    /// Creates an instance with empty bindings for every pass of `material`.
    pub fn new(material: Rc<Material>) -> Self {
        let bindings = material
            .bindings
            .iter()
            .map(|(pass, binding)| (pass.clone(), binding.fork()))
            .collect();
        Self { material, bindings }
    }

    /// The shared material.
    pub fn material(&self) -> &Rc<Material> {
        &self.material
    }

    /// The instance binding for `pass`.
    pub fn binding(&self, pass: &str) -> Option<&EffectBinding> {
        self.bindings
            .iter()
            .find(|(name, _)| name == pass)
            .map(|(_, binding)| binding)
    }

    /// Mutable access to the instance binding for `pass`.
    pub fn binding_mut(&mut self, pass: &str) -> Option<&mut EffectBinding> {
        self.bindings
            .iter_mut()
            .find(|(name, _)| name == pass)
            .map(|(_, binding)| binding)
    }

    /// The shared material's binding for `pass`.
    pub fn material_binding(&self, pass: &str) -> Option<&EffectBinding> {
        self.material.binding(pass)
    }

    /// Sets the morph weights on every instance binding.
    pub fn set_morph_weights(&mut self, weights: Option<MorphWeights>) {
        for (_, binding) in &mut self.bindings {
            binding.set_morph_weights(weights.clone());
        }
    }
}
