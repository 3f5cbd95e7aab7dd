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

//! Effects, techniques, passes and the bindings that feed them parameters.
//!
//! An [`Effect`] is a compiled shader program made of one or more
//! [`Technique`]s, each split into ordered [`EffectPass`]es. Materials and
//! material instances never talk to an effect directly. They hold an
//! [`EffectBinding`], which pairs the effect with a [`TechniqueBinding`]
//! (which technique and passes to use for a given frame) and a list of
//! [`EffectParameterBinding`]s (where parameter values come from).

use super::context::RenderContext;
use super::state::RenderStateBlock;
use crate::asset::AssetUUID;
use crate::math::{Mat4, Vec3, Vec4};
use crate::renderer::traits::GraphicsDevice;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Well-known parameter semantics understood by the batching lane.
pub mod semantics {
    /// The world transform of the drawn node. Must be a matrix.
    pub const WORLD: &str = "World";
    /// A per-instance tint. Must be a `Vec3` or `Vec4`.
    pub const INSTANCE_COLOR: &str = "InstanceColor";
    /// A per-instance opacity. Must be a float.
    pub const INSTANCE_ALPHA: &str = "InstanceAlpha";
}

/// Name of the float-array parameter that receives the selected morph weights.
pub const MORPH_WEIGHTS_PARAMETER: &str = "MorphWeights";

/// Maximum number of morph targets blended in a single draw.
pub const MAX_MORPH_TARGETS: usize = 5;

// --- Effect structure ---

/// One pass of a technique.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectPass {
    /// Debug name of the pass.
    pub name: String,
    /// Device state this pass sets when applied, if any.
    pub render_state: Option<RenderStateBlock>,
}

impl EffectPass {
    /// Creates a pass that leaves device state untouched.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            render_state: None,
        }
    }

    /// Makes the pass override device state when applied.
    pub fn with_render_state(mut self, state: RenderStateBlock) -> Self {
        self.render_state = Some(state);
        self
    }
}

/// A named, ordered list of passes inside an effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Technique {
    index: u8,
    name: String,
    passes: Vec<EffectPass>,
    instancing: Option<u8>,
}

impl Technique {
    /// Creates a technique. Its index is assigned by [`Effect::new`].
    pub fn new(name: impl Into<String>, passes: Vec<EffectPass>) -> Self {
        Self {
            index: 0,
            name: name.into(),
            passes,
            instancing: None,
        }
    }

    /// Declares the technique (by index) that renders this one with hardware instancing.
    pub fn with_instancing(mut self, technique: u8) -> Self {
        self.instancing = Some(technique);
        self
    }

    /// Index of the technique inside its effect.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All passes, in application order.
    pub fn passes(&self) -> &[EffectPass] {
        &self.passes
    }

    /// Index of the instancing variant, if the technique has one.
    pub fn instancing(&self) -> Option<u8> {
        self.instancing
    }
}

/// A compiled shader program.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    uuid: AssetUUID,
    name: String,
    techniques: Vec<Technique>,
}

impl Effect {
    /// Creates an effect and numbers its techniques in order.
    ///
    /// Technique indices occupy seven bits of the material sort key, so only
    /// the first 128 techniques of an effect are distinguishable when sorting.
    pub fn new(name: impl Into<String>, mut techniques: Vec<Technique>) -> Self {
        let name = name.into();
        if techniques.len() > 128 {
            log::warn!(
                "Effect '{}' declares {} techniques; sort keys only distinguish 128",
                name,
                techniques.len()
            );
        }
        for (index, technique) in techniques.iter_mut().enumerate() {
            technique.index = index as u8;
        }
        Self {
            uuid: AssetUUID::new(),
            name,
            techniques,
        }
    }

    /// Stable identity of the effect.
    pub fn uuid(&self) -> AssetUUID {
        self.uuid
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All techniques.
    pub fn techniques(&self) -> &[Technique] {
        &self.techniques
    }

    /// Looks a technique up by index.
    pub fn technique(&self, index: u8) -> Option<&Technique> {
        self.techniques.get(index as usize)
    }

    /// The instancing variant of `technique`, if declared and present.
    pub fn instancing_technique(&self, technique: &Technique) -> Option<&Technique> {
        technique.instancing.and_then(|index| self.technique(index))
    }
}

// --- Parameters ---

/// How often a parameter changes, which decides when the lane applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterHint {
    /// Applied once when the lane switches to the effect.
    Global,
    /// Applied once when the lane switches to a material.
    Material,
    /// Applied for every drawn node.
    Local,
    /// Applied for every drawn node, or gathered into the instance buffer
    /// when the node is drawn through dynamic instancing.
    PerInstance,
    /// Updated and applied before every pass.
    PerPass,
}

/// The type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// A boolean.
    Bool,
    /// A 32-bit integer.
    Int,
    /// A float.
    Float,
    /// A 3-component vector.
    Vec3,
    /// A 4-component vector.
    Vec4,
    /// A 4x4 matrix.
    Matrix,
    /// An array of floats.
    FloatArray,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// A boolean.
    Bool(bool),
    /// A 32-bit integer.
    Int(i32),
    /// A float.
    Float(f32),
    /// A 3-component vector.
    Vec3(Vec3),
    /// A 4-component vector.
    Vec4(Vec4),
    /// A 4x4 matrix.
    Matrix(Mat4),
    /// An array of floats.
    FloatArray(Vec<f32>),
}

impl ParameterValue {
    /// The type tag of this value.
    pub fn value_type(&self) -> ParameterType {
        match self {
            ParameterValue::Bool(_) => ParameterType::Bool,
            ParameterValue::Int(_) => ParameterType::Int,
            ParameterValue::Float(_) => ParameterType::Float,
            ParameterValue::Vec3(_) => ParameterType::Vec3,
            ParameterValue::Vec4(_) => ParameterType::Vec4,
            ParameterValue::Matrix(_) => ParameterType::Matrix,
            ParameterValue::FloatArray(_) => ParameterType::FloatArray,
        }
    }
}

/// Reflection data of one effect parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectParameter {
    /// Name the device knows the parameter by.
    pub name: String,
    /// Optional semantic, e.g. [`semantics::WORLD`].
    pub semantic: Option<String>,
    /// Update frequency.
    pub hint: ParameterHint,
    /// Declared value type.
    pub value_type: ParameterType,
}

impl EffectParameter {
    /// Creates a parameter without a semantic.
    pub fn new(name: impl Into<String>, value_type: ParameterType, hint: ParameterHint) -> Self {
        Self {
            name: name.into(),
            semantic: None,
            hint,
            value_type,
        }
    }

    /// Attaches a semantic.
    pub fn with_semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }
}

/// Supplies the value of one effect parameter.
pub trait EffectParameterBinding {
    /// The parameter this binding feeds.
    fn parameter(&self) -> &EffectParameter;

    /// Refreshes the cached value from the current render context.
    fn update(&self, _context: &RenderContext) {}

    /// The current value.
    fn value(&self) -> ParameterValue;

    /// Pushes the current value to the device.
    fn apply(&self, effect: &Effect, device: &mut dyn GraphicsDevice) {
        device.set_parameter(effect, &self.parameter().name, &self.value());
    }
}

/// A binding whose value never changes.
#[derive(Debug, Clone)]
pub struct ConstParameterBinding {
    parameter: EffectParameter,
    value: ParameterValue,
}

impl ConstParameterBinding {
    /// Creates the binding.
    pub fn new(parameter: EffectParameter, value: ParameterValue) -> Self {
        Self { parameter, value }
    }
}

impl EffectParameterBinding for ConstParameterBinding {
    fn parameter(&self) -> &EffectParameter {
        &self.parameter
    }

    fn value(&self) -> ParameterValue {
        self.value.clone()
    }
}

type Compute = dyn Fn(&RenderContext) -> Option<ParameterValue>;

/// A binding that recomputes its value from the render context on
/// [`update`](EffectParameterBinding::update) and caches it until the next one.
///
/// When the closure returns `None` the previous value is kept.
pub struct DelegateParameterBinding {
    parameter: EffectParameter,
    compute: Box<Compute>,
    value: RefCell<ParameterValue>,
}

impl DelegateParameterBinding {
    /// Creates the binding with an initial value.
    pub fn new(
        parameter: EffectParameter,
        initial: ParameterValue,
        compute: impl Fn(&RenderContext) -> Option<ParameterValue> + 'static,
    ) -> Self {
        Self {
            parameter,
            compute: Box::new(compute),
            value: RefCell::new(initial),
        }
    }

    /// A per-instance `World` matrix read from the node currently being drawn.
    pub fn node_world(name: impl Into<String>) -> Self {
        let parameter = EffectParameter::new(name, ParameterType::Matrix, ParameterHint::PerInstance)
            .with_semantic(semantics::WORLD);
        Self::new(parameter, ParameterValue::Matrix(Mat4::IDENTITY), |context| {
            context
                .scene_node
                .as_ref()
                .map(|node| ParameterValue::Matrix(node.world()))
        })
    }
}

impl EffectParameterBinding for DelegateParameterBinding {
    fn parameter(&self) -> &EffectParameter {
        &self.parameter
    }

    fn update(&self, context: &RenderContext) {
        if let Some(value) = (self.compute)(context) {
            *self.value.borrow_mut() = value;
        }
    }

    fn value(&self) -> ParameterValue {
        self.value.borrow().clone()
    }
}

impl fmt::Debug for DelegateParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateParameterBinding")
            .field("parameter", &self.parameter)
            .field("value", &self.value.borrow())
            .finish_non_exhaustive()
    }
}

// --- Techniques ---

/// Chooses the technique and the passes used to draw with an effect.
pub trait TechniqueBinding {
    /// The technique to use for this frame, or `None` when the effect has
    /// nothing suitable.
    fn technique<'e>(&self, effect: &'e Effect, context: &RenderContext) -> Option<&'e Technique>;

    /// Indices of the passes of `technique` to apply, in order.
    fn passes(&self, technique: &Technique, _context: &RenderContext) -> Vec<usize> {
        (0..technique.passes().len()).collect()
    }
}

/// Always selects the same technique, optionally restricted to some passes.
#[derive(Debug, Clone, Default)]
pub struct ConstTechniqueBinding {
    technique: u8,
    passes: Option<Vec<usize>>,
}

impl ConstTechniqueBinding {
    /// Selects the technique at `technique` with all of its passes.
    pub fn new(technique: u8) -> Self {
        Self {
            technique,
            passes: None,
        }
    }

    /// Restricts the applied passes.
    pub fn with_passes(mut self, passes: Vec<usize>) -> Self {
        self.passes = Some(passes);
        self
    }
}

impl TechniqueBinding for ConstTechniqueBinding {
    fn technique<'e>(&self, effect: &'e Effect, _context: &RenderContext) -> Option<&'e Technique> {
        effect.technique(self.technique)
    }

    fn passes(&self, technique: &Technique, _context: &RenderContext) -> Vec<usize> {
        let count = technique.passes().len();
        match &self.passes {
            Some(passes) => passes.iter().copied().filter(|&p| p < count).collect(),
            None => (0..count).collect(),
        }
    }
}

// --- Bindings ---

/// Named morph target weights carried by a material instance binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphWeights {
    weights: Vec<(String, f32)>,
}

impl MorphWeights {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MorphWeights::set`].
    pub fn with(mut self, target: impl Into<String>, weight: f32) -> Self {
        self.set(target, weight);
        self
    }

    /// Sets the weight of a named target.
    pub fn set(&mut self, target: impl Into<String>, weight: f32) {
        let target = target.into();
        match self.weights.iter_mut().find(|(name, _)| *name == target) {
            Some(entry) => entry.1 = weight,
            None => self.weights.push((target, weight)),
        }
    }

    /// Weight of a named target, `0.0` when unset.
    pub fn weight(&self, target: &str) -> f32 {
        self.weights
            .iter()
            .find(|(name, _)| name == target)
            .map_or(0.0, |(_, weight)| *weight)
    }

    /// Whether any weight is non-zero.
    pub fn is_active(&self) -> bool {
        self.weights.iter().any(|(_, weight)| *weight != 0.0)
    }
}

/// An effect together with the bindings that drive it.
#[derive(Clone)]
pub struct EffectBinding {
    effect: Rc<Effect>,
    technique_binding: Rc<dyn TechniqueBinding>,
    parameters: Vec<Rc<dyn EffectParameterBinding>>,
    morph_weights: Option<MorphWeights>,
}

impl EffectBinding {
    /// Creates a binding with no parameters.
    pub fn new(effect: Rc<Effect>, technique_binding: Rc<dyn TechniqueBinding>) -> Self {
        Self {
            effect,
            technique_binding,
            parameters: Vec::new(),
            morph_weights: None,
        }
    }

    /// Builder form of [`EffectBinding::push_parameter`].
    pub fn with_parameter(mut self, binding: impl EffectParameterBinding + 'static) -> Self {
        self.push_parameter(Rc::new(binding));
        self
    }

    /// Appends a parameter binding.
    pub fn push_parameter(&mut self, binding: Rc<dyn EffectParameterBinding>) {
        self.parameters.push(binding);
    }

    /// An empty binding on the same effect and technique binding.
    pub fn fork(&self) -> Self {
        Self::new(self.effect.clone(), self.technique_binding.clone())
    }

    /// The bound effect.
    pub fn effect(&self) -> &Rc<Effect> {
        &self.effect
    }

    /// The technique binding.
    pub fn technique_binding(&self) -> &dyn TechniqueBinding {
        self.technique_binding.as_ref()
    }

    /// All parameter bindings, in declaration order.
    pub fn parameters(&self) -> &[Rc<dyn EffectParameterBinding>] {
        &self.parameters
    }

    /// Parameter bindings with the given hint.
    pub fn parameters_with_hint(
        &self,
        hint: ParameterHint,
    ) -> impl Iterator<Item = &dyn EffectParameterBinding> + '_ {
        self.parameters
            .iter()
            .map(|binding| binding.as_ref())
            .filter(move |binding| binding.parameter().hint == hint)
    }

    /// Morph weights, if this binding drives a morphing mesh.
    pub fn morph_weights(&self) -> Option<&MorphWeights> {
        self.morph_weights.as_ref()
    }

    /// Replaces the morph weights.
    pub fn set_morph_weights(&mut self, weights: Option<MorphWeights>) {
        self.morph_weights = weights;
    }
}

impl fmt::Debug for EffectBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectBinding")
            .field("effect", &self.effect.name())
            .field(
                "parameters",
                &self
                    .parameters
                    .iter()
                    .map(|p| p.parameter().name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("morph_weights", &self.morph_weights)
            .finish()
    }
}
