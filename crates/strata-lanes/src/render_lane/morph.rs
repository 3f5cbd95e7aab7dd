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

//! Morph target selection.

use strata_core::renderer::{EffectBinding, Submesh, MAX_MORPH_TARGETS};

/// The morph targets bound for one draw, highest |weight| first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MorphSelection {
    slots: [(usize, f32); MAX_MORPH_TARGETS],
    len: usize,
}

impl MorphSelection {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Selected `(target index, weight)` pairs in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.slots[..self.len].iter().copied()
    }

    /// Target index bound to each of the five morph streams. Unused streams
    /// repeat the highest-priority target.
    pub fn stream_targets(&self) -> Option<[usize; MAX_MORPH_TARGETS]> {
        let (lead, _) = *self.slots[..self.len].first()?;
        let mut targets = [lead; MAX_MORPH_TARGETS];
        for (slot, (index, _)) in self.iter().enumerate() {
            targets[slot] = index;
        }
        Some(targets)
    }

    /// Weights for the five morph streams; padded streams weigh zero.
    pub fn stream_weights(&self) -> [f32; MAX_MORPH_TARGETS] {
        let mut weights = [0.0; MAX_MORPH_TARGETS];
        for (slot, (_, weight)) in self.iter().enumerate() {
            weights[slot] = weight;
        }
        weights
    }
}

/// Picks up to five targets by descending |weight|.
///
/// Ties keep encounter order. Zero (and NaN) weights never take a slot, and
/// targets beyond the fifth are dropped.
pub fn select_morph_targets(weights: &[f32]) -> MorphSelection {
    let mut candidates: Vec<(usize, f32)> = weights
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, weight)| *weight != 0.0 && !weight.is_nan())
        .collect();
    candidates.sort_by(|(_, a), (_, b)| b.abs().total_cmp(&a.abs()));

    let mut selection = MorphSelection::default();
    for (slot, candidate) in candidates.into_iter().take(MAX_MORPH_TARGETS).enumerate() {
        selection.slots[slot] = candidate;
        selection.len = slot + 1;
    }
    selection
}

/// Per-target weights of `submesh` read from the binding, in target order.
pub fn gather_weights(binding: &EffectBinding, submesh: &Submesh) -> Vec<f32> {
    match binding.morph_weights() {
        Some(weights) => submesh
            .morph_targets
            .iter()
            .map(|target| weights.weight(&target.name))
            .collect(),
        None => Vec::new(),
    }
}

/// Whether drawing `submesh` with `binding` needs the morph path.
pub fn has_active_morph(binding: &EffectBinding, submesh: &Submesh) -> bool {
    binding.morph_weights().is_some_and(|weights| {
        submesh
            .morph_targets
            .iter()
            .any(|target| weights.weight(&target.name) != 0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_top_five_by_magnitude() {
        let selection = select_morph_targets(&[0.1, -0.9, 0.05, 0.3, 0.0, 0.7]);
        let picked: Vec<(usize, f32)> = selection.iter().collect();
        assert_eq!(picked, vec![(1, -0.9), (5, 0.7), (3, 0.3), (0, 0.1), (2, 0.05)]);
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let selection = select_morph_targets(&[0.5, -0.5, 0.5]);
        let order: Vec<usize> = selection.iter().map(|(index, _)| index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_more_than_five_targets_are_clamped() {
        let selection = select_morph_targets(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        assert_eq!(selection.len(), MAX_MORPH_TARGETS);
        assert!(selection.iter().all(|(index, _)| index >= 2), "Weakest targets must be dropped");
    }

    #[test]
    fn test_padding_repeats_the_lead_target() {
        let selection = select_morph_targets(&[0.0, 0.25, 0.0, -0.75]);
        assert_eq!(selection.stream_targets(), Some([3, 1, 3, 3, 3]));
        assert_eq!(selection.stream_weights(), [-0.75, 0.25, 0.0, 0.0, 0.0]);
        assert_eq!(select_morph_targets(&[0.0, 0.0]).stream_targets(), None);
    }
}
