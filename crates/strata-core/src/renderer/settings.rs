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

//! Tunables for the mesh batching lane.

use super::error::SettingsError;
use serde::{Deserialize, Serialize};

/// Largest accepted `instance_buffer_capacity`, in instances.
pub const MAX_INSTANCE_BUFFER_CAPACITY: usize = 1 << 20;

/// Settings read by the batching lane at the start of every frame.
///
/// Missing fields in a RON document fall back to [`BatchSettings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Master switch for dynamic (per-run) instancing.
    pub enable_instancing: bool,
    /// Minimum number of consecutive identical submeshes that triggers a
    /// dynamic instanced draw.
    pub instancing_threshold: usize,
    /// Number of instances the dynamic instance buffer holds before it is
    /// flushed. Longer runs are split into several instanced draws.
    pub instance_buffer_capacity: usize,
    /// Checks that no per-frame resource ID survived the previous frame.
    pub validate_resource_ids: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            enable_instancing: true,
            instancing_threshold: 4,
            instance_buffer_capacity: 256,
            validate_resource_ids: cfg!(debug_assertions),
        }
    }
}

impl BatchSettings {
    /// Parses settings from a RON document and validates them.
    pub fn from_ron_str(source: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the lane cannot honour.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.instancing_threshold < 2 {
            return Err(SettingsError::InvalidValue {
                field: "instancing_threshold",
                reason: format!("must be at least 2, got {}", self.instancing_threshold),
            });
        }
        if self.instance_buffer_capacity == 0 {
            return Err(SettingsError::InvalidValue {
                field: "instance_buffer_capacity",
                reason: "must hold at least one instance".to_string(),
            });
        }
        if self.instance_buffer_capacity > MAX_INSTANCE_BUFFER_CAPACITY {
            return Err(SettingsError::InvalidValue {
                field: "instance_buffer_capacity",
                reason: format!(
                    "must not exceed {} instances, got {}",
                    MAX_INSTANCE_BUFFER_CAPACITY, self.instance_buffer_capacity
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = BatchSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.instancing_threshold, 4);
        assert!(settings.enable_instancing);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let settings = BatchSettings::from_ron_str("(instancing_threshold: 8)")
            .expect("partial settings should parse");
        assert_eq!(settings.instancing_threshold, 8);
        assert_eq!(settings.instance_buffer_capacity, 256);
    }

    #[test]
    fn test_threshold_below_two_is_rejected() {
        let err = BatchSettings::from_ron_str("(instancing_threshold: 1)").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                field: "instancing_threshold",
                ..
            }
        ));
    }

    #[test]
    fn test_capacity_is_bounded() {
        let err = BatchSettings::from_ron_str("(instance_buffer_capacity: 18446744073709551615)")
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                field: "instance_buffer_capacity",
                ..
            }
        ));

        let largest = format!("(instance_buffer_capacity: {MAX_INSTANCE_BUFFER_CAPACITY})");
        assert!(
            BatchSettings::from_ron_str(&largest).is_ok(),
            "The bound itself is accepted"
        );
        let zero = BatchSettings {
            instance_buffer_capacity: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_malformed_ron_is_a_parse_error() {
        let err = BatchSettings::from_ron_str("(instancing_threshold: )").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
