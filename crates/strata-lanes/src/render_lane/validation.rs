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

use super::error::BatchError;
use super::resource_ids::ResourceIdAllocator;

/// Checks that the previous frame left no per-frame ID or counter behind.
///
/// A leftover ID would alias (or fail to alias) sort keys in the next frame,
/// silently breaking grouping.
pub fn validate_resource_ids(ids: &ResourceIdAllocator) -> Result<(), BatchError> {
    if ids.is_clear() {
        return Ok(());
    }
    let count = ids.live_count();
    log::error!("MeshRenderLane: {count} resource IDs survived the previous frame");
    Err(BatchError::StaleResourceIds { count })
}
