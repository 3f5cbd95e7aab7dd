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

//! Rendering lane - batching and submission of mesh draw calls.
//!
//! A frame goes through four stages, each in its own module:
//!
//! 1. [`job`] walks the visible nodes and produces one [`Job`] per drawable
//!    (node, submesh) pair, with packed [`sort_key`]s.
//! 2. [`sorter`] orders the jobs by the requested [`JobOrder`].
//! 3. `processor` walks the sorted jobs, groups neighbours that share state
//!    and picks a submission strategy for each group.
//! 4. [`MeshRenderLane`] wraps the above with precondition checks, the
//!    render-state snapshot and the per-frame ID lifecycle.

mod error;
mod instancing;
mod mesh_render_lane;
mod processor;
mod state_snapshot;
mod stats;
mod validation;

pub mod job;
pub mod morph;
pub mod resource_ids;
pub mod sort_key;
pub mod sorter;

pub use error::BatchError;
pub use instancing::InstanceBatch;
pub use job::Job;
pub use mesh_render_lane::MeshRenderLane;
pub use morph::{select_morph_targets, MorphSelection};
pub use resource_ids::{IdSpace, ResourceIdAllocator};
pub use sorter::{sort_jobs, JobKeys, JobOrder};
pub use state_snapshot::RenderStateSnapshot;
pub use stats::BatchStats;
pub use validation::validate_resource_ids;
