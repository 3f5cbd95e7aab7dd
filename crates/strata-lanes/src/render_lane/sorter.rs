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

//! Job ordering policies.

use super::job::Job;
use std::cmp::Ordering;
use strata_core::renderer::RenderOrder;

/// The three packed keys of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobKeys {
    pub material: u32,
    pub submesh: u32,
    pub distance: u32,
}

/// How jobs are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobOrder {
    /// Material key, then submesh key, then distance key.
    StateFirst,
    /// Distance key, then material key, then submesh key.
    DistanceFirst,
    /// Input order is kept.
    Unordered,
}

impl From<RenderOrder> for JobOrder {
    fn from(order: RenderOrder) -> Self {
        match order {
            RenderOrder::Default => JobOrder::StateFirst,
            RenderOrder::FrontToBack | RenderOrder::BackToFront => JobOrder::DistanceFirst,
            RenderOrder::UserDefined => JobOrder::Unordered,
        }
    }
}

impl JobOrder {
    /// Total order over keys. `Unordered` considers every pair equal.
    pub fn compare(&self, a: &JobKeys, b: &JobKeys) -> Ordering {
        match self {
            JobOrder::StateFirst => {
                (a.material, a.submesh, a.distance).cmp(&(b.material, b.submesh, b.distance))
            }
            JobOrder::DistanceFirst => {
                (a.distance, a.material, a.submesh).cmp(&(b.distance, b.material, b.submesh))
            }
            JobOrder::Unordered => Ordering::Equal,
        }
    }
}

/// Sorts `jobs` in place. The sort is stable, so equal keys keep input order.
pub fn sort_jobs(jobs: &mut [Job<'_>], order: JobOrder) {
    if order == JobOrder::Unordered {
        return;
    }
    jobs.sort_by(|a, b| order.compare(&a.keys(), &b.keys()));
}
