// Copyright 2025 RisingWave Labs
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

use std::time::Duration;

use auger_common::work_unit::PlanFragment;

use crate::planning_set::PlanningSet;

/// Push-only planning notifications. Every method has a no-op default;
/// implementations observe, they never steer: all arguments are shared
/// references into state the planner keeps owning.
pub trait PlannerObserver {
    fn plan_parallel_start(&self) {}

    fn plan_parallelized(&self, _set: &PlanningSet) {}

    fn plan_assignment_time(&self, _elapsed: Duration) {}

    fn plan_generation_time(&self, _elapsed: Duration) {}

    fn plans_distribution_complete(&self, _work_units: &[PlanFragment]) {}
}

/// The default observer for tests and callers that do not care.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl PlannerObserver for NoopObserver {}
