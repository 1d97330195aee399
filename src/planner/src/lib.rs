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

//! The distributed query parallelizer.
//!
//! Turns a [`FragmentTree`](auger_common::plan::FragmentTree) into a list of
//! dispatchable [`PlanFragment`](auger_common::work_unit::PlanFragment)s:
//! builds the fragment dependency graph, collects per-fragment statistics,
//! decides each fragment's width under the configured ceilings, assigns
//! minor fragments to endpoints, and materializes and serializes one plan
//! per minor.
//!
//! The whole pipeline is a synchronous, deterministic function of its
//! inputs. One [`Parallelizer`] serves one query; nothing is shared across
//! invocations.

mod assign;
mod collect;
mod emit;
pub mod error;
mod materialize;
pub mod node_map;
pub mod observer;
pub mod options;
pub mod parallelizer;
pub mod planning_set;
mod split_assignment;
pub mod stats;
mod width;

pub use error::{
    ForemanSetupError, InvalidConfigError, PlanSetupError, PlannerError, PlannerResult,
};
pub use node_map::ExecutionNodeMap;
pub use observer::{NoopObserver, PlannerObserver};
pub use options::{
    max_width_per_node_from_cores, PlannerOptions, QueryContextInfo, SessionInfo, SessionOptions,
};
pub use parallelizer::Parallelizer;
pub use planning_set::{PlanningSet, Wrapper, WrapperState};
