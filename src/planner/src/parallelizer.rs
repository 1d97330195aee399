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

//! The parallelization driver. Runs the pipeline for one query: ingest,
//! dependency graph, stats, topological width decision and endpoint
//! assignment, split distribution, then work-unit emission.

use std::time::Instant;

use auger_common::plan::{DistributionAffinity, Fragment, FragmentTree};
use auger_common::work_unit::{PlanFragment, QueryId};
use auger_common::Endpoint;
use itertools::Itertools;
use thiserror_ext::AsReport;

use crate::assign;
use crate::emit::{self, EmitContext};
use crate::error::{PlanSetupError, PlannerResult};
use crate::node_map::ExecutionNodeMap;
use crate::observer::PlannerObserver;
use crate::options::{PlannerOptions, QueryContextInfo, SessionInfo, SessionOptions};
use crate::planning_set::{PlanningSet, WrapperId, WrapperState};
use crate::split_assignment;
use crate::stats;
use crate::width::{decide_width, WidthContext};

/// Parallelizes one query. Construction snapshots everything the pipeline
/// reads; the instance holds no mutable state and a call is a pure function
/// of its arguments plus the snapshot.
pub struct Parallelizer<'a> {
    options: PlannerOptions,
    active: Vec<Endpoint>,
    node_map: ExecutionNodeMap,
    observer: &'a dyn PlannerObserver,
}

impl<'a> Parallelizer<'a> {
    pub fn new(
        options: PlannerOptions,
        active_endpoints: Vec<Endpoint>,
        observer: &'a dyn PlannerObserver,
    ) -> Self {
        let active = dedupe(active_endpoints);
        let node_map = ExecutionNodeMap::new(active.iter().cloned());
        Self {
            options,
            active,
            node_map,
            observer,
        }
    }

    /// Legacy constructor that leaves the execution node map unfed: every
    /// affinity projects to nothing, so placement preferences are ignored
    /// and hard pins fail as unavailable.
    pub fn with_empty_node_map(
        options: PlannerOptions,
        active_endpoints: Vec<Endpoint>,
        observer: &'a dyn PlannerObserver,
    ) -> Self {
        tracing::warn!(
            "parallelizer constructed with an empty execution node map; \
             endpoint affinities will not be honored"
        );
        Self {
            options,
            active: dedupe(active_endpoints),
            node_map: ExecutionNodeMap::empty(),
            observer,
        }
    }

    /// The entry point: turn `tree` into dispatchable work units.
    ///
    /// Fails atomically; a partial work-unit list never escapes.
    pub fn generate_work_units(
        &self,
        query_id: QueryId,
        foreman: &Endpoint,
        session: &SessionInfo,
        query_context: &QueryContextInfo,
        session_options: &SessionOptions,
        tree: &FragmentTree,
    ) -> PlannerResult<Vec<PlanFragment>> {
        let result = self.generate_inner(
            query_id,
            foreman,
            session,
            query_context,
            session_options,
            tree,
        );
        if let Err(error) = &result {
            tracing::warn!(error = %error.as_report(), %query_id, "query parallelization failed");
        }
        result
    }

    fn generate_inner(
        &self,
        query_id: QueryId,
        foreman: &Endpoint,
        session: &SessionInfo,
        query_context: &QueryContextInfo,
        session_options: &SessionOptions,
        tree: &FragmentTree,
    ) -> PlannerResult<Vec<PlanFragment>> {
        self.options.validate()?;
        self.observer.plan_parallel_start();

        let mut set = PlanningSet::ingest(tree)?;
        set.build_dependencies(tree)?;

        for id in set.iter_ids().collect_vec() {
            let fragment = tree.fragment(set.wrapper(id).major_id());
            let fragment_stats = stats::collect(fragment, &self.node_map);
            set.wrapper_mut(id).collect_stats(fragment_stats);
        }

        let assignment_started = Instant::now();
        let mut budget = Budget::new(set.len() as u32);
        let mut visit = vec![Visit::New; set.len()];
        for id in set.iter_ids().collect_vec() {
            self.size_and_assign(id, tree, &mut set, &mut visit, &mut budget)?;
        }
        self.observer.plan_assignment_time(assignment_started.elapsed());

        for id in set.iter_ids().collect_vec() {
            let wrapper = set.wrapper(id);
            let split_sets = split_assignment::assign_splits(
                tree.fragment(wrapper.major_id()),
                wrapper.assigned_endpoints(),
            );
            set.wrapper_mut(id).split_sets = split_sets;
        }

        debug_assert!(set.iter().all(|w| w.state() == WrapperState::Assigned));
        self.observer.plan_parallelized(&set);

        let generation_started = Instant::now();
        let options_raw = serde_json::to_vec(session_options).map_err(|error| {
            PlanSetupError::Serialization {
                fragment: tree.root_id(),
                source: error.into(),
            }
        })?;
        let options_bytes = self.options.codec.encode(&options_raw).map_err(|error| {
            PlanSetupError::Serialization {
                fragment: tree.root_id(),
                source: error.into(),
            }
        })?;
        let work_units = emit::emit_work_units(
            &mut set,
            tree,
            &EmitContext {
                query_id,
                foreman,
                session,
                query_context,
                options_bytes,
                codec: self.options.codec,
            },
        )?;
        self.observer.plan_generation_time(generation_started.elapsed());
        self.observer.plans_distribution_complete(&work_units);

        tracing::debug!(
            %query_id,
            fragments = set.len(),
            work_units = work_units.len(),
            "parallelized query plan"
        );
        Ok(work_units)
    }

    /// Size and assign one wrapper, its dependencies first. Idempotent
    /// through the wrapper state; re-entry on the recursion stack is a
    /// dependency cycle.
    fn size_and_assign(
        &self,
        id: WrapperId,
        tree: &FragmentTree,
        set: &mut PlanningSet,
        visit: &mut [Visit],
        budget: &mut Budget,
    ) -> Result<(), PlanSetupError> {
        match visit[id] {
            Visit::InProgress => {
                return Err(PlanSetupError::Cycle {
                    fragment: set.wrapper(id).major_id(),
                });
            }
            Visit::Done => return Ok(()),
            Visit::New => {}
        }
        visit[id] = Visit::InProgress;

        for dep in set.wrapper(id).dependencies().to_vec() {
            self.size_and_assign(dep, tree, set, visit, budget)?;
        }

        if set.wrapper(id).state() >= WrapperState::Sized {
            visit[id] = Visit::Done;
            return Ok(());
        }

        let wrapper = set.wrapper(id);
        let major_id = wrapper.major_id();
        let fragment = tree.fragment(major_id);
        let fragment_stats = wrapper.stats_unchecked();

        let eligible = if fragment_stats.distribution_affinity == DistributionAffinity::Hard {
            Some(assign::hard_eligible_endpoints(
                major_id,
                fragment_stats,
                &self.node_map,
            )?)
        } else {
            None
        };

        let width = decide_width(
            &WidthContext {
                fragment: major_id,
                is_query_root: major_id == tree.root_id(),
                stats: fragment_stats,
                paired_width: paired_width(fragment, set),
                eligible_count: eligible
                    .as_ref()
                    .and_then(|e| (!e.is_empty()).then_some(e.len())),
                active_count: self.active.len(),
                global_remaining: budget.remaining_for_next(self.options.max_global_width),
            },
            &self.options,
        )?;

        let candidates: &[Endpoint] = match &eligible {
            Some(pinned) if !pinned.is_empty() => pinned,
            _ => &self.active,
        };
        let assigned =
            assign::policy_for(&self.options).assign(width, fragment_stats, candidates, &self.options);

        budget.grant(width);
        let wrapper = set.wrapper_mut(id);
        wrapper.freeze_width(width);
        wrapper.assign_endpoints(assigned);
        set.record_sized(major_id);
        visit[id] = Visit::Done;
        Ok(())
    }
}

/// Width a neighbor across a width-paired exchange already froze, if any.
fn paired_width(fragment: &Fragment, set: &PlanningSet) -> Option<u32> {
    fragment
        .sending_exchange
        .iter()
        .chain(&fragment.receiving_exchanges)
        .filter(|pair| pair.exchange.width_paired)
        .filter_map(|pair| set.wrapper_for(pair.neighbor).and_then(|w| w.width()))
        .min()
}

fn dedupe(endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut seen = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        if !seen.contains(&endpoint) {
            seen.push(endpoint);
        }
    }
    seen
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    New,
    InProgress,
    Done,
}

/// Tracks the global width ceiling across the sizing recursion, holding one
/// slot back for every fragment still waiting to be sized.
struct Budget {
    granted: u32,
    unsized_fragments: u32,
}

impl Budget {
    fn new(fragments: u32) -> Self {
        Self {
            granted: 0,
            unsized_fragments: fragments,
        }
    }

    fn remaining_for_next(&self, max_global_width: u32) -> u32 {
        let reserved = self.unsized_fragments.saturating_sub(1);
        max_global_width
            .saturating_sub(self.granted)
            .saturating_sub(reserved)
    }

    fn grant(&mut self, width: u32) {
        self.granted += width;
        self.unsized_fragments -= 1;
    }
}
