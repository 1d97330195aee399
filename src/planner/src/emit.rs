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

//! The work-unit emitter: one serialized [`PlanFragment`] per
//! (major fragment, minor id) pair, in planning-set order then ascending
//! minor id. Emission is all-or-nothing.

use auger_common::codec::FragmentCodec;
use auger_common::plan::FragmentTree;
use auger_common::work_unit::{FragmentHandle, PlanFragment, QueryId};
use auger_common::Endpoint;
use bytes::Bytes;
use itertools::Itertools;

use crate::collect::collect_receivers;
use crate::error::{ForemanSetupError, PlanSetupError, PlannerResult};
use crate::materialize::materialize_fragment;
use crate::options::{QueryContextInfo, SessionInfo};
use crate::planning_set::PlanningSet;

pub(crate) struct EmitContext<'a> {
    pub query_id: QueryId,
    pub foreman: &'a Endpoint,
    pub session: &'a SessionInfo,
    pub query_context: &'a QueryContextInfo,
    pub options_bytes: Bytes,
    pub codec: FragmentCodec,
}

pub(crate) fn emit_work_units(
    set: &mut PlanningSet,
    tree: &FragmentTree,
    ctx: &EmitContext<'_>,
) -> PlannerResult<Vec<PlanFragment>> {
    let root_major_id = tree.root_id();
    let mut work_units = vec![];

    for id in set.iter_ids().collect_vec() {
        let wrapper = set.wrapper(id);
        let major_id = wrapper.major_id();
        let width = wrapper.width_unchecked();
        if major_id == root_major_id && width != 1 {
            return Err(ForemanSetupError::RootWidth { width }.into());
        }

        let fragment = tree.fragment(major_id);
        let leaf = fragment.receiving_exchanges.is_empty();

        for minor_id in 0..width {
            let materialized =
                materialize_fragment(fragment, minor_id, set, &set.wrapper(id).split_sets)?;
            let collectors = collect_receivers(&materialized.root, set);
            let assigned_endpoint =
                set.wrapper(id).assigned_endpoints()[minor_id as usize].clone();

            let raw = serde_json::to_vec(&materialized.root).map_err(|error| {
                PlanSetupError::Serialization {
                    fragment: major_id,
                    source: error.into(),
                }
            })?;
            let fragment_bytes =
                ctx.codec
                    .encode(&raw)
                    .map_err(|error| PlanSetupError::Serialization {
                        fragment: major_id,
                        source: error.into(),
                    })?;

            let wrapper = set.wrapper_mut(id);
            wrapper.reset_allocations();
            wrapper.add_allocation(materialized.initial_allocation, materialized.max_allocation);

            work_units.push(PlanFragment {
                handle: FragmentHandle {
                    query_id: ctx.query_id,
                    major_id,
                    minor_id,
                },
                foreman: ctx.foreman.clone(),
                assigned_endpoint,
                mem_initial: wrapper.initial_allocation(),
                mem_max: wrapper.max_allocation(),
                fragment_bytes,
                options_bytes: ctx.options_bytes.clone(),
                credentials: ctx.session.credentials.clone(),
                collectors,
                leaf,
                priority: ctx.query_context.priority,
                codec: ctx.codec,
            });
        }
    }

    Ok(work_units)
}
