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

use auger_common::plan::MajorFragmentId;

use crate::error::PlanSetupError;
use crate::options::PlannerOptions;
use crate::stats::FragmentStats;

/// Everything the width decision for one fragment depends on.
pub(crate) struct WidthContext<'a> {
    pub fragment: MajorFragmentId,
    pub is_query_root: bool,
    pub stats: &'a FragmentStats,
    /// Width the fragment must adopt from an already-sized neighbor across a
    /// width-paired exchange.
    pub paired_width: Option<u32>,
    /// Endpoints a hard affinity restricts the fragment to. `None` means the
    /// full active set is usable.
    pub eligible_count: Option<usize>,
    pub active_count: usize,
    /// What is left of the global ceiling, with one slot reserved for every
    /// fragment not yet sized.
    pub global_remaining: u32,
}

/// Pick the degree of parallelism for one fragment.
pub(crate) fn decide_width(
    ctx: &WidthContext<'_>,
    options: &PlannerOptions,
) -> Result<u32, PlanSetupError> {
    if ctx.is_query_root {
        if ctx.global_remaining < 1 {
            return Err(PlanSetupError::WidthUnsatisfiable {
                fragment: ctx.fragment,
                min_width: 1,
                ceiling: ctx.global_remaining,
            });
        }
        return Ok(1);
    }

    let mut floor = ctx.stats.min_width.max(1);
    let mut ceiling = ctx.stats.max_width;
    if let Some(paired) = ctx.paired_width {
        floor = floor.max(paired);
        ceiling = ceiling.min(paired);
    }

    let node_count = ctx.eligible_count.unwrap_or(ctx.active_count) as u32;
    ceiling = ceiling.min(options.max_width_per_node.saturating_mul(node_count));
    ceiling = ceiling.min(options.max_global_width);
    ceiling = ceiling.min(ctx.global_remaining);
    if let Some(eligible) = ctx.eligible_count {
        if eligible > 0 {
            ceiling = ceiling.min(eligible as u32);
        }
    }

    if floor > ceiling {
        return Err(PlanSetupError::WidthUnsatisfiable {
            fragment: ctx.fragment,
            min_width: floor,
            ceiling,
        });
    }

    let slice_target = options.slice_target.max(1) as f64;
    let cost_width = (ctx.stats.cost / slice_target).ceil();
    let width = if cost_width >= ceiling as f64 {
        ceiling
    } else {
        (cost_width.max(0.0) as u32).clamp(floor, ceiling)
    };
    Ok(width)
}
