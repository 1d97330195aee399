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

//! Minor-fragment to endpoint assignment. Two interchangeable policies share
//! one seam: `(width, stats, candidates, options) → Vec<Endpoint>`. Both are
//! pure functions of their inputs; given the same candidate order they
//! produce the same assignment every run.

use std::cmp::{Ordering, Reverse};

use auger_common::plan::{DistributionAffinity, MajorFragmentId};
use auger_common::Endpoint;
use itertools::Itertools;

use crate::error::PlanSetupError;
use crate::node_map::ExecutionNodeMap;
use crate::options::PlannerOptions;
use crate::stats::FragmentStats;

/// Resolve the endpoints a hard affinity restricts the fragment to, in
/// active-set order. Any pinned endpoint missing from the active set fails
/// the whole call.
pub(crate) fn hard_eligible_endpoints(
    fragment: MajorFragmentId,
    stats: &FragmentStats,
    node_map: &ExecutionNodeMap,
) -> Result<Vec<Endpoint>, PlanSetupError> {
    for pinned in &stats.hard_pinned {
        if !node_map.is_active(pinned) {
            return Err(PlanSetupError::UnavailablePinnedEndpoint {
                fragment,
                endpoint: pinned.clone(),
            });
        }
    }
    Ok(node_map
        .endpoints()
        .filter(|endpoint| stats.hard_pinned.contains(endpoint))
        .cloned()
        .collect())
}

pub(crate) trait AssignmentPolicy {
    fn assign(
        &self,
        width: u32,
        stats: &FragmentStats,
        candidates: &[Endpoint],
        options: &PlannerOptions,
    ) -> Vec<Endpoint>;
}

pub(crate) fn policy_for(options: &PlannerOptions) -> &'static dyn AssignmentPolicy {
    if options.use_balanced_assignment {
        &BalancedAssigner
    } else {
        &RoundRobinAssigner
    }
}

fn per_node_cap(width: u32, stats: &FragmentStats, candidates: &[Endpoint], cap: u32) -> u32 {
    // A hard pin to a single endpoint may exceed the per-node ceiling.
    if stats.distribution_affinity == DistributionAffinity::Hard && candidates.len() == 1 {
        width.max(cap)
    } else {
        cap
    }
}

/// Round-robin over the candidates ranked by descending affinity weight,
/// ties keeping candidate order. Endpoints at the per-node cap are skipped.
pub(crate) struct RoundRobinAssigner;

impl AssignmentPolicy for RoundRobinAssigner {
    fn assign(
        &self,
        width: u32,
        stats: &FragmentStats,
        candidates: &[Endpoint],
        options: &PlannerOptions,
    ) -> Vec<Endpoint> {
        let mut ranked = candidates.to_vec();
        ranked.sort_by(|a, b| {
            stats
                .affinity_weight(b)
                .partial_cmp(&stats.affinity_weight(a))
                .unwrap_or(Ordering::Equal)
        });

        let cap = per_node_cap(width, stats, candidates, options.max_width_per_node);
        let mut counts = vec![0u32; ranked.len()];
        let mut assigned = Vec::with_capacity(width as usize);
        let mut cursor = 0;
        while (assigned.len() as u32) < width {
            let mut scanned = 0;
            loop {
                assert!(scanned <= ranked.len(), "per-node capacity exhausted");
                let index = cursor % ranked.len();
                cursor += 1;
                scanned += 1;
                if counts[index] < cap {
                    counts[index] += 1;
                    assigned.push(ranked[index].clone());
                    break;
                }
            }
        }
        assigned
    }
}

/// Affinity-weighted target counts with a balance-factor cap on the load of
/// any single endpoint.
pub(crate) struct BalancedAssigner;

impl AssignmentPolicy for BalancedAssigner {
    fn assign(
        &self,
        width: u32,
        stats: &FragmentStats,
        candidates: &[Endpoint],
        options: &PlannerOptions,
    ) -> Vec<Endpoint> {
        let n = candidates.len();
        let uniform = 1.0 / n as f64;
        let total: f64 = candidates.iter().map(|e| stats.affinity_weight(e)).sum();
        let factor = options.affinity_factor;

        let raw = candidates
            .iter()
            .map(|endpoint| {
                let share = if total > 0.0 {
                    stats.affinity_weight(endpoint) / total
                } else {
                    uniform
                };
                width as f64 * (factor * share + (1.0 - factor) * uniform)
            })
            .collect_vec();
        let mut targets = raw.iter().map(|r| r.round() as u32).collect_vec();

        // Rounding can leave the totals off by a few; fix up on the largest
        // (respectively smallest) fractional remainders, earliest wins ties.
        let remainder = |i: usize| raw[i] - raw[i].floor();
        let mut sum: u32 = targets.iter().sum();
        while sum < width {
            let i = (0..n)
                .max_by(|&a, &b| {
                    (remainder(a), Reverse(a))
                        .partial_cmp(&(remainder(b), Reverse(b)))
                        .unwrap_or(Ordering::Equal)
                })
                .unwrap();
            targets[i] += 1;
            sum += 1;
        }
        while sum > width {
            let i = (0..n)
                .filter(|&i| targets[i] > 0)
                .min_by(|&a, &b| {
                    (remainder(a), a)
                        .partial_cmp(&(remainder(b), b))
                        .unwrap_or(Ordering::Equal)
                })
                .unwrap();
            targets[i] -= 1;
            sum -= 1;
        }

        let mean = width as f64 / n as f64;
        let balance_cap = ((mean * options.balance_factor).ceil() as u32).max(1);
        let cap = per_node_cap(
            width,
            stats,
            candidates,
            balance_cap.min(options.max_width_per_node),
        );

        let mut excess = 0;
        for target in &mut targets {
            if *target > cap {
                excess += *target - cap;
                *target = cap;
            }
        }
        while excess > 0 {
            let i = (0..n)
                .filter(|&i| targets[i] < cap)
                .min_by_key(|&i| (targets[i], i))
                .expect("per-node capacity exhausted");
            targets[i] += 1;
            excess -= 1;
        }

        let mut assigned = Vec::with_capacity(width as usize);
        let mut remaining = targets;
        while (assigned.len() as u32) < width {
            for i in 0..n {
                if remaining[i] > 0 {
                    remaining[i] -= 1;
                    assigned.push(candidates[i].clone());
                }
            }
        }
        assigned.truncate(width as usize);
        assigned
    }
}
