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

use auger_common::plan::{DistributionAffinity, EndpointAffinity, Fragment, OperatorBody};
use auger_common::Endpoint;
use indexmap::IndexMap;

use crate::node_map::ExecutionNodeMap;

/// What one walk over a fragment's operator tree tells the parallelizer.
#[derive(Clone, Debug, Default)]
pub struct FragmentStats {
    /// Summed operator cost; drives the cost-proportional width.
    pub cost: f64,
    /// Largest declared minimum across operators.
    pub min_width: u32,
    /// Smallest declared maximum across operators. A scan declares its split
    /// count; the query root declares 1.
    pub max_width: u32,
    /// Per-endpoint weights summed across operators, projected onto the
    /// active set, in active-set order.
    pub affinities: IndexMap<Endpoint, f64>,
    /// Strongest tag across operators.
    pub distribution_affinity: DistributionAffinity,
    /// Endpoints mandated by hard-affinity operators, before projection, in
    /// first-mention order without duplicates.
    pub hard_pinned: Vec<Endpoint>,
}

impl FragmentStats {
    pub fn affinity_weight(&self, endpoint: &Endpoint) -> f64 {
        self.affinities.get(endpoint).copied().unwrap_or(0.0)
    }
}

/// Walk the fragment's operator tree once and fold every operator's
/// contribution into a [`FragmentStats`].
pub(crate) fn collect(fragment: &Fragment, node_map: &ExecutionNodeMap) -> FragmentStats {
    let mut cost = 0.0;
    let mut min_width = 1u32;
    let mut max_width = u32::MAX;
    let mut raw_affinities: Vec<EndpointAffinity> = vec![];
    let mut distribution_affinity = DistributionAffinity::None;
    let mut hard_pinned: Vec<Endpoint> = vec![];

    fragment.root.visit(&mut |node| match &node.body {
        OperatorBody::Root => {
            max_width = max_width.min(1);
        }
        OperatorBody::Sender(_) | OperatorBody::Receiver(_) => {}
        OperatorBody::Scan(scan) => {
            let mut preferred = false;
            for split in &scan.splits {
                cost += split.size_bytes as f64;
                let weight = if split.size_bytes > 0 {
                    split.size_bytes as f64
                } else {
                    1.0
                };
                for endpoint in &split.preferred_endpoints {
                    preferred = true;
                    raw_affinities.push(EndpointAffinity {
                        endpoint: endpoint.clone(),
                        weight,
                    });
                }
            }
            max_width = max_width.min((scan.splits.len() as u32).max(1));
            if preferred {
                distribution_affinity = distribution_affinity.max(DistributionAffinity::Soft);
            }
        }
        OperatorBody::Compute(compute) => {
            cost += compute.cost;
            if let Some(declared_min) = compute.min_width {
                min_width = min_width.max(declared_min);
            }
            if let Some(declared_max) = compute.max_width {
                max_width = max_width.min(declared_max);
            }
            if !compute.affinities.is_empty() {
                distribution_affinity = distribution_affinity.max(compute.distribution_affinity);
                raw_affinities.extend(compute.affinities.iter().cloned());
                if compute.distribution_affinity == DistributionAffinity::Hard {
                    for affinity in &compute.affinities {
                        if !hard_pinned.contains(&affinity.endpoint) {
                            hard_pinned.push(affinity.endpoint.clone());
                        }
                    }
                }
            }
        }
    });

    let affinities = node_map.project_affinities(&raw_affinities);
    let dropped = raw_affinities
        .iter()
        .filter(|a| !node_map.is_active(&a.endpoint))
        .count();
    if dropped > 0 {
        tracing::debug!(
            fragment = fragment.major_id,
            dropped,
            "dropped affinity entries for inactive endpoints"
        );
    }

    FragmentStats {
        cost,
        min_width,
        max_width,
        affinities,
        distribution_affinity,
        hard_pinned,
    }
}
