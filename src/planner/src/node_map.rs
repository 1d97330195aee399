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

use auger_common::plan::EndpointAffinity;
use auger_common::Endpoint;
use indexmap::{IndexMap, IndexSet};

/// Immutable lookup over the endpoints that may host minor fragments,
/// built once per query from the active endpoint collection.
///
/// Raw affinity maps may reference endpoints that have since left the
/// cluster (catalog metadata outlives membership); projection drops those.
#[derive(Debug, Default)]
pub struct ExecutionNodeMap {
    active: IndexSet<Endpoint>,
}

impl ExecutionNodeMap {
    pub fn new(active: impl IntoIterator<Item = Endpoint>) -> Self {
        Self {
            active: active.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_active(&self, endpoint: &Endpoint) -> bool {
        self.active.contains(endpoint)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Project raw per-operator affinities onto the active set, summing
    /// weights per endpoint. The result iterates in active-set order.
    pub fn project_affinities(&self, raw: &[EndpointAffinity]) -> IndexMap<Endpoint, f64> {
        let mut projected = IndexMap::new();
        for endpoint in &self.active {
            let weight: f64 = raw
                .iter()
                .filter(|affinity| &affinity.endpoint == endpoint)
                .map(|affinity| affinity.weight)
                .sum();
            if weight > 0.0 {
                projected.insert(endpoint.clone(), weight);
            }
        }
        projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(name: &str) -> Endpoint {
        Endpoint::new(name, 4317)
    }

    #[test]
    fn test_membership_and_order() {
        let map = ExecutionNodeMap::new([ep("e2"), ep("e1"), ep("e2")]);
        assert_eq!(map.len(), 2);
        assert!(map.is_active(&ep("e1")));
        assert!(!map.is_active(&ep("e9")));
        let order: Vec<_> = map.endpoints().cloned().collect();
        assert_eq!(order, [ep("e2"), ep("e1")]);
    }

    #[test]
    fn test_projection_drops_inactive_and_sums() {
        let map = ExecutionNodeMap::new([ep("e1"), ep("e2")]);
        let raw = vec![
            EndpointAffinity {
                endpoint: ep("e2"),
                weight: 2.0,
            },
            EndpointAffinity {
                endpoint: ep("e9"),
                weight: 100.0,
            },
            EndpointAffinity {
                endpoint: ep("e2"),
                weight: 3.0,
            },
            EndpointAffinity {
                endpoint: ep("e1"),
                weight: 1.0,
            },
        ];
        let projected = map.project_affinities(&raw);
        let entries: Vec<_> = projected.iter().map(|(e, w)| (e.clone(), *w)).collect();
        assert_eq!(entries, [(ep("e1"), 1.0), (ep("e2"), 5.0)]);
    }

    #[test]
    fn test_empty_map_projects_nothing() {
        let map = ExecutionNodeMap::empty();
        let raw = vec![EndpointAffinity {
            endpoint: ep("e1"),
            weight: 1.0,
        }];
        assert!(map.project_affinities(&raw).is_empty());
    }
}
