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

use auger_common::plan::{Fragment, OperatorBody, OperatorId, SplitId};
use auger_common::Endpoint;
use indexmap::IndexMap;

/// Per scan operator: `sets[&op][minor]` lists the split ids that minor
/// fragment reads.
pub(crate) type SplitSets = IndexMap<OperatorId, Vec<Vec<SplitId>>>;

/// Distribute every split of every scan in the fragment across the assigned
/// minors, locality first: a split goes to the least-loaded minor running on
/// one of its preferred endpoints, falling back to the least-loaded minor
/// overall. Ties resolve to the lowest minor id.
pub(crate) fn assign_splits(fragment: &Fragment, assigned: &[Endpoint]) -> SplitSets {
    let width = assigned.len();
    let mut sets = SplitSets::default();
    fragment.root.visit(&mut |node| {
        let OperatorBody::Scan(scan) = &node.body else {
            return;
        };
        let mut buckets: Vec<Vec<SplitId>> = vec![vec![]; width];
        for split in &scan.splits {
            let local = (0..width)
                .filter(|&minor| split.preferred_endpoints.contains(&assigned[minor]))
                .min_by_key(|&minor| (buckets[minor].len(), minor));
            let minor = local.unwrap_or_else(|| {
                (0..width)
                    .min_by_key(|&minor| (buckets[minor].len(), minor))
                    .unwrap()
            });
            buckets[minor].push(split.id);
        }
        sets.insert(node.id, buckets);
    });
    sets
}

#[cfg(test)]
mod tests {
    use auger_common::plan::{OperatorNode, ScanOp, Split};

    use super::*;

    fn ep(name: &str) -> Endpoint {
        Endpoint::new(name, 4317)
    }

    fn split(id: SplitId, preferred: &[&str]) -> Split {
        Split {
            id,
            size_bytes: 128,
            preferred_endpoints: preferred.iter().map(|n| ep(n)).collect(),
        }
    }

    fn scan_fragment(splits: Vec<Split>) -> Fragment {
        Fragment {
            major_id: 0,
            root: OperatorNode::new(
                9,
                OperatorBody::Scan(ScanOp {
                    table: "orders".into(),
                    splits,
                }),
                vec![],
            ),
            sending_exchange: None,
            receiving_exchanges: vec![],
        }
    }

    #[test]
    fn test_locality_wins() {
        let fragment = scan_fragment(vec![
            split(10, &["e2"]),
            split(11, &["e1"]),
            split(12, &["e2"]),
        ]);
        let assigned = [ep("e1"), ep("e2")];
        let sets = assign_splits(&fragment, &assigned);
        assert_eq!(sets[&9], vec![vec![11], vec![10, 12]]);
    }

    #[test]
    fn test_no_preference_balances() {
        let fragment = scan_fragment(vec![
            split(0, &[]),
            split(1, &[]),
            split(2, &[]),
            split(3, &[]),
        ]);
        let assigned = [ep("e1"), ep("e2")];
        let sets = assign_splits(&fragment, &assigned);
        assert_eq!(sets[&9], vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_every_split_assigned_exactly_once() {
        let fragment = scan_fragment(vec![
            split(0, &["e9"]),
            split(1, &["e1", "e2"]),
            split(2, &["e2"]),
            split(3, &[]),
            split(4, &["e1"]),
        ]);
        let assigned = [ep("e1"), ep("e2"), ep("e1")];
        let sets = assign_splits(&fragment, &assigned);
        let mut all: Vec<SplitId> = sets[&9].iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }
}
