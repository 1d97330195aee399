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

//! Per-minor materialization: rewrite the fragment's operator tree so every
//! operator whose shape depends on the containing minor (senders, receivers,
//! scans) carries its concrete wiring, and accumulate the minor's memory
//! reservation along the way.

use auger_common::plan::{
    ExchangeId, ExchangePair, Fragment, MinorFragmentId, OperatorBody, OperatorNode, ReceiverOp,
    ScanOp, SenderOp,
};

use crate::error::PlanSetupError;
use crate::planning_set::PlanningSet;
use crate::split_assignment::SplitSets;

pub(crate) const OPERATOR_INITIAL_ALLOCATION: u64 = 1 << 20;
pub(crate) const BUFFERED_OPERATOR_MAX_ALLOCATION: u64 = 2 << 30;

#[derive(Default)]
struct Allocations {
    initial: u64,
    max: u64,
}

impl Allocations {
    fn add(&mut self, initial: u64, max: u64) {
        self.initial = self.initial.saturating_add(initial);
        self.max = self.max.saturating_add(max);
    }
}

pub(crate) struct Materialized {
    pub root: OperatorNode,
    pub initial_allocation: u64,
    pub max_allocation: u64,
}

pub(crate) fn materialize_fragment(
    fragment: &Fragment,
    minor_id: MinorFragmentId,
    set: &PlanningSet,
    split_sets: &SplitSets,
) -> Result<Materialized, PlanSetupError> {
    let mut allocations = Allocations::default();
    let root = rewrite(&fragment.root, fragment, minor_id, set, split_sets, &mut allocations);
    if !root.body.is_fragment_root() {
        return Err(PlanSetupError::RootTypeMismatch {
            fragment: fragment.major_id,
            kind: root.body.kind(),
        });
    }
    Ok(Materialized {
        root,
        initial_allocation: allocations.initial,
        max_allocation: allocations.max,
    })
}

fn rewrite(
    node: &OperatorNode,
    fragment: &Fragment,
    minor_id: MinorFragmentId,
    set: &PlanningSet,
    split_sets: &SplitSets,
    allocations: &mut Allocations,
) -> OperatorNode {
    let body = match &node.body {
        OperatorBody::Root => {
            allocations.add(OPERATOR_INITIAL_ALLOCATION, OPERATOR_INITIAL_ALLOCATION);
            OperatorBody::Root
        }
        OperatorBody::Sender(sender) => {
            allocations.add(OPERATOR_INITIAL_ALLOCATION, OPERATOR_INITIAL_ALLOCATION);
            let mut destinations = set
                .wrapper_for(sender.receiver_major_id)
                .map(|w| w.minor_endpoints())
                .unwrap_or_default();
            if width_paired(fragment.sending_exchange.iter(), sender.exchange_id) {
                destinations.retain(|destination| destination.minor_id == minor_id);
            }
            OperatorBody::Sender(SenderOp {
                exchange_id: sender.exchange_id,
                receiver_major_id: sender.receiver_major_id,
                destinations,
            })
        }
        OperatorBody::Receiver(receiver) => {
            allocations.add(OPERATOR_INITIAL_ALLOCATION, OPERATOR_INITIAL_ALLOCATION);
            let mut sources = set
                .wrapper_for(receiver.sender_major_id)
                .map(|w| w.minor_endpoints())
                .unwrap_or_default();
            if width_paired(fragment.receiving_exchanges.iter(), receiver.exchange_id) {
                sources.retain(|source| source.minor_id == minor_id);
            }
            OperatorBody::Receiver(ReceiverOp {
                exchange_id: receiver.exchange_id,
                sender_major_id: receiver.sender_major_id,
                spooling: receiver.spooling,
                supports_out_of_order: receiver.supports_out_of_order,
                sources,
            })
        }
        OperatorBody::Scan(scan) => {
            allocations.add(OPERATOR_INITIAL_ALLOCATION, OPERATOR_INITIAL_ALLOCATION);
            let assigned = &split_sets[&node.id][minor_id as usize];
            OperatorBody::Scan(ScanOp {
                table: scan.table.clone(),
                splits: scan
                    .splits
                    .iter()
                    .filter(|split| assigned.contains(&split.id))
                    .cloned()
                    .collect(),
            })
        }
        OperatorBody::Compute(compute) => {
            let max = if compute.buffered {
                BUFFERED_OPERATOR_MAX_ALLOCATION
            } else {
                OPERATOR_INITIAL_ALLOCATION
            };
            allocations.add(OPERATOR_INITIAL_ALLOCATION, max);
            OperatorBody::Compute(compute.clone())
        }
    };

    let children = node
        .children
        .iter()
        .map(|child| rewrite(child, fragment, minor_id, set, split_sets, allocations))
        .collect();

    OperatorNode {
        id: node.id,
        body,
        children,
    }
}

fn width_paired<'a>(
    mut pairs: impl Iterator<Item = &'a ExchangePair>,
    exchange_id: ExchangeId,
) -> bool {
    pairs.any(|pair| pair.exchange.id == exchange_id && pair.exchange.width_paired)
}
