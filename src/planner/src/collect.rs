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

use auger_common::plan::{OperatorBody, OperatorNode};
use auger_common::work_unit::Collector;

use crate::planning_set::PlanningSet;

/// Produce one [`Collector`] per receiver operator in the materialized
/// subtree, carrying the sending major fragment's full assignment.
pub(crate) fn collect_receivers(root: &OperatorNode, set: &PlanningSet) -> Vec<Collector> {
    let mut collectors = vec![];
    root.visit(&mut |node| {
        if let OperatorBody::Receiver(receiver) = &node.body {
            let incoming_minor_fragments = set
                .wrapper_for(receiver.sender_major_id)
                .map(|w| w.minor_endpoints())
                .unwrap_or_default();
            collectors.push(Collector {
                opposite_major_id: receiver.sender_major_id,
                spooling: receiver.spooling,
                supports_out_of_order: receiver.supports_out_of_order,
                incoming_minor_fragments,
            });
        }
    });
    collectors
}
