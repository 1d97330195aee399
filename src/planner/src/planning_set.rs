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

//! Per-fragment planning state. Wrappers live in a slab indexed by
//! [`WrapperId`]; the dependency lists hold slab ids, never references, so
//! the graph may be arbitrarily shaped without ownership cycles.

use auger_common::plan::{
    FragmentTree, MajorFragmentId, MinorEndpoint, ParallelizationDependency,
};
use auger_common::Endpoint;
use indexmap::IndexMap;

use crate::error::PlanSetupError;
use crate::split_assignment::SplitSets;
use crate::stats::FragmentStats;

pub type WrapperId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WrapperState {
    New,
    StatsCollected,
    Sized,
    Assigned,
}

/// Mutable planning state of one fragment. The state machine only moves
/// forward: `New → StatsCollected → Sized → Assigned`.
#[derive(Debug)]
pub struct Wrapper {
    major_id: MajorFragmentId,
    pub(crate) dependencies: Vec<WrapperId>,
    stats: Option<FragmentStats>,
    width: Option<u32>,
    assigned: Vec<Endpoint>,
    pub(crate) split_sets: SplitSets,
    initial_allocation: u64,
    max_allocation: u64,
    state: WrapperState,
}

impl Wrapper {
    fn new(major_id: MajorFragmentId) -> Self {
        Self {
            major_id,
            dependencies: vec![],
            stats: None,
            width: None,
            assigned: vec![],
            split_sets: SplitSets::default(),
            initial_allocation: 0,
            max_allocation: 0,
            state: WrapperState::New,
        }
    }

    pub fn major_id(&self) -> MajorFragmentId {
        self.major_id
    }

    pub fn state(&self) -> WrapperState {
        self.state
    }

    pub fn stats(&self) -> Option<&FragmentStats> {
        self.stats.as_ref()
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    /// One endpoint per minor fragment, indexed by minor id.
    pub fn assigned_endpoints(&self) -> &[Endpoint] {
        &self.assigned
    }

    pub fn dependencies(&self) -> &[WrapperId] {
        &self.dependencies
    }

    /// The assignment as `(endpoint, minor id)` pairs, the shape senders,
    /// receivers and collectors are wired with.
    pub fn minor_endpoints(&self) -> Vec<MinorEndpoint> {
        self.assigned
            .iter()
            .cloned()
            .enumerate()
            .map(|(minor_id, endpoint)| MinorEndpoint {
                endpoint,
                minor_id: minor_id as u32,
            })
            .collect()
    }

    pub fn initial_allocation(&self) -> u64 {
        self.initial_allocation
    }

    pub fn max_allocation(&self) -> u64 {
        self.max_allocation
    }

    pub(crate) fn stats_unchecked(&self) -> &FragmentStats {
        self.stats.as_ref().unwrap()
    }

    pub(crate) fn width_unchecked(&self) -> u32 {
        self.width.unwrap()
    }

    pub(crate) fn collect_stats(&mut self, stats: FragmentStats) {
        assert_eq!(self.state, WrapperState::New);
        self.stats = Some(stats);
        self.state = WrapperState::StatsCollected;
    }

    pub(crate) fn freeze_width(&mut self, width: u32) {
        assert_eq!(self.state, WrapperState::StatsCollected);
        assert!(width >= 1);
        self.width = Some(width);
        self.state = WrapperState::Sized;
    }

    pub(crate) fn assign_endpoints(&mut self, assigned: Vec<Endpoint>) {
        assert_eq!(self.state, WrapperState::Sized);
        assert_eq!(assigned.len(), self.width_unchecked() as usize);
        self.assigned = assigned;
        self.state = WrapperState::Assigned;
    }

    pub(crate) fn reset_allocations(&mut self) {
        self.initial_allocation = 0;
        self.max_allocation = 0;
    }

    pub(crate) fn add_allocation(&mut self, initial: u64, max: u64) {
        self.initial_allocation = self.initial_allocation.saturating_add(initial);
        self.max_allocation = self.max_allocation.saturating_add(max);
    }
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    New,
    InProgress,
    Done,
}

/// The `Fragment → Wrapper` mapping, iterable in first-encounter order.
/// Wrappers are created lazily on first lookup during ingest.
#[derive(Debug, Default)]
pub struct PlanningSet {
    wrappers: Vec<Wrapper>,
    by_major: IndexMap<MajorFragmentId, WrapperId>,
    sizing_order: Vec<MajorFragmentId>,
}

impl PlanningSet {
    /// Walk the fragment tree depth-first from the root, allocating one
    /// wrapper per reachable fragment.
    pub fn ingest(tree: &FragmentTree) -> Result<Self, PlanSetupError> {
        let mut set = Self::default();
        let mut visit = vec![VisitState::New; tree.len()];
        set.ingest_fragment(tree, tree.root_id(), &mut visit)?;
        Ok(set)
    }

    fn ingest_fragment(
        &mut self,
        tree: &FragmentTree,
        major_id: MajorFragmentId,
        visit: &mut [VisitState],
    ) -> Result<(), PlanSetupError> {
        match visit[major_id as usize] {
            VisitState::InProgress => {
                return Err(PlanSetupError::Cycle { fragment: major_id });
            }
            VisitState::Done => return Ok(()),
            VisitState::New => {}
        }
        visit[major_id as usize] = VisitState::InProgress;
        self.get_or_create(major_id);
        for pair in &tree.fragment(major_id).receiving_exchanges {
            self.ingest_fragment(tree, pair.neighbor, visit)?;
        }
        visit[major_id as usize] = VisitState::Done;
        Ok(())
    }

    fn get_or_create(&mut self, major_id: MajorFragmentId) -> WrapperId {
        if let Some(&id) = self.by_major.get(&major_id) {
            return id;
        }
        let id = self.wrappers.len();
        self.wrappers.push(Wrapper::new(major_id));
        self.by_major.insert(major_id, id);
        id
    }

    /// Convert exchange dependency tags into wrapper dependency edges.
    pub(crate) fn build_dependencies(
        &mut self,
        tree: &FragmentTree,
    ) -> Result<(), PlanSetupError> {
        let majors: Vec<_> = self.by_major.keys().copied().collect();
        for major_id in majors {
            let fragment = tree.fragment(major_id);
            let Some(pair) = &fragment.sending_exchange else {
                continue;
            };
            if pair.neighbor == major_id {
                return Err(PlanSetupError::Cycle { fragment: major_id });
            }
            let sender = self.by_major[&major_id];
            let receiver = self.by_major[&pair.neighbor];
            match pair.exchange.dependency {
                Some(ParallelizationDependency::ReceiverDependsOnSender) => {
                    self.wrappers[receiver].dependencies.push(sender);
                }
                Some(ParallelizationDependency::SenderDependsOnReceiver) => {
                    self.wrappers[sender].dependencies.push(receiver);
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Wrappers nothing depends on.
    pub fn roots(&self) -> Vec<WrapperId> {
        let mut depended = vec![false; self.wrappers.len()];
        for wrapper in &self.wrappers {
            for &dep in &wrapper.dependencies {
                depended[dep] = true;
            }
        }
        self.iter_ids().filter(|&id| !depended[id]).collect()
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    pub fn wrapper(&self, id: WrapperId) -> &Wrapper {
        &self.wrappers[id]
    }

    pub(crate) fn wrapper_mut(&mut self, id: WrapperId) -> &mut Wrapper {
        &mut self.wrappers[id]
    }

    pub fn wrapper_id_of(&self, major_id: MajorFragmentId) -> WrapperId {
        self.by_major[&major_id]
    }

    pub fn wrapper_for(&self, major_id: MajorFragmentId) -> Option<&Wrapper> {
        self.by_major.get(&major_id).map(|&id| &self.wrappers[id])
    }

    /// Wrapper ids in first-encounter order.
    pub fn iter_ids(&self) -> impl Iterator<Item = WrapperId> + '_ {
        self.by_major.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Wrapper> {
        self.by_major.values().map(|&id| &self.wrappers[id])
    }

    pub(crate) fn record_sized(&mut self, major_id: MajorFragmentId) {
        self.sizing_order.push(major_id);
    }

    /// Major ids in the order their widths were frozen.
    pub fn sizing_order(&self) -> &[MajorFragmentId] {
        &self.sizing_order
    }
}
