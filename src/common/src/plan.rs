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

//! The physical plan handed to the parallelizer: an arena of fragments
//! connected by exchanges, each fragment owning an immutable operator tree.

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;

pub type MajorFragmentId = u32;
pub type MinorFragmentId = u32;
pub type OperatorId = u32;
pub type ExchangeId = u32;
pub type SplitId = u64;

/// One node of a fragment's operator tree.
///
/// The same type describes both the planner input and the materialized
/// per-minor output; materialization rewrites the bodies whose shape depends
/// on the containing minor fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatorNode {
    pub id: OperatorId,
    pub body: OperatorBody,
    pub children: Vec<OperatorNode>,
}

impl OperatorNode {
    pub fn new(id: OperatorId, body: OperatorBody, children: Vec<OperatorNode>) -> Self {
        Self { id, body, children }
    }

    /// Pre-order walk over the subtree.
    pub fn visit(&self, f: &mut impl FnMut(&OperatorNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum OperatorBody {
    /// The query root (screen). Only the root fragment carries one.
    Root,
    Sender(SenderOp),
    Receiver(ReceiverOp),
    Scan(ScanOp),
    Compute(ComputeOp),
}

impl OperatorBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Sender(_) => "sender",
            Self::Receiver(_) => "receiver",
            Self::Scan(_) => "scan",
            Self::Compute(_) => "compute",
        }
    }

    /// Whether this operator may head a materialized plan fragment.
    pub fn is_fragment_root(&self) -> bool {
        matches!(self, Self::Root | Self::Sender(_))
    }
}

/// Sending half of an exchange. Always the root operator of its fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SenderOp {
    pub exchange_id: ExchangeId,
    pub receiver_major_id: MajorFragmentId,
    /// Receiving minor fragments, filled in by materialization.
    pub destinations: Vec<MinorEndpoint>,
}

/// Receiving half of an exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiverOp {
    pub exchange_id: ExchangeId,
    pub sender_major_id: MajorFragmentId,
    pub spooling: bool,
    pub supports_out_of_order: bool,
    /// Sending minor fragments, filled in by materialization.
    pub sources: Vec<MinorEndpoint>,
}

/// Table scan leaf. The planner input carries every split of the table;
/// materialization narrows the list to the splits assigned to one minor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanOp {
    pub table: String,
    pub splits: Vec<Split>,
}

/// A unit of scannable work with its locality hints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub id: SplitId,
    pub size_bytes: u64,
    pub preferred_endpoints: Vec<Endpoint>,
}

/// Interior operator. Carries everything the parallelizer reads off an
/// operator that is neither an exchange half nor a scan: its cost, declared
/// width bounds, endpoint affinities, and whether it buffers input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputeOp {
    pub name: String,
    pub cost: f64,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub affinities: Vec<EndpointAffinity>,
    pub distribution_affinity: DistributionAffinity,
    pub buffered: bool,
}

impl ComputeOp {
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self {
            name: name.into(),
            cost,
            min_width: None,
            max_width: None,
            affinities: vec![],
            distribution_affinity: DistributionAffinity::None,
            buffered: false,
        }
    }
}

/// A numeric placement preference for one endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndpointAffinity {
    pub endpoint: Endpoint,
    pub weight: f64,
}

/// Strength of a placement preference. The ordering is meaningful: the
/// strongest tag across a fragment's operators wins.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash,
)]
pub enum DistributionAffinity {
    #[default]
    None,
    Soft,
    Hard,
}

/// A concrete (endpoint, minor id) pair, as wired into materialized senders,
/// receivers, and collectors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinorEndpoint {
    pub endpoint: Endpoint,
    pub minor_id: MinorFragmentId,
}

/// Which side of an exchange must be sized first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParallelizationDependency {
    ReceiverDependsOnSender,
    SenderDependsOnReceiver,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDescriptor {
    pub id: ExchangeId,
    pub dependency: Option<ParallelizationDependency>,
    /// The dependent side adopts the already-sized side's width, and minors
    /// are paired one to one at materialization.
    pub width_paired: bool,
}

impl ExchangeDescriptor {
    pub fn new(id: ExchangeId) -> Self {
        Self {
            id,
            dependency: None,
            width_paired: false,
        }
    }

    pub fn with_dependency(mut self, dependency: ParallelizationDependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn width_paired(mut self) -> Self {
        self.width_paired = true;
        self
    }
}

/// A directed edge `(exchange, neighbor fragment)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangePair {
    pub exchange: ExchangeDescriptor,
    pub neighbor: MajorFragmentId,
}

/// One fragment of the physical plan, executed as a unit at a single degree
/// of parallelism.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub major_id: MajorFragmentId,
    pub root: OperatorNode,
    /// `None` iff this is the query root.
    pub sending_exchange: Option<ExchangePair>,
    /// Empty iff this is a leaf.
    pub receiving_exchanges: Vec<ExchangePair>,
}

/// Arena of fragments keyed by major id. Major ids are dense: fragment `i`
/// lives at index `i`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragmentTree {
    fragments: Vec<Fragment>,
    root: MajorFragmentId,
}

impl FragmentTree {
    pub fn root_id(&self) -> MajorFragmentId {
        self.root
    }

    pub fn root(&self) -> &Fragment {
        self.fragment(self.root)
    }

    pub fn fragment(&self, id: MajorFragmentId) -> &Fragment {
        &self.fragments[id as usize]
    }

    pub fn get(&self, id: MajorFragmentId) -> Option<&Fragment> {
        self.fragments.get(id as usize)
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Builds a [`FragmentTree`], allocating dense major ids and wiring both
/// sides of each exchange.
#[derive(Debug, Default)]
pub struct FragmentTreeBuilder {
    fragments: Vec<Fragment>,
}

impl FragmentTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fragment(&mut self, root: OperatorNode) -> MajorFragmentId {
        let major_id = self.fragments.len() as MajorFragmentId;
        self.fragments.push(Fragment {
            major_id,
            root,
            sending_exchange: None,
            receiving_exchanges: vec![],
        });
        major_id
    }

    /// Connect `sender` to `receiver` through `exchange`. A fragment sends
    /// through at most one exchange.
    pub fn connect(
        &mut self,
        exchange: ExchangeDescriptor,
        sender: MajorFragmentId,
        receiver: MajorFragmentId,
    ) {
        let sending = &mut self.fragments[sender as usize].sending_exchange;
        assert!(
            sending.is_none(),
            "fragment {sender} already has a sending exchange"
        );
        *sending = Some(ExchangePair {
            exchange: exchange.clone(),
            neighbor: receiver,
        });
        self.fragments[receiver as usize]
            .receiving_exchanges
            .push(ExchangePair {
                exchange,
                neighbor: sender,
            });
    }

    pub fn build(self, root: MajorFragmentId) -> FragmentTree {
        assert!((root as usize) < self.fragments.len());
        FragmentTree {
            fragments: self.fragments,
            root,
        }
    }
}
