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

//! The records the planner emits for dispatch: one [`PlanFragment`] per
//! (major fragment, minor id) pair.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::FragmentCodec;
use crate::endpoint::Endpoint;
use crate::plan::{MajorFragmentId, MinorEndpoint, MinorFragmentId};

/// Query identity, unique across the cluster.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct QueryId {
    pub id: Uuid,
}

impl QueryId {
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.id.as_bytes()
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryId:{}", self.id)
    }
}

/// Identity of one minor fragment within one query.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FragmentHandle {
    pub query_id: QueryId,
    pub major_id: MajorFragmentId,
    pub minor_id: MinorFragmentId,
}

/// Tells the executor which incoming minor fragments one receiver operator
/// should expect, and from where.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collector {
    pub opposite_major_id: MajorFragmentId,
    pub spooling: bool,
    pub supports_out_of_order: bool,
    pub incoming_minor_fragments: Vec<MinorEndpoint>,
}

/// One dispatchable unit of work. `fragment_bytes` and `options_bytes` are
/// opaque under `codec`; the receiving executor decodes them with the codec
/// tag carried here.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanFragment {
    pub handle: FragmentHandle,
    pub foreman: Endpoint,
    pub assigned_endpoint: Endpoint,
    pub mem_initial: u64,
    pub mem_max: u64,
    pub fragment_bytes: Bytes,
    pub options_bytes: Bytes,
    pub credentials: Option<String>,
    pub collectors: Vec<Collector>,
    pub leaf: bool,
    pub priority: i32,
    pub codec: FragmentCodec,
}
