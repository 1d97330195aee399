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

//! Data model shared between Auger's planner and executor crates: endpoint
//! identities, physical operator trees, fragment graphs, and the work-unit
//! records dispatched to executor nodes.

pub mod codec;
pub mod endpoint;
pub mod plan;
pub mod work_unit;

pub use codec::FragmentCodec;
pub use endpoint::Endpoint;
pub use work_unit::QueryId;
