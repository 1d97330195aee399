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

use auger_common::plan::MajorFragmentId;
use auger_common::Endpoint;
use thiserror::Error;

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Failures raised while turning the fragment tree into sized, assigned
/// wrappers and serialized work units. Each carries the originating
/// fragment's major id.
#[derive(Error, Debug)]
pub enum PlanSetupError {
    #[error("fragment {fragment}: cycle in the fragment dependency graph")]
    Cycle { fragment: MajorFragmentId },

    #[error(
        "fragment {fragment}: width constraints are unsatisfiable (needs at least {min_width}, at most {ceiling} available)"
    )]
    WidthUnsatisfiable {
        fragment: MajorFragmentId,
        min_width: u32,
        ceiling: u32,
    },

    #[error("fragment {fragment}: endpoint {endpoint} is pinned but not in the active set")]
    UnavailablePinnedEndpoint {
        fragment: MajorFragmentId,
        endpoint: Endpoint,
    },

    #[error(
        "fragment {fragment}: materialized tree is headed by a {kind} operator, which cannot root a plan fragment"
    )]
    RootTypeMismatch {
        fragment: MajorFragmentId,
        kind: &'static str,
    },

    #[error("fragment {fragment}: failed to serialize plan")]
    Serialization {
        fragment: MajorFragmentId,
        #[source]
        source: anyhow::Error,
    },
}

/// Policy violations discovered at emission time.
#[derive(Error, Debug)]
pub enum ForemanSetupError {
    #[error("root fragment must run with a single minor fragment, got width {width}")]
    RootWidth { width: u32 },
}

/// A parallelization parameter outside its declared range, rejected before
/// any planning work starts.
#[derive(Error, Debug)]
#[error("invalid configuration `{name}`: {message}")]
pub struct InvalidConfigError {
    pub name: &'static str,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error(transparent)]
    PlanSetup(#[from] PlanSetupError),

    #[error(transparent)]
    ForemanSetup(#[from] ForemanSetupError),

    #[error(transparent)]
    InvalidConfig(#[from] InvalidConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_fragment() {
        let err = PlanSetupError::WidthUnsatisfiable {
            fragment: 3,
            min_width: 8,
            ceiling: 4,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("fragment 3"));
        assert!(rendered.contains('8'));
        assert!(rendered.contains('4'));
    }

    #[test]
    fn test_transparent_union_preserves_message() {
        let inner = ForemanSetupError::RootWidth { width: 2 };
        let message = inner.to_string();
        let outer: PlannerError = inner.into();
        assert_eq!(outer.to_string(), message);
    }
}
