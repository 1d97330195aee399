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

use auger_common::codec::FragmentCodec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::InvalidConfigError;

/// The parallelization parameters. Validated eagerly on entry; every field
/// has a declared range.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerOptions {
    /// Cost quantum of the width formula: `width ≈ cost / slice_target`.
    pub slice_target: u64,
    /// Upper bound of minor fragments per endpoint, per fragment.
    pub max_width_per_node: u32,
    /// Upper bound of minor fragments across the whole query.
    pub max_global_width: u32,
    /// Weight of affinity versus uniform spread in balanced assignment,
    /// in `[0, 1]`.
    pub affinity_factor: f64,
    /// Selects the balanced assignment policy over legacy round-robin.
    pub use_balanced_assignment: bool,
    /// Cap multiplier on per-endpoint load in balanced mode, `>= 1.0`.
    pub balance_factor: f64,
    pub codec: FragmentCodec,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            slice_target: 1,
            max_width_per_node: 8,
            max_global_width: 1000,
            affinity_factor: 0.5,
            use_balanced_assignment: false,
            balance_factor: 1.25,
            codec: FragmentCodec::None,
        }
    }
}

impl PlannerOptions {
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        fn reject(name: &'static str, message: impl Into<String>) -> InvalidConfigError {
            InvalidConfigError {
                name,
                message: message.into(),
            }
        }

        if self.slice_target < 1 {
            return Err(reject("slice_target", "must be at least 1"));
        }
        if self.max_width_per_node < 1 {
            return Err(reject("max_width_per_node", "must be at least 1"));
        }
        if self.max_global_width < 1 {
            return Err(reject("max_global_width", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.affinity_factor) {
            return Err(reject(
                "affinity_factor",
                format!("must be within [0, 1], got {}", self.affinity_factor),
            ));
        }
        if !self.balance_factor.is_finite() || self.balance_factor < 1.0 {
            return Err(reject(
                "balance_factor",
                format!("must be at least 1.0, got {}", self.balance_factor),
            ));
        }
        Ok(())
    }
}

/// Derive the per-node width ceiling from the average executor core count
/// and a load-shedding multiplier in `(0, 1]`. Both inputs are plain numbers
/// so tests can inject fixed values instead of reading live cluster stats.
pub fn max_width_per_node_from_cores(average_executor_cores: u32, max_width_factor: f64) -> u32 {
    let scaled = (average_executor_cores as f64 * max_width_factor).ceil();
    (scaled as u32).max(1)
}

/// Session options serialized alongside every emitted fragment, opaque to
/// the parallelizer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub entries: IndexMap<String, String>,
}

impl SessionOptions {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

/// Who is running the query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user: String,
    /// Opaque credential blob forwarded to executors, never inspected here.
    pub credentials: Option<String>,
}

/// Query-level context stamped onto every emitted fragment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContextInfo {
    pub priority: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        PlannerOptions::default().validate().unwrap();
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut options = PlannerOptions {
            slice_target: 0,
            ..Default::default()
        };
        assert_eq!(options.validate().unwrap_err().name, "slice_target");

        options = PlannerOptions {
            affinity_factor: 1.5,
            ..Default::default()
        };
        assert_eq!(options.validate().unwrap_err().name, "affinity_factor");

        options = PlannerOptions {
            balance_factor: 0.9,
            ..Default::default()
        };
        assert_eq!(options.validate().unwrap_err().name, "balance_factor");

        options = PlannerOptions {
            max_global_width: 0,
            ..Default::default()
        };
        assert_eq!(options.validate().unwrap_err().name, "max_global_width");
    }

    #[test]
    fn test_width_per_node_derivation() {
        assert_eq!(max_width_per_node_from_cores(16, 1.0), 16);
        assert_eq!(max_width_per_node_from_cores(16, 0.5), 8);
        assert_eq!(max_width_per_node_from_cores(10, 0.75), 8);
        // The multiplier never drives the ceiling to zero.
        assert_eq!(max_width_per_node_from_cores(1, 0.1), 1);
    }

    #[test]
    fn test_session_options_keep_insertion_order() {
        let mut options = SessionOptions::default();
        options.set("planner.slice_target", "100000");
        options.set("exec.codec", "snappy");
        let keys: Vec<_> = options.entries.keys().cloned().collect();
        assert_eq!(keys, ["planner.slice_target", "exec.codec"]);
        assert_eq!(options.get("exec.codec"), Some("snappy"));
    }
}
