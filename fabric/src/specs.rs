// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The elements of a topology graph: nodes, links and the graph itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

mod link;
pub use link::{Endpoint, Link};
mod node;
pub use node::{Node, NodeKind};
mod system;
pub use system::TopologyGraph;

/// Free-form component parameters, as the execution engine consumes them.
///
/// A BTreeMap keeps the serialized order stable across builds.
pub type Attributes = BTreeMap<String, String>;

/// Link latency in picoseconds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Latency(pub u64);

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ps", self.0)
    }
}
