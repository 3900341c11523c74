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

//! interface for link properties

use super::Latency;
use crate::PortLabel;
use petgraph::graph::NodeIndex;

/// One end of a link: a node and the port on that node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Endpoint {
    pub node: NodeIndex,
    pub port: PortLabel,
}

impl Endpoint {
    pub fn new(node: NodeIndex, port: PortLabel) -> Self {
        Self { node, port }
    }
}

/// A named link between two endpoints.
///
/// Links are bidirectional for the engine; `left` and `right` only record
/// the order in which the builder created them.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    name: String,
    left: Endpoint,
    right: Endpoint,
    latency: Latency,
}

impl Link {
    pub fn new<S: Into<String>>(
        name: S,
        left: Endpoint,
        right: Endpoint,
        latency: Latency,
    ) -> Self {
        Self {
            name: name.into(),
            left,
            right,
            latency,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// return the pair of (left, right) endpoints
    pub fn endpoints(&self) -> (Endpoint, Endpoint) {
        (self.left, self.right)
    }

    pub fn left(&self) -> Endpoint {
        self.left
    }

    pub fn right(&self) -> Endpoint {
        self.right
    }

    pub fn latency(&self) -> Latency {
        self.latency
    }

    /// The endpoint facing `end`, if `end` is one of the link's endpoints.
    pub fn opposite(&self, end: &Endpoint) -> Option<Endpoint> {
        if self.left == *end {
            Some(self.right)
        } else if self.right == *end {
            Some(self.left)
        } else {
            None
        }
    }
}
