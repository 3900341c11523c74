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

//! Topology builders.
//!
//! A build walks through three phases: the strategy for the requested
//! topology creates and wires its routers, then every tile is attached to
//! the fabric in a fixed order (see [`tile`]), and finally the address
//! invariants are checked. All counters live in a [`BuildContext`] owned by
//! the build, so independent builds never share state.

use crate::address::{AddressRange, NetworkAddressAllocator};
use crate::specs::{Attributes, Endpoint, Node, TopologyGraph};
use crate::{Error, NetworkAddress, PortAllocator, PortLabel, SizingConfig};
use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

mod crossbar;
mod mesh;
mod ring;
mod tile;

pub use mesh::MeshShape;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    Mesh,
    Ring,
    #[serde(alias = "xbar")]
    Crossbar,
}

impl Default for TopologyKind {
    fn default() -> Self {
        Self::Mesh
    }
}

impl FromStr for TopologyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mesh" => Ok(Self::Mesh),
            "ring" => Ok(Self::Ring),
            "crossbar" | "xbar" => Ok(Self::Crossbar),
            _ => Err(Error::UnknownTopology(s.to_string())),
        }
    }
}

impl std::fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let name = match self {
            Self::Mesh => "mesh",
            Self::Ring => "ring",
            Self::Crossbar => "crossbar",
        };
        write!(f, "{}", name)
    }
}

/// return the linear index of the element in a multi-dimensional grid
/// The element is represented as a vector of coordinates in `dims`; dims[0]
/// varies fastest.
pub fn linearize_index(elem: &[usize], dims: &[usize]) -> usize {
    elem.iter()
        .enumerate()
        .map(|(d, c)| c * dims[0..d].iter().product::<usize>())
        .sum()
}

/// given a linear index of the element, return the vector of coordinates in a
/// multi-dimensional grid of `dims` dimensions.
pub fn delinearize_index(index: usize, dims: &[usize]) -> Vec<usize> {
    let mut idx = index;
    let mut elem = vec![0; dims.len()];
    for d in (0..dims.len()).rev() {
        let prod = dims[0..d].iter().product::<usize>();
        elem[d] = idx / prod;
        idx -= elem[d] * prod;
    }
    elem
}

/// Per-build mutable state.
pub(crate) struct BuildContext<'a> {
    pub config: &'a SizingConfig,
    pub graph: TopologyGraph,
    pub ports: PortAllocator,
    pub addresses: NetworkAddressAllocator,
    pub ranges: Vec<AddressRange>,
    pub next_memory_controller: usize,
}

impl<'a> BuildContext<'a> {
    fn new(config: &'a SizingConfig, kind: TopologyKind, ranges: Vec<AddressRange>) -> Self {
        Self {
            config,
            graph: TopologyGraph::new(kind),
            ports: PortAllocator::new(),
            addresses: NetworkAddressAllocator::new(),
            ranges,
            next_memory_controller: 0,
        }
    }

    /// parameters shared by all routers, tagged with the engine topology
    pub fn router_attributes(&self, topology: &str) -> Attributes {
        let mut attrs = self.config.components.router_params();
        attrs.insert("topology".into(), topology.into());
        attrs
    }

    pub fn add_router(
        &mut self,
        name: String,
        radix: usize,
        attributes: Attributes,
    ) -> Result<NodeIndex, Error> {
        log::debug!("router {} radix {}", name, radix);
        self.graph.add_node(Node::router(name, radix, attributes))
    }

    /// claim the next free indexed port of a router
    pub fn claim_port(&mut self, router: NodeIndex) -> Endpoint {
        Endpoint::new(router, PortLabel::router(self.ports.next(router)))
    }

    /// link two endpoints with the configured link latency
    pub fn link<S: Into<String>>(
        &mut self,
        name: S,
        left: Endpoint,
        right: Endpoint,
    ) -> Result<EdgeIndex, Error> {
        self.graph.connect(name, left, right, self.config.link_latency)
    }

    fn finish(self) -> Result<TopologyGraph, Error> {
        self.graph.check_addresses(self.addresses.assigned())?;
        log::info!(
            "built {} topology: {} nodes, {} links, {} network addresses",
            self.graph.kind(),
            self.graph.node_count(),
            self.graph.link_count(),
            self.addresses.assigned()
        );
        Ok(self.graph)
    }
}

/// The topology-specific part of a build.
pub(crate) trait TopologyStrategy {
    fn kind(&self) -> TopologyKind;

    /// the radix of every router the strategy creates
    fn radix(&self) -> usize;

    /// create the routers and the links between them
    fn wire_routers(&mut self, ctx: &mut BuildContext<'_>) -> Result<(), Error>;

    /// the router endpoint for a fabric-attached node of `tile`
    fn attach(
        &mut self,
        ctx: &mut BuildContext<'_>,
        tile: usize,
        address: NetworkAddress,
    ) -> Result<Endpoint, Error>;
}

/// Validates the geometry of `kind` against the configuration.
fn strategy_for(
    config: &SizingConfig,
    kind: TopologyKind,
) -> Result<Box<dyn TopologyStrategy>, Error> {
    Ok(match kind {
        TopologyKind::Mesh => Box::new(mesh::MeshTopology::new(config)?),
        TopologyKind::Ring => Box::new(ring::RingTopology::new(config)?),
        TopologyKind::Crossbar => Box::new(crossbar::CrossbarTopology::new(config)?),
    })
}

/// Build the topology graph of `kind` for the system described by `config`.
///
/// Configuration errors are reported before any node is created; a
/// partially wired graph is never returned.
pub fn build(config: &SizingConfig, kind: TopologyKind) -> Result<TopologyGraph, Error> {
    config.validate()?;
    let mut strategy = strategy_for(config, kind)?;
    let ranges = config.partitioner()?.ranges();
    log::info!(
        "building {} topology: {} slices, {} cores, {} memory controllers, radix {}",
        kind,
        config.slices,
        config.num_cores(),
        config.num_memory_controllers(),
        strategy.radix()
    );

    let mut ctx = BuildContext::new(config, strategy.kind(), ranges);
    strategy.wire_routers(&mut ctx)?;
    tile::attach_tiles(&mut ctx, strategy.as_mut())?;
    ctx.finish()
}

/// Same as [`build`], with the topology given by name.
pub fn build_named(config: &SizingConfig, kind: &str) -> Result<TopologyGraph, Error> {
    build(config, kind.parse()?)
}
