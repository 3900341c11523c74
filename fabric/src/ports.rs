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

use crate::{Error, TopologyKind};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Index of a router port: `port0`, `port1`, ...
pub const ROUTER_PORT: &str = "port";
/// Index of a bus port facing the private caches: `high_network_0`, ...
pub const BUS_HIGH_PORT: &str = "high_network_";

/// Ports are named the way the engine names them.
///
/// Routers and buses have indexed ports handed out by a [`PortAllocator`];
/// all other components have a handful of fixed, named ports.
#[derive(Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Copy, Debug)]
pub enum PortLabel {
    Array(&'static str, usize),
    Name(&'static str),
}

impl PortLabel {
    pub fn router(index: usize) -> Self {
        Self::Array(ROUTER_PORT, index)
    }

    /// index for array ports, None for named ports.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Array(_, index) => Some(*index),
            Self::Name(_) => None,
        }
    }
}

impl From<&'static str> for PortLabel {
    fn from(name: &'static str) -> Self {
        Self::Name(name)
    }
}

impl From<(&'static str, usize)> for PortLabel {
    fn from(pair: (&'static str, usize)) -> Self {
        Self::Array(pair.0, pair.1)
    }
}

impl std::fmt::Display for PortLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match &self {
            Self::Array(name, index) => write!(f, "{}{}", name, index),
            Self::Name(name) => name.fmt(f),
        }
    }
}

/// a map to remember the last port assigned for each router or bus.
///
/// Ports are handed out in the order components attach, starting at 0 and
/// independently for every node. Each build owns its own allocator.
#[derive(Debug, Default)]
pub struct PortAllocator {
    map: HashMap<NodeIndex, usize>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// return the next available port
    pub fn next(&mut self, node_id: NodeIndex) -> usize {
        let value = self.map.entry(node_id).or_insert(0);
        let port = *value;
        *value += 1;
        port
    }
}

/// The minimum router radix for a topology.
///
/// - mesh: the local ports plus one port per unit of width in each
///   direction of each dimension.
/// - ring: two ring ports plus one local port.
/// - crossbar: the single router takes every attachment of every tile;
///   `dims` holds the number of tiles.
pub fn radix_for(
    kind: TopologyKind,
    local_ports: usize,
    dims: &[usize],
    widths: &[usize],
) -> Result<usize, Error> {
    let radix = match kind {
        TopologyKind::Mesh => widths
            .iter()
            .try_fold(0usize, |acc, &w| acc.checked_add(w))
            .and_then(|sum| sum.checked_mul(2))
            .and_then(|ports| ports.checked_add(local_ports)),
        TopologyKind::Ring => Some(3),
        TopologyKind::Crossbar => dims
            .iter()
            .try_fold(local_ports, |acc, &d| acc.checked_mul(d)),
    };
    radix.ok_or(Error::TooLarge("router radix"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::node_index;

    #[test]
    fn test_allocator_is_per_node() {
        let mut alloc = PortAllocator::new();
        let (a, b) = (node_index(0), node_index(1));
        assert_eq!(alloc.next(a), 0);
        assert_eq!(alloc.next(a), 1);
        assert_eq!(alloc.next(b), 0);
        assert_eq!(alloc.next(a), 2);
        assert_eq!(alloc.next(node_index(7)), 0);
        assert_eq!(alloc.next(b), 1);
    }

    #[test]
    fn test_radix() {
        // 2 L2s + 1 L3 + 1 directory per tile on a 4x2 mesh of width 1x1
        assert_eq!(radix_for(TopologyKind::Mesh, 4, &[4, 2], &[1, 1]), Ok(8));
        assert_eq!(radix_for(TopologyKind::Mesh, 4, &[4, 2], &[2, 1]), Ok(10));
        assert_eq!(radix_for(TopologyKind::Ring, 4, &[32], &[1]), Ok(3));
        assert_eq!(
            radix_for(TopologyKind::Crossbar, 2 + 1 + 1, &[8], &[]),
            Ok(32)
        );
    }

    #[test]
    fn test_radix_too_large() {
        let too_large = Err(Error::TooLarge("router radix"));
        assert_eq!(
            radix_for(TopologyKind::Mesh, 4, &[2, 2], &[usize::MAX / 2, 1]),
            too_large
        );
        assert_eq!(
            radix_for(TopologyKind::Mesh, usize::MAX, &[2], &[1]),
            too_large
        );
        assert_eq!(
            radix_for(TopologyKind::Crossbar, 4, &[usize::MAX / 2], &[]),
            too_large
        );
        assert_eq!(
            radix_for(TopologyKind::Ring, usize::MAX, &[usize::MAX], &[1]),
            Ok(3)
        );
    }

    #[test]
    fn test_port_labels() {
        assert_eq!(PortLabel::router(3).to_string(), "port3");
        assert_eq!(PortLabel::from((BUS_HIGH_PORT, 1)).to_string(), "high_network_1");
        assert_eq!(PortLabel::from("cache").to_string(), "cache");
        assert_eq!(PortLabel::from("cache").index(), None);
        assert_eq!(PortLabel::router(5).index(), Some(5));
    }
}
