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

//! structure of a built system
//!
//! A system is a graph of components connected with links. The graph is
//! populated once by the topology builder and handed out read-only; all
//! mutators are crate private.

use super::{Endpoint, Latency, Link, Node, NodeKind};
use crate::{Error, NetworkAddress, PortLabel, TopologyKind};
use itertools::Itertools;
use petgraph::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug)]
pub struct TopologyGraph {
    kind: TopologyKind,
    topo: Graph<Node, Link, Undirected>,
    names: HashMap<String, NodeIndex>,
    link_names: HashSet<String>,
    used_ports: HashSet<Endpoint>,
    addresses: BTreeMap<NetworkAddress, NodeIndex>,
}

impl TopologyGraph {
    pub(crate) fn new(kind: TopologyKind) -> Self {
        Self {
            kind,
            topo: Graph::new_undirected(),
            names: HashMap::new(),
            link_names: HashSet::new(),
            used_ports: HashSet::new(),
            addresses: BTreeMap::new(),
        }
    }

    /// add a node, registering its name and network address.
    pub(crate) fn add_node(&mut self, node: Node) -> Result<NodeIndex, Error> {
        if self.names.contains_key(node.name()) {
            return Err(Error::DuplicateName(node.name().to_string()));
        }
        if let Some(address) = node.network_address() {
            if self.addresses.contains_key(&address) {
                return Err(Error::DuplicateAddress(address));
            }
        }
        let name = node.name().to_string();
        let address = node.network_address();
        let id = self.topo.add_node(node);
        self.names.insert(name, id);
        if let Some(address) = address {
            self.addresses.insert(address, id);
        }
        Ok(id)
    }

    /// connect two existing endpoints with a named link.
    ///
    /// Every (node, port) pair may be claimed only once, and indexed ports
    /// must stay below the node's radix.
    pub(crate) fn connect<S: Into<String>>(
        &mut self,
        name: S,
        left: Endpoint,
        right: Endpoint,
        latency: Latency,
    ) -> Result<EdgeIndex, Error> {
        let name = name.into();
        if self.link_names.contains(&name) {
            return Err(Error::DuplicateLink(name));
        }
        for end in [left, right].iter() {
            self.check_port(end)?;
        }
        if left == right {
            return Err(self.port_in_use(&left));
        }
        log::trace!(
            "link {}: {}:{} <-> {}:{}",
            name,
            self.topo[left.node].name(),
            left.port,
            self.topo[right.node].name(),
            right.port
        );
        self.used_ports.insert(left);
        self.used_ports.insert(right);
        self.link_names.insert(name.clone());
        Ok(self
            .topo
            .add_edge(left.node, right.node, Link::new(name, left, right, latency)))
    }

    /// the endpoint's node exists, the port is free and within the radix
    fn check_port(&self, end: &Endpoint) -> Result<(), Error> {
        let node = self
            .topo
            .node_weight(end.node)
            .ok_or_else(|| Error::MissingNode(end.node.index()))?;
        if self.used_ports.contains(end) {
            return Err(self.port_in_use(end));
        }
        if let (Some(radix), Some(index)) = (node.radix(), end.port.index()) {
            if index >= radix {
                return Err(Error::PortOverflow {
                    router: node.name().to_string(),
                    port: index,
                    radix,
                });
            }
        }
        Ok(())
    }

    /// only called on endpoints that passed `check_port`
    fn port_in_use(&self, end: &Endpoint) -> Error {
        Error::PortInUse {
            node: self.topo[end.node].name().to_string(),
            port: end.port.to_string(),
        }
    }

    /// Check that network addresses form the range 0..count.
    pub(crate) fn check_addresses(&self, count: usize) -> Result<(), Error> {
        for (expected, address) in self.addresses.keys().enumerate() {
            if *address != expected {
                return Err(Error::AddressGap(expected));
            }
        }
        if self.addresses.len() != count {
            return Err(Error::AddressGap(self.addresses.len()));
        }
        Ok(())
    }

    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn node_count(&self) -> usize {
        self.topo.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.topo.edge_count()
    }

    /// return a reference to the node.
    pub fn node(&self, node_id: NodeIndex) -> &Node {
        &self.topo[node_id]
    }

    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node_index(name).map(|id| &self.topo[id])
    }

    /// node ids in creation order
    pub fn iter_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.topo.node_indices()
    }

    /// nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.topo.node_indices().map(move |n| &self.topo[n])
    }

    /// links in creation order
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.topo.edge_indices().map(move |e| &self.topo[e])
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeIndex> {
        self.iter_nodes()
            .filter(|n| self.topo[*n].kind() == kind)
            .collect()
    }

    pub fn routers(&self) -> Vec<NodeIndex> {
        self.nodes_of_kind(NodeKind::Router)
    }

    /// fabric-attached nodes, ordered by network address
    pub fn network_addresses(&self) -> impl Iterator<Item = (NetworkAddress, &Node)> + '_ {
        self.addresses
            .iter()
            .map(move |(address, id)| (*address, &self.topo[*id]))
    }

    /// the ports of `node_id` that are bound to a link, sorted.
    pub fn used_ports(&self, node_id: NodeIndex) -> Vec<PortLabel> {
        self.topo
            .edges(node_id)
            .flat_map(|e| {
                let (left, right) = e.weight().endpoints();
                vec![left, right]
            })
            .filter(|end| end.node == node_id)
            .map(|end| end.port)
            .sorted()
            .dedup()
            .collect()
    }

    /// The endpoint at the other end of the link bound to (`node_id`, `port`).
    pub fn peer(&self, node_id: NodeIndex, port: PortLabel) -> Option<Endpoint> {
        let end = Endpoint::new(node_id, port);
        self.topo
            .edges(node_id)
            .find_map(|e| e.weight().opposite(&end))
    }

    pub fn link_by_name(&self, name: &str) -> Option<&Link> {
        self.links().find(|l| l.name() == name)
    }
}

/// Topologies are displayed by generating a dot format string.
impl Display for TopologyGraph {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        const INDENT: &str = "  ";
        writeln!(f, "graph \"{}\" {{", self.kind)?;
        for n in self.nodes() {
            writeln!(f, "{}\"{}\" [label=\"{}\\n{}\"]", INDENT, n.name(), n.name(), n.kind())?;
        }
        for l in self.links().sorted_by(|a, b| a.name().cmp(b.name())) {
            let (left, right) = l.endpoints();
            writeln!(
                f,
                "{}\"{}\" -- \"{}\" [label=\"{}\", taillabel=\"{}\", headlabel=\"{}\"]",
                INDENT,
                self.topo[left.node].name(),
                self.topo[right.node].name(),
                l.name(),
                left.port,
                right.port
            )?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attributes;
    use petgraph::graph::node_index;

    fn two_routers() -> (TopologyGraph, NodeIndex, NodeIndex) {
        let mut graph = TopologyGraph::new(TopologyKind::Ring);
        let a = graph
            .add_node(Node::router("rtr.0", 3, Attributes::new()))
            .unwrap();
        let b = graph
            .add_node(Node::router("rtr.1", 3, Attributes::new()))
            .unwrap();
        (graph, a, b)
    }

    #[test]
    fn test_connect_and_query() {
        let (mut graph, a, b) = two_routers();
        graph
            .connect(
                "rtr_pos_0",
                Endpoint::new(a, PortLabel::router(0)),
                Endpoint::new(b, PortLabel::router(1)),
                Latency(50),
            )
            .unwrap();
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.used_ports(a), vec![PortLabel::router(0)]);
        assert_eq!(
            graph.peer(b, PortLabel::router(1)),
            Some(Endpoint::new(a, PortLabel::router(0)))
        );
        assert_eq!(graph.peer(b, PortLabel::router(0)), None);
        assert_eq!(graph.node_by_name("rtr.1").unwrap().name(), "rtr.1");
        let link = graph.link_by_name("rtr_pos_0").unwrap();
        assert_eq!(link.latency(), Latency(50));
        let dot = graph.to_string();
        assert!(dot.starts_with("graph \"ring\" {"));
        assert!(dot.contains("\"rtr.0\" -- \"rtr.1\""));
    }

    #[test]
    fn test_port_claimed_twice() {
        let (mut graph, a, b) = two_routers();
        let left = Endpoint::new(a, PortLabel::router(0));
        graph
            .connect("l0", left, Endpoint::new(b, PortLabel::router(1)), Latency(0))
            .unwrap();
        let err = graph
            .connect("l1", left, Endpoint::new(b, PortLabel::router(2)), Latency(0))
            .unwrap_err();
        assert_eq!(
            err,
            Error::PortInUse {
                node: "rtr.0".into(),
                port: "port0".into()
            }
        );
        assert!(!err.is_config_error());
        // the failed link left nothing behind
        assert_eq!(graph.used_ports(b), vec![PortLabel::router(1)]);
    }

    #[test]
    fn test_radix_overflow() {
        let (mut graph, a, b) = two_routers();
        let err = graph
            .connect(
                "l0",
                Endpoint::new(a, PortLabel::router(3)),
                Endpoint::new(b, PortLabel::router(0)),
                Latency(0),
            )
            .unwrap_err();
        assert_eq!(
            err,
            Error::PortOverflow {
                router: "rtr.0".into(),
                port: 3,
                radix: 3
            }
        );
    }

    #[test]
    fn test_duplicates() {
        let (mut graph, a, b) = two_routers();
        assert_eq!(
            graph.add_node(Node::router("rtr.0", 3, Attributes::new())),
            Err(Error::DuplicateName("rtr.0".into()))
        );
        let l3 = |name: &str| {
            Node::new(name, NodeKind::SharedCache, Attributes::new()).with_network_address(0)
        };
        graph.add_node(l3("l3cache0")).unwrap();
        assert_eq!(
            graph.add_node(l3("l3cache1")),
            Err(Error::DuplicateAddress(0))
        );
        let end = |node, port| Endpoint::new(node, PortLabel::router(port));
        graph
            .connect("x", end(a, 0), end(b, 0), Latency(0))
            .unwrap();
        assert_eq!(
            graph.connect("x", end(a, 1), end(b, 1), Latency(0)),
            Err(Error::DuplicateLink("x".into()))
        );
    }

    #[test]
    fn test_missing_endpoint() {
        let (mut graph, a, _) = two_routers();
        let stray = Endpoint::new(node_index(99), PortLabel::router(0));
        assert_eq!(
            graph.connect("l0", Endpoint::new(a, PortLabel::router(0)), stray, Latency(0)),
            Err(Error::MissingNode(99))
        );
        assert_eq!(
            graph.connect("l1", stray, stray, Latency(0)),
            Err(Error::MissingNode(99))
        );
        // nothing was claimed by the failed links
        assert_eq!(graph.link_count(), 0);
        assert!(graph.used_ports(a).is_empty());
    }

    #[test]
    fn test_address_gaps() {
        let mut graph = TopologyGraph::new(TopologyKind::Crossbar);
        for address in [0, 1, 3].iter() {
            let name = format!("dc_{}", address);
            let node = Node::new(name, NodeKind::DirectoryController, Attributes::new());
            graph
                .add_node(node.with_network_address(*address))
                .unwrap();
        }
        assert_eq!(graph.check_addresses(3), Err(Error::AddressGap(2)));
        assert_eq!(
            graph.network_addresses().map(|(a, _)| a).collect::<Vec<_>>(),
            vec![0, 1, 3]
        );
    }
}
