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

use super::{BuildContext, TopologyKind, TopologyStrategy};
use crate::specs::Endpoint;
use crate::{radix_for, Error, NetworkAddress, PortLabel, SizingConfig};
use petgraph::graph::NodeIndex;

/// A ring with one router per fabric-attached node.
///
/// Router `i` reaches `i + 1` through its port 0, landing on port 1 of the
/// neighbor; the node with network address `i` sits on port 2 of router `i`.
pub(crate) struct RingTopology {
    size: usize,
    radix: usize,
    routers: Vec<NodeIndex>,
}

impl RingTopology {
    pub fn new(config: &SizingConfig) -> Result<Self, Error> {
        let size = config
            .slices
            .checked_mul(config.local_ports())
            .ok_or(Error::TooLarge("ring size"))?;
        Ok(Self {
            size,
            radix: radix_for(TopologyKind::Ring, 1, &[size], &[1])?,
            routers: Vec::new(),
        })
    }
}

impl TopologyStrategy for RingTopology {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Ring
    }

    fn radix(&self) -> usize {
        self.radix
    }

    fn wire_routers(&mut self, ctx: &mut BuildContext<'_>) -> Result<(), Error> {
        let mut attrs = ctx.router_attributes("merlin.torus");
        attrs.insert("torus:shape".into(), self.size.to_string());
        attrs.insert("torus:width".into(), "1".into());
        attrs.insert("torus:local_ports".into(), "1".into());

        for i in 0..self.size {
            let mut router_attrs = attrs.clone();
            router_attrs.insert("id".into(), i.to_string());
            let router = ctx.add_router(format!("rtr.{}", i), self.radix, router_attrs)?;
            self.routers.push(router);
        }

        // ports 0 and 1 of every router face its neighbors
        let mut ring_ports = Vec::with_capacity(self.size);
        for &r in self.routers.iter() {
            let positive = ctx.claim_port(r);
            let negative = ctx.claim_port(r);
            ring_ports.push((positive, negative));
        }
        for i in 0..self.size {
            let next = (i + 1) % self.size;
            ctx.link(format!("rtr_pos_{}", i), ring_ports[i].0, ring_ports[next].1)?;
        }
        Ok(())
    }

    fn attach(
        &mut self,
        ctx: &mut BuildContext<'_>,
        _tile: usize,
        address: NetworkAddress,
    ) -> Result<Endpoint, Error> {
        let router = *self
            .routers
            .get(address)
            .ok_or(Error::MissingRouter(address))?;
        let end = ctx.claim_port(router);
        debug_assert_eq!(end.port, PortLabel::router(2));
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topologies::{build, tests::check_invariants};

    fn ring_of_12() -> SizingConfig {
        SizingConfig {
            slices: 4,
            cores_per_tile: 1,
            caches_per_tile: 1,
            memory_controllers_per_tile: 1,
            l3_nodes_per_tile: 1,
            memory_capacity_bytes: 1 << 20,
            topology_kind: TopologyKind::Ring,
            ..Default::default()
        }
    }

    #[test]
    fn test_ring_neighbors() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = ring_of_12();
        let graph = build(&config, TopologyKind::Ring).unwrap();
        check_invariants(&graph, &config);
        assert_eq!(graph.routers().len(), 12);
        assert_eq!(graph.link_count(), 12 + 4 * (4 + 2 + 1 + 2));

        let first = graph.node_index("rtr.0").unwrap();
        let last = graph.node_index("rtr.11").unwrap();
        // negative neighbor of router 0 is router 11
        assert_eq!(
            graph.peer(first, PortLabel::router(1)),
            Some(Endpoint::new(last, PortLabel::router(0)))
        );
        // positive neighbor of router 11 is router 0
        assert_eq!(
            graph.peer(last, PortLabel::router(0)),
            Some(Endpoint::new(first, PortLabel::router(1)))
        );
        assert_eq!(graph.link_by_name("rtr_pos_11").unwrap().left().node, last);
    }

    #[test]
    fn test_one_attachment_per_router() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = ring_of_12();
        let graph = build(&config, TopologyKind::Ring).unwrap();
        for (address, node) in graph.network_addresses() {
            let router = graph.node_index(&format!("rtr.{}", address)).unwrap();
            let end = graph.peer(router, PortLabel::router(2)).unwrap();
            assert_eq!(graph.node(end.node).name(), node.name());
        }
        for r in graph.routers() {
            assert_eq!(graph.used_ports(r).len(), 3);
            assert_eq!(graph.node(r).params()["num_ports"], "3");
            assert_eq!(graph.node(r).params()["torus:shape"], "12");
        }
    }
}
