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
use crate::{radix_for, Error, NetworkAddress, SizingConfig};
use petgraph::graph::NodeIndex;

/// A single router with one port per fabric-attached node.
///
/// Attachments take the next free port in build order.
/// <pre>
///  l2 l2 l3 dc  l2 l2 l3 dc ...
///   \  \  |  |   |  |  /  /
///   +----------rtr---------+
/// </pre>
pub(crate) struct CrossbarTopology {
    radix: usize,
    router: Option<NodeIndex>,
}

impl CrossbarTopology {
    pub fn new(config: &SizingConfig) -> Result<Self, Error> {
        let radix = radix_for(
            TopologyKind::Crossbar,
            config.local_ports(),
            &[config.slices],
            &[],
        )?;
        Ok(Self {
            radix,
            router: None,
        })
    }
}

impl TopologyStrategy for CrossbarTopology {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Crossbar
    }

    fn radix(&self) -> usize {
        self.radix
    }

    fn wire_routers(&mut self, ctx: &mut BuildContext<'_>) -> Result<(), Error> {
        let mut attrs = ctx.router_attributes("merlin.singlerouter");
        attrs.insert("num_vns".into(), "1".into());
        attrs.insert("id".into(), "0".into());
        self.router = Some(ctx.add_router("rtr".into(), self.radix, attrs)?);
        Ok(())
    }

    fn attach(
        &mut self,
        ctx: &mut BuildContext<'_>,
        _tile: usize,
        _address: NetworkAddress,
    ) -> Result<Endpoint, Error> {
        let router = self.router.ok_or(Error::MissingRouter(0))?;
        Ok(ctx.claim_port(router))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topologies::{build, tests::check_invariants};
    use crate::PortLabel;

    #[test]
    fn test_crossbar_radix() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = SizingConfig::default();
        let graph = build(&config, TopologyKind::Crossbar).unwrap();
        check_invariants(&graph, &config);

        let routers = graph.routers();
        assert_eq!(routers.len(), 1);
        let rtr = routers[0];
        assert_eq!(graph.node(rtr).radix(), Some(32));
        assert_eq!(graph.used_ports(rtr).len(), 32);
        assert_eq!(graph.node(rtr).params()["topology"], "merlin.singlerouter");

        // the last directory controller takes the last port
        let dc = graph.node_index("dc_7").unwrap();
        assert_eq!(
            graph.peer(rtr, PortLabel::router(31)).map(|e| e.node),
            Some(dc)
        );
        // the port number follows the network address
        for (address, node) in graph.network_addresses() {
            let id = graph.node_index(node.name()).unwrap();
            let end = graph
                .links()
                .find(|l| l.left().node == id && l.right().node == rtr)
                .unwrap()
                .right();
            assert_eq!(end.port, PortLabel::router(address));
        }
    }
}
