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

//! interface for nodes in a topology

use super::Attributes;
use crate::address::AddressRange;
use crate::NetworkAddress;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Core,
    InstructionCache,
    DataCache,
    SharedCache,
    Bus,
    Router,
    DirectoryController,
    MemoryController,
}

impl NodeKind {
    /// The engine component type instantiated for this kind of node.
    pub fn component_type(&self) -> &'static str {
        match self {
            Self::Core => "macsimComponent.macsimComponent",
            Self::InstructionCache | Self::DataCache | Self::SharedCache => "memHierarchy.Cache",
            Self::Bus => "memHierarchy.Bus",
            Self::Router => "merlin.hr_router",
            Self::DirectoryController => "memHierarchy.DirectoryController",
            Self::MemoryController => "memHierarchy.MemController",
        }
    }

    /// Fabric-attached nodes are the only ones holding a network address.
    pub fn is_fabric_attached(&self) -> bool {
        matches!(self, Self::SharedCache | Self::DirectoryController)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let name = match self {
            Self::Core => "core",
            Self::InstructionCache => "instruction-cache",
            Self::DataCache => "data-cache",
            Self::SharedCache => "shared-cache",
            Self::Bus => "bus",
            Self::Router => "router",
            Self::DirectoryController => "directory-controller",
            Self::MemoryController => "memory-controller",
        };
        write!(f, "{}", name)
    }
}

/// A named component of the simulated system.
///
/// The structural properties the builder reasons about (network address,
/// radix, owned address range) are typed fields. Everything else is carried
/// as opaque attributes and only merged into a flat map by [`Node::params`]
/// when the graph is serialized.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    name: String,
    kind: NodeKind,
    network_address: Option<NetworkAddress>,
    radix: Option<usize>,
    address_range: Option<AddressRange>,
    attributes: Attributes,
}

impl Node {
    pub fn new<S: Into<String>>(name: S, kind: NodeKind, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            kind,
            network_address: None,
            radix: None,
            address_range: None,
            attributes,
        }
    }

    /// A router with `radix` ports.
    pub fn router<S: Into<String>>(name: S, radix: usize, attributes: Attributes) -> Self {
        Self::new(name, NodeKind::Router, attributes).with_radix(radix)
    }

    pub fn with_network_address(mut self, address: NetworkAddress) -> Self {
        self.network_address = Some(address);
        self
    }

    /// Bound the indexed ports of this node (router or bus).
    pub fn with_radix(mut self, radix: usize) -> Self {
        self.radix = Some(radix);
        self
    }

    pub fn with_address_range(mut self, range: AddressRange) -> Self {
        self.address_range = Some(range);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn network_address(&self) -> Option<NetworkAddress> {
        self.network_address
    }

    pub fn radix(&self) -> Option<usize> {
        self.radix
    }

    pub fn address_range(&self) -> Option<&AddressRange> {
        self.address_range.as_ref()
    }

    /// The complete parameter map handed to the execution engine.
    pub fn params(&self) -> Attributes {
        let mut params = self.attributes.clone();
        if let Some(address) = self.network_address {
            params.insert("network_address".into(), address.to_string());
        }
        if let (NodeKind::Router, Some(radix)) = (self.kind, self.radix) {
            params.insert("num_ports".into(), radix.to_string());
        }
        if let Some(range) = &self.address_range {
            params.insert("addr_range_start".into(), range.start.to_string());
            params.insert("addr_range_end".into(), range.end.to_string());
            params.insert("interleave_size".into(), format!("{}B", range.interleave_size));
            params.insert("interleave_step".into(), format!("{}B", range.interleave_step));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_merge() {
        let mut attrs = Attributes::new();
        attrs.insert("cache_size".into(), "1MB".into());
        let node = Node::new("s0_dss0_l2", NodeKind::SharedCache, attrs).with_network_address(7);
        let params = node.params();
        assert_eq!(params["cache_size"], "1MB");
        assert_eq!(params["network_address"], "7");
        assert!(!params.contains_key("num_ports"));
        assert!(node.kind().is_fabric_attached());
    }

    #[test]
    fn test_router_params() {
        let node = Node::router("rtr", 32, Attributes::new());
        assert_eq!(node.params()["num_ports"], "32");
        assert_eq!(node.radix(), Some(32));
        assert!(!node.kind().is_fabric_attached());
        assert_eq!(node.kind().to_string(), "router");
        assert_eq!(node.kind().component_type(), "merlin.hr_router");
    }

    #[test]
    fn test_bus_radix_not_a_param() {
        let bus = Node::new("s0_dss0_bus", NodeKind::Bus, Attributes::new()).with_radix(4);
        assert_eq!(bus.radix(), Some(4));
        assert!(bus.params().is_empty());
    }
}
