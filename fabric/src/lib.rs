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

//! Structural description of tiled many-core memory systems.
//!
//! Given a [`SizingConfig`] and a [`TopologyKind`], [`build`] produces a
//! [`TopologyGraph`]: every core, private and shared cache, bus, directory
//! controller, memory controller and router of the system, wired together
//! with named links on explicit ports. The graph is what an execution
//! engine instantiates; it carries no timing behavior of its own.
//!
//! ```no_run
//! use fabric::{build, SizingConfig, TopologyDescription, TopologyKind};
//!
//! let config = SizingConfig::default();
//! let graph = build(&config, TopologyKind::Ring).expect("valid config");
//! let description = TopologyDescription::new(&graph, &config.program);
//! println!("{}", description.to_json().unwrap());
//! ```

mod address;
mod config;
mod description;
mod error;
mod ports;
pub mod specs;
mod stats;
mod topologies;

/// Address of a component on the interconnect fabric.
pub type NetworkAddress = usize;

pub use crate::address::{owner_of, partition, AddressPartitioner, AddressRange};
pub use crate::address::NetworkAddressAllocator;
pub use crate::config::{
    CacheConfiguration, ComponentConfiguration, DirectoryConfiguration, MemoryConfiguration,
    ProcessorConfiguration, ProgramOptions, RouterConfiguration, SizingConfig,
};
pub use crate::description::{EndpointRecord, LinkRecord, NodeRecord, TopologyDescription};
pub use crate::error::Error;
pub use crate::ports::{radix_for, PortAllocator, PortLabel};
pub use crate::specs::{Attributes, Endpoint, Latency, Link, Node, NodeKind, TopologyGraph};
pub use crate::stats::{StatisticsConfiguration, StatisticsPlan};
pub use crate::topologies::{
    build, build_named, delinearize_index, linearize_index, MeshShape, TopologyKind,
};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
