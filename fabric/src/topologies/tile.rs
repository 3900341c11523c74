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

//! The per-tile subgraph, shared by all topologies.
//!
//! Tiles are visited in order. Within a tile: every private cache group
//! (its cores, L1s, bus and L2), then the L3 blocks, then the memory
//! controllers. Network addresses and router ports are handed out in that
//! exact order.

use super::{BuildContext, TopologyStrategy};
use crate::ports::BUS_HIGH_PORT;
use crate::specs::{Endpoint, Node, NodeKind};
use crate::{Error, PortLabel};

pub(crate) fn attach_tiles(
    ctx: &mut BuildContext<'_>,
    strategy: &mut dyn TopologyStrategy,
) -> Result<(), Error> {
    let config = ctx.config;
    for tile in 0..config.slices {
        log::debug!("attaching tile {}", tile);
        for group in 0..config.caches_per_tile {
            attach_cache_group(ctx, strategy, tile, group)?;
        }
        for block in 0..config.l3_nodes_per_tile {
            attach_l3(ctx, strategy, tile, block)?;
        }
        for _ in 0..config.memory_controllers_per_tile {
            attach_memory_controller(ctx, strategy, tile)?;
        }
    }
    Ok(())
}

/// cores -> L1 instruction/data caches -> bus -> L2 -> router
fn attach_cache_group(
    ctx: &mut BuildContext<'_>,
    strategy: &mut dyn TopologyStrategy,
    tile: usize,
    group: usize,
) -> Result<(), Error> {
    let config = ctx.config;
    let components = &config.components;
    let line_size = config.cache_line_size;
    let cores = config.cores_per_tile;
    let num_cores = config.num_cores();
    let prefix = format!("s{}_dss{}", tile, group);

    let address = ctx.addresses.next();
    let l2 = ctx.graph.add_node(
        Node::new(
            format!("{}_l2", prefix),
            NodeKind::SharedCache,
            components.l2_params(line_size),
        )
        .with_network_address(address),
    )?;
    let bus = ctx.graph.add_node(
        Node::new(format!("{}_bus", prefix), NodeKind::Bus, components.bus_params())
            .with_radix(2 * cores),
    )?;

    for core in 0..cores {
        let core_id = (tile * config.caches_per_tile + group) * cores + core;
        log::debug!("core {} in group {} of tile {}", core_id, group, tile);
        let cpu = ctx.graph.add_node(Node::new(
            format!("core{}", core_id),
            NodeKind::Core,
            components.core_params(core_id, num_cores, config.memory_capacity_bytes),
        ))?;
        let l1i = ctx.graph.add_node(Node::new(
            format!("{}_core{}_l1icache", prefix, core),
            NodeKind::InstructionCache,
            components.l1_params(line_size),
        ))?;
        let l1d = ctx.graph.add_node(Node::new(
            format!("{}_core{}_l1dcache", prefix, core),
            NodeKind::DataCache,
            components.l1_params(line_size),
        ))?;

        ctx.link(
            format!("{}_core{}:l1i", prefix, core),
            Endpoint::new(cpu, "icache".into()),
            Endpoint::new(l1i, "high_network_0".into()),
        )?;
        ctx.link(
            format!("{}_core{}:l1d", prefix, core),
            Endpoint::new(cpu, "dcache".into()),
            Endpoint::new(l1d, "high_network_0".into()),
        )?;
        for (l1, suffix) in [(l1i, "l1i"), (l1d, "l1d")].iter() {
            let port = ctx.ports.next(bus);
            ctx.link(
                format!("{}_core{}_{}:bus", prefix, core, suffix),
                Endpoint::new(*l1, "low_network_0".into()),
                Endpoint::new(bus, PortLabel::Array(BUS_HIGH_PORT, port)),
            )?;
        }
    }

    ctx.link(
        format!("{}_bus:l2", prefix),
        Endpoint::new(bus, "low_network_0".into()),
        Endpoint::new(l2, "high_network_0".into()),
    )?;
    let router = strategy.attach(ctx, tile, address)?;
    ctx.link(
        format!("{}_l2:rtr", prefix),
        Endpoint::new(l2, "cache".into()),
        router,
    )?;
    Ok(())
}

fn attach_l3(
    ctx: &mut BuildContext<'_>,
    strategy: &mut dyn TopologyStrategy,
    tile: usize,
    block: usize,
) -> Result<(), Error> {
    let config = ctx.config;
    let index = tile * config.l3_nodes_per_tile + block;
    let total = config.slices * config.l3_nodes_per_tile;
    log::debug!("L3 block {} in tile {}", index, tile);

    let address = ctx.addresses.next();
    let l3 = ctx.graph.add_node(
        Node::new(
            format!("l3cache{}", index),
            NodeKind::SharedCache,
            config.components.l3_params(config.cache_line_size, index, total),
        )
        .with_network_address(address),
    )?;
    let router = strategy.attach(ctx, tile, address)?;
    ctx.link(
        format!("l3_ring_link_{}", index),
        Endpoint::new(l3, "directory".into()),
        router,
    )?;
    Ok(())
}

/// memory controller -> directory controller -> router
fn attach_memory_controller(
    ctx: &mut BuildContext<'_>,
    strategy: &mut dyn TopologyStrategy,
    tile: usize,
) -> Result<(), Error> {
    let config = ctx.config;
    let id = ctx.next_memory_controller;
    ctx.next_memory_controller += 1;
    let range = ctx
        .ranges
        .get(id)
        .copied()
        .ok_or(Error::MissingAddressRange(id))?;
    let local_size = config.memory_capacity_bytes / config.num_memory_controllers() as u64;
    log::debug!(
        "memory controller {} in tile {}: {:#x}..={:#x}",
        id,
        tile,
        range.start,
        range.end
    );

    let memory = ctx.graph.add_node(Node::new(
        format!("memory_{}", id),
        NodeKind::MemoryController,
        config.components.memory_params(local_size),
    ))?;
    let address = ctx.addresses.next();
    let directory = ctx.graph.add_node(
        Node::new(
            format!("dc_{}", id),
            NodeKind::DirectoryController,
            config.components.directory_params(),
        )
        .with_network_address(address)
        .with_address_range(range),
    )?;

    ctx.link(
        format!("mem_link_{}", id),
        Endpoint::new(memory, "direct_link".into()),
        Endpoint::new(directory, "memory".into()),
    )?;
    let router = strategy.attach(ctx, tile, address)?;
    ctx.link(
        format!("dc_link_{}", id),
        Endpoint::new(directory, "network".into()),
        router,
    )?;
    Ok(())
}
