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

use super::{delinearize_index, linearize_index};
use super::{BuildContext, TopologyKind, TopologyStrategy};
use crate::specs::Endpoint;
use crate::{radix_for, Error, NetworkAddress, PortLabel, SizingConfig};
use itertools::Itertools;
use petgraph::graph::NodeIndex;

/// The extents of a mesh and the number of parallel links per dimension.
///
/// Written as `x`-separated integers, e.g. `4x2` with width `1x1`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MeshShape {
    dims: Vec<usize>,
    widths: Vec<usize>,
}

fn parse_extents(text: &str) -> Result<Vec<usize>, Error> {
    let extents = text
        .split('x')
        .map(|t| t.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::MalformedShape(text.to_string()))?;
    if extents.iter().any(|&e| e == 0) {
        return Err(Error::MalformedShape(text.to_string()));
    }
    Ok(extents)
}

impl MeshShape {
    /// Parse a shape and an optional width; the width defaults to 1 in
    /// every dimension and must have as many tokens as the shape.
    pub fn parse(shape: &str, width: Option<&str>) -> Result<Self, Error> {
        let dims = parse_extents(shape)?;
        let widths = match width {
            Some(width) => {
                let widths = parse_extents(width)?;
                if widths.len() != dims.len() {
                    return Err(Error::MalformedShape(width.to_string()));
                }
                widths
            }
            None => vec![1; dims.len()],
        };
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(Error::TooLarge("mesh shape"))?;
        widths
            .iter()
            .try_fold(0usize, |acc, &w| acc.checked_add(w))
            .and_then(|sum| sum.checked_mul(2))
            .ok_or(Error::TooLarge("mesh width"))?;
        Ok(Self { dims, widths })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    pub fn tiles(&self) -> usize {
        self.dims.iter().product()
    }

    /// the coordinates of tile `index`
    pub fn coordinates(&self, index: usize) -> Result<Vec<usize>, Error> {
        if index >= self.tiles() {
            return Err(Error::TileOutOfRange {
                index,
                tiles: self.tiles(),
            });
        }
        Ok(delinearize_index(index, &self.dims))
    }

    /// the tile at `coords`, None outside of the mesh
    pub fn index(&self, coords: &[usize]) -> Option<usize> {
        let outside = coords.iter().zip(&self.dims).any(|(c, d)| c >= d);
        if coords.len() != self.dims.len() || outside {
            return None;
        }
        Some(linearize_index(coords, &self.dims))
    }

    /// `x`-joined coordinates, as used in router and link names
    pub fn format(coords: &[usize]) -> String {
        coords.iter().join("x")
    }

    /// first port of dimension `dim`; the positive direction comes first
    fn dim_offset(&self, dim: usize) -> usize {
        2 * self.widths[0..dim].iter().sum::<usize>()
    }
}

impl std::fmt::Display for MeshShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", Self::format(&self.dims))
    }
}

/// A N-dimensional mesh with wraparound, one router per tile.
///
/// Each router reserves `width` ports per direction of each dimension in
/// the order [dim0+, dim0-, dim1+, dim1-, ...] and takes its tile's
/// attachments on the ports that follow. Links are created from every
/// router to its positive neighbor, landing on the neighbor's negative
/// ports, so every port of the pair is claimed exactly once. Dimensions of
/// extent 1 keep their reserved ports unconnected.
/// <pre>
/// rtr.0x0 --- rtr.1x0 --- rtr.2x0 --- rtr.3x0 ---+
///    |           |           |           |       | (wraps to rtr.0x0)
/// rtr.0x1 --- rtr.1x1 --- rtr.2x1 --- rtr.3x1 ---+
/// </pre>
pub(crate) struct MeshTopology {
    shape: MeshShape,
    local_ports: usize,
    radix: usize,
    routers: Vec<NodeIndex>,
}

impl MeshTopology {
    pub fn new(config: &SizingConfig) -> Result<Self, Error> {
        let shape = config
            .mesh_shape
            .as_deref()
            .ok_or(Error::MissingMeshShape)?;
        let shape = MeshShape::parse(shape, config.mesh_width.as_deref())?;
        if shape.tiles() != config.slices {
            return Err(Error::ShapeMismatch {
                tiles: shape.tiles(),
                slices: config.slices,
            });
        }
        let local_ports = config.local_ports();
        let radix = radix_for(
            TopologyKind::Mesh,
            local_ports,
            shape.dims(),
            shape.widths(),
        )?;
        Ok(Self {
            shape,
            local_ports,
            radix,
            routers: Vec::new(),
        })
    }
}

impl TopologyStrategy for MeshTopology {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Mesh
    }

    fn radix(&self) -> usize {
        self.radix
    }

    fn wire_routers(&mut self, ctx: &mut BuildContext<'_>) -> Result<(), Error> {
        let radix = self.radix;
        let tiles = self.shape.tiles();
        let mut attrs = ctx.router_attributes("merlin.mesh");
        attrs.insert("mesh:shape".into(), self.shape.to_string());
        attrs.insert("mesh:width".into(), MeshShape::format(self.shape.widths()));
        attrs.insert("mesh:local_ports".into(), self.local_ports.to_string());
        attrs.insert("num_peers".into(), (tiles * self.local_ports).to_string());
        attrs.insert("num_dims".into(), self.shape.num_dims().to_string());
        attrs.insert("num_vns".into(), "2".into());
        attrs.insert("router_radix".into(), radix.to_string());

        for n in 0..tiles {
            let coords = self.shape.coordinates(n)?;
            let mut router_attrs = attrs.clone();
            router_attrs.insert("id".into(), n.to_string());
            let name = format!("rtr.{}", MeshShape::format(&coords));
            let router = ctx.add_router(name, radix, router_attrs)?;
            self.routers.push(router);
        }

        // the dimension ports come first on every router
        let dimension_ports = 2 * self.shape.widths().iter().sum::<usize>();
        let mut reserved = Vec::with_capacity(tiles);
        for &r in self.routers.iter() {
            let ports = (0..dimension_ports)
                .map(|_| ctx.ports.next(r))
                .collect::<Vec<_>>();
            reserved.push(ports);
        }

        for n in 0..tiles {
            let mine = self.shape.coordinates(n)?;
            for (d, &extent) in self.shape.dims().iter().enumerate() {
                if extent == 1 {
                    continue;
                }
                let mut theirs = mine.clone();
                theirs[d] = (mine[d] + 1) % extent;
                let m = self.shape.index(&theirs).ok_or(Error::MissingRouter(n))?;
                let width = self.shape.widths()[d];
                let offset = self.shape.dim_offset(d);
                for num in 0..width {
                    let name = format!(
                        "link.{}:{}:{}",
                        MeshShape::format(&mine),
                        MeshShape::format(&theirs),
                        num
                    );
                    let positive = Endpoint::new(
                        self.routers[n],
                        PortLabel::router(reserved[n][offset + num]),
                    );
                    let negative = Endpoint::new(
                        self.routers[m],
                        PortLabel::router(reserved[m][offset + width + num]),
                    );
                    ctx.link(name, positive, negative)?;
                }
            }
        }
        Ok(())
    }

    fn attach(
        &mut self,
        ctx: &mut BuildContext<'_>,
        tile: usize,
        _address: NetworkAddress,
    ) -> Result<Endpoint, Error> {
        let router = *self.routers.get(tile).ok_or(Error::MissingRouter(tile))?;
        Ok(ctx.claim_port(router))
    }
}
