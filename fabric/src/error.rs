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

use std::fmt;

/// Errors raised while building a topology.
///
/// The first group are configuration errors: the sizing parameters handed
/// to the builder are invalid or inconsistent. They are always detected
/// before the graph is touched. The second group are internal invariant
/// violations, i.e., bugs in the builder itself; they abort the build.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    // ----- configuration errors -----
    /// a count that must be strictly positive is zero
    NonPositive(&'static str),
    /// the capacity does not split evenly over the interleave stride
    CapacityNotInterleaved {
        capacity: u64,
        controllers: usize,
        interleave_size: u64,
    },
    UnknownTopology(String),
    MalformedShape(String),
    MissingMeshShape,
    /// the mesh does not have exactly one router per slice
    ShapeMismatch { tiles: usize, slices: usize },
    TileOutOfRange { index: usize, tiles: usize },
    /// the configuration text could not be parsed
    Parse(String),
    /// a derived size does not fit the address width
    TooLarge(&'static str),

    // ----- internal invariant violations -----
    PortOverflow {
        router: String,
        port: usize,
        radix: usize,
    },
    PortInUse { node: String, port: String },
    DuplicateAddress(usize),
    AddressGap(usize),
    DuplicateName(String),
    DuplicateLink(String),
    MissingRouter(usize),
    MissingAddressRange(usize),
    MissingNode(usize),
}

impl Error {
    /// True for errors caused by user input rather than by the builder.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::NonPositive(_)
                | Self::CapacityNotInterleaved { .. }
                | Self::UnknownTopology(_)
                | Self::MalformedShape(_)
                | Self::MissingMeshShape
                | Self::ShapeMismatch { .. }
                | Self::TileOutOfRange { .. }
                | Self::Parse(_)
                | Self::TooLarge(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NonPositive(what) => write!(f, "config error: {} must be positive", what),
            Self::CapacityNotInterleaved {
                capacity,
                controllers,
                interleave_size,
            } => write!(
                f,
                "config error: memory capacity {} is not divisible by \
                 {} controllers x {}B interleave",
                capacity, controllers, interleave_size
            ),
            Self::UnknownTopology(kind) => write!(
                f,
                "config error: unknown topology '{}' (expected mesh, ring or crossbar)",
                kind
            ),
            Self::MalformedShape(shape) => {
                write!(f, "config error: malformed mesh shape '{}'", shape)
            }
            Self::MissingMeshShape => write!(f, "config error: mesh topology requires mesh_shape"),
            Self::ShapeMismatch { tiles, slices } => write!(
                f,
                "config error: mesh shape holds {} tiles but the system has {} slices",
                tiles, slices
            ),
            Self::TileOutOfRange { index, tiles } => write!(
                f,
                "config error: tile index {} outside of a {} tile mesh",
                index, tiles
            ),
            Self::Parse(msg) => write!(f, "config error: {}", msg),
            Self::TooLarge(what) => write!(f, "config error: {} overflows", what),
            Self::PortOverflow {
                router,
                port,
                radix,
            } => write!(
                f,
                "internal error: port {} exceeds radix {} of router {}",
                port, radix, router
            ),
            Self::PortInUse { node, port } => {
                write!(f, "internal error: port {} of {} already connected", port, node)
            }
            Self::DuplicateAddress(addr) => {
                write!(f, "internal error: network address {} assigned twice", addr)
            }
            Self::AddressGap(addr) => {
                write!(f, "internal error: network address {} was skipped", addr)
            }
            Self::DuplicateName(name) => write!(f, "internal error: duplicate node {}", name),
            Self::DuplicateLink(name) => write!(f, "internal error: duplicate link {}", name),
            Self::MissingRouter(index) => {
                write!(f, "internal error: no router at position {}", index)
            }
            Self::MissingAddressRange(controller) => write!(
                f,
                "internal error: no address range for memory controller {}",
                controller
            ),
            Self::MissingNode(index) => {
                write!(f, "internal error: node {} is not in the graph", index)
            }
        }
    }
}

impl std::error::Error for Error {}
