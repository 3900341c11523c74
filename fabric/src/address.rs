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

//! Memory address interleaving and network address assignment.

use crate::{Error, NetworkAddress};
use serde::{Deserialize, Serialize};

/// The addresses owned by one directory/memory controller pair.
///
/// Memory is striped round-robin across the controllers in blocks of
/// `interleave_size` bytes. Controller `i` owns the stripes starting at
/// `start`, `start + interleave_step`, ... up to and including the stripe
/// based at `end`; `end` is therefore the base of the controller's last
/// stripe and the range is *not* a contiguous region.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AddressRange {
    pub controller: usize,
    pub start: u64,
    pub end: u64,
    pub interleave_size: u64,
    pub interleave_step: u64,
}

impl AddressRange {
    /// whether `addr` falls into one of this controller's stripes.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start
            && addr < self.end + self.interleave_size
            && (addr - self.start) % self.interleave_step < self.interleave_size
    }

    /// base addresses of the stripes owned by the controller.
    pub fn stripes(&self) -> impl Iterator<Item = u64> {
        (self.start..=self.end).step_by(self.interleave_step as usize)
    }

    /// number of bytes owned by the controller.
    pub fn owned_bytes(&self) -> u64 {
        ((self.end - self.start) / self.interleave_step + 1) * self.interleave_size
    }
}

/// Splits the memory capacity across a number of controllers.
#[derive(Clone, Debug)]
pub struct AddressPartitioner {
    capacity: u64,
    controllers: usize,
    interleave_size: u64,
    interleave_step: u64,
}

impl AddressPartitioner {
    /// Validates the parameters of the partition.
    ///
    /// The capacity must be a positive multiple of the interleave step
    /// (`controllers * interleave_size`).
    pub fn new(capacity: u64, controllers: usize, interleave_size: u64) -> Result<Self, Error> {
        if controllers == 0 {
            return Err(Error::NonPositive("number of memory controllers"));
        }
        if interleave_size == 0 {
            return Err(Error::NonPositive("interleave size"));
        }
        if capacity == 0 {
            return Err(Error::NonPositive("memory capacity"));
        }
        let interleave_step = (controllers as u64)
            .checked_mul(interleave_size)
            .ok_or(Error::TooLarge("interleave step"))?;
        if capacity % interleave_step != 0 {
            return Err(Error::CapacityNotInterleaved {
                capacity,
                controllers,
                interleave_size,
            });
        }
        Ok(Self {
            capacity,
            controllers,
            interleave_size,
            interleave_step,
        })
    }

    pub fn interleave_step(&self) -> u64 {
        self.interleave_step
    }

    /// The range of controller `index`.
    ///
    /// `start = i * size` and `end = capacity - step + i * size`, i.e., the
    /// base of the last stripe the controller touches.
    pub fn range(&self, index: usize) -> Option<AddressRange> {
        if index >= self.controllers {
            return None;
        }
        let offset = index as u64 * self.interleave_size;
        Some(AddressRange {
            controller: index,
            start: offset,
            end: self.capacity - self.interleave_step() + offset,
            interleave_size: self.interleave_size,
            interleave_step: self.interleave_step(),
        })
    }

    pub fn ranges(&self) -> Vec<AddressRange> {
        (0..self.controllers).filter_map(|i| self.range(i)).collect()
    }

    /// The controller owning `addr`, None beyond the capacity.
    pub fn owner_of(&self, addr: u64) -> Option<usize> {
        if addr < self.capacity {
            Some(owner_of(addr, self.controllers, self.interleave_size))
        } else {
            None
        }
    }
}

/// One range per controller, in controller order.
pub fn partition(
    capacity: u64,
    controllers: usize,
    interleave_size: u64,
) -> Result<Vec<AddressRange>, Error> {
    Ok(AddressPartitioner::new(capacity, controllers, interleave_size)?.ranges())
}

/// The controller whose stripe holds `addr`.
pub fn owner_of(addr: u64, controllers: usize, interleave_size: u64) -> usize {
    ((addr / interleave_size) % controllers as u64) as usize
}

/// Hands out network addresses: contiguous, from 0, never reused.
#[derive(Debug, Default)]
pub struct NetworkAddressAllocator {
    next: NetworkAddress,
}

impl NetworkAddressAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next(&mut self) -> NetworkAddress {
        let address = self.next;
        self.next += 1;
        address
    }

    /// number of addresses handed out so far
    pub fn assigned(&self) -> usize {
        self.next
    }
}
