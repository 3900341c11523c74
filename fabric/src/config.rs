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

use crate::address::AddressPartitioner;
use crate::specs::{Attributes, Latency};
use crate::stats::StatisticsConfiguration;
use crate::{Error, TopologyKind};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const MB: u64 = 1024 * 1024;

/// A default cache line size, in bytes
pub const CACHE_LINE_SIZE: u64 = 64;

/// provides the parameters to size a tiled system
///
/// constructed programmatically or read from a config file. Only the
/// counts, the capacity and the cache line size are required; everything
/// else has a default.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SizingConfig {
    /// number of tiles (slices)
    pub slices: usize,
    /// cores behind each private cache group of a tile
    pub cores_per_tile: usize,
    /// private cache groups (one L2 each) per tile
    pub caches_per_tile: usize,
    pub memory_controllers_per_tile: usize,
    pub l3_nodes_per_tile: usize,
    pub memory_capacity_bytes: u64,
    pub cache_line_size: u64,
    /// defaults to the cache line size
    #[serde(default)]
    pub interleave_size: Option<u64>,
    #[serde(default = "default_link_latency")]
    pub link_latency: Latency,
    #[serde(default)]
    pub topology_kind: TopologyKind,
    #[serde(default)]
    pub mesh_shape: Option<String>,
    #[serde(default)]
    pub mesh_width: Option<String>,
    #[serde(default)]
    pub components: ComponentConfiguration,
    #[serde(default)]
    pub program: ProgramOptions,
    #[serde(default)]
    pub statistics: StatisticsConfiguration,
}

fn default_link_latency() -> Latency {
    Latency(50)
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            slices: 8,
            cores_per_tile: 2,
            caches_per_tile: 2,
            memory_controllers_per_tile: 1,
            l3_nodes_per_tile: 1,
            memory_capacity_bytes: 16384 * MB,
            cache_line_size: CACHE_LINE_SIZE,
            interleave_size: None,
            link_latency: default_link_latency(),
            topology_kind: TopologyKind::Mesh,
            mesh_shape: Some("4x2".into()),
            mesh_width: Some("1x1".into()),
            components: ComponentConfiguration::default(),
            program: ProgramOptions::default(),
            statistics: StatisticsConfiguration::default(),
        }
    }
}

impl SizingConfig {
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> anyhow::Result<Self> {
        let path = file_name.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)
            .map_err(|e| Error::Parse(e.to_string()))
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_str(config: &str) -> Result<Self, Error> {
        serde_yaml::from_str(config).map_err(|e| Error::Parse(e.to_string()))
    }

    pub fn interleave_size(&self) -> u64 {
        self.interleave_size.unwrap_or(self.cache_line_size)
    }

    // The totals below saturate; `validate` rejects configurations where
    // any of them overflows.

    pub fn num_memory_controllers(&self) -> usize {
        self.slices.saturating_mul(self.memory_controllers_per_tile)
    }

    /// fabric attachments of one tile: L2s, L3 blocks and directories
    pub fn local_ports(&self) -> usize {
        self.caches_per_tile
            .saturating_add(self.l3_nodes_per_tile)
            .saturating_add(self.memory_controllers_per_tile)
    }

    pub fn num_cores(&self) -> usize {
        self.slices
            .saturating_mul(self.caches_per_tile)
            .saturating_mul(self.cores_per_tile)
    }

    pub fn partitioner(&self) -> Result<AddressPartitioner, Error> {
        AddressPartitioner::new(
            self.memory_capacity_bytes,
            self.num_memory_controllers(),
            self.interleave_size(),
        )
    }

    /// Basic validity checks, independent of the topology.
    pub fn validate(&self) -> Result<(), Error> {
        let counts = [
            (self.slices, "slices"),
            (self.cores_per_tile, "cores_per_tile"),
            (self.caches_per_tile, "caches_per_tile"),
            (self.memory_controllers_per_tile, "memory_controllers_per_tile"),
            (self.l3_nodes_per_tile, "l3_nodes_per_tile"),
        ];
        for &(count, name) in counts.iter() {
            if count == 0 {
                return Err(Error::NonPositive(name));
            }
        }
        if self.cache_line_size == 0 {
            return Err(Error::NonPositive("cache_line_size"));
        }
        self.slices
            .checked_mul(self.memory_controllers_per_tile)
            .ok_or(Error::TooLarge("memory controller count"))?;
        let local_ports = self
            .caches_per_tile
            .checked_add(self.l3_nodes_per_tile)
            .and_then(|n| n.checked_add(self.memory_controllers_per_tile))
            .ok_or(Error::TooLarge("local port count"))?;
        self.slices
            .checked_mul(local_ports)
            .ok_or(Error::TooLarge("fabric attachment count"))?;
        self.slices
            .checked_mul(self.caches_per_tile)
            .and_then(|n| n.checked_mul(self.cores_per_tile))
            .ok_or(Error::TooLarge("core count"))?;
        self.partitioner().map(|_| ())
    }
}

/// Timing-independent options for the engine program.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgramOptions {
    pub timebase: String,
    pub stop_at_cycle: String,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            timebase: "1ps".into(),
            stop_at_cycle: "10ms".into(),
        }
    }
}

/// Options of the trace-driven processor model behind every core.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessorConfiguration {
    pub param_file: String,
    pub trace_file: String,
    pub output_dir: String,
    /// cores simulated by the model; the system's core count if unset
    pub num_sim_cores: Option<usize>,
    pub ptx_core: u32,
    pub debug: u32,
    pub debug_addr: u64,
    pub debug_level: u32,
}

impl Default for ProcessorConfiguration {
    fn default() -> Self {
        Self {
            param_file: "params.in".into(),
            trace_file: "trace_file_list".into(),
            output_dir: ".".into(),
            num_sim_cores: None,
            ptx_core: 0,
            debug: 0,
            debug_addr: 0,
            debug_level: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CacheConfiguration {
    pub cache_size: String,
    pub associativity: usize,
    pub access_latency_cycles: usize,
    #[serde(default)]
    pub mshr_num_entries: Option<usize>,
    #[serde(default)]
    pub max_request_delay: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DirectoryConfiguration {
    pub network_bw: String,
    /// entries in the directory cache
    pub entry_cache_size: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MemoryConfiguration {
    pub access_time: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RouterConfiguration {
    pub flit_size: String,
    pub link_bw: String,
    pub xbar_bw: String,
    pub input_latency: String,
    pub output_latency: String,
    pub input_buf_size: String,
    pub output_buf_size: String,
}

/// Parameters passed through to the engine components.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComponentConfiguration {
    pub clock: String,
    pub cache_clock: String,
    pub memory_clock: String,
    pub coherence_protocol: String,
    pub replacement_policy: String,
    pub cache_debug_level: u32,
    pub bus_debug_level: u32,
    pub processor: ProcessorConfiguration,
    pub l1: CacheConfiguration,
    pub l2: CacheConfiguration,
    pub l3: CacheConfiguration,
    pub directory: DirectoryConfiguration,
    pub memory: MemoryConfiguration,
    pub router: RouterConfiguration,
}

impl Default for ComponentConfiguration {
    fn default() -> Self {
        Self {
            clock: "1020MHz".into(),
            cache_clock: "1020MHz".into(),
            memory_clock: "1674MHz".into(),
            coherence_protocol: "MESI".into(),
            replacement_policy: "LRU".into(),
            cache_debug_level: 9,
            bus_debug_level: 10,
            processor: ProcessorConfiguration::default(),
            l1: CacheConfiguration {
                cache_size: "1KB".into(),
                associativity: 8,
                access_latency_cycles: 1,
                mshr_num_entries: None,
                max_request_delay: Some(1_000_000),
            },
            l2: CacheConfiguration {
                cache_size: "1MB".into(),
                associativity: 16,
                access_latency_cycles: 10,
                mshr_num_entries: Some(128),
                max_request_delay: None,
            },
            l3: CacheConfiguration {
                cache_size: "2MB".into(),
                associativity: 32,
                access_latency_cycles: 30,
                mshr_num_entries: Some(1024),
                max_request_delay: None,
            },
            directory: DirectoryConfiguration {
                network_bw: "32GB/s".into(),
                entry_cache_size: 256 * MB,
            },
            memory: MemoryConfiguration {
                access_time: "100ns".into(),
            },
            router: RouterConfiguration {
                flit_size: "64B".into(),
                link_bw: "16GB/s".into(),
                xbar_bw: "32GB/s".into(),
                input_latency: "20ns".into(),
                output_latency: "20ns".into(),
                input_buf_size: "2KB".into(),
                output_buf_size: "2KB".into(),
            },
        }
    }
}

fn attrs(pairs: &[(&str, String)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

impl ComponentConfiguration {
    fn cache_params(
        &self,
        cache: &CacheConfiguration,
        first_level: bool,
        frequency: &str,
        line_size: u64,
    ) -> Attributes {
        let mut params = attrs(&[
            ("L1", if first_level { "1" } else { "0" }.to_string()),
            ("cache_frequency", frequency.to_string()),
            ("coherence_protocol", self.coherence_protocol.clone()),
            ("replacement_policy", self.replacement_policy.clone()),
            ("cache_size", cache.cache_size.clone()),
            ("associativity", cache.associativity.to_string()),
            ("cache_line_size", line_size.to_string()),
            ("access_latency_cycles", cache.access_latency_cycles.to_string()),
            ("debug", "0".to_string()),
            ("debug_level", self.cache_debug_level.to_string()),
        ]);
        if let Some(mshrs) = cache.mshr_num_entries {
            params.insert("mshr_num_entries".into(), mshrs.to_string());
        }
        if let Some(delay) = cache.max_request_delay {
            params.insert("maxRequestDelay".into(), delay.to_string());
        }
        params
    }

    pub fn l1_params(&self, line_size: u64) -> Attributes {
        self.cache_params(&self.l1, true, &self.clock, line_size)
    }

    pub fn l2_params(&self, line_size: u64) -> Attributes {
        self.cache_params(&self.l2, false, &self.clock, line_size)
    }

    /// `slice_id` is the global index of the L3 block among `num_slices`.
    pub fn l3_params(&self, line_size: u64, slice_id: usize, num_slices: usize) -> Attributes {
        let mut params = self.cache_params(&self.l3, false, &self.cache_clock, line_size);
        params.insert("slice_id".into(), slice_id.to_string());
        params.insert("num_cache_slices".into(), num_slices.to_string());
        params.insert("slice_allocation_policy".into(), "rr".into());
        params
    }

    /// `num_cores` is the core count of the whole system and `mem_size`
    /// its memory capacity in bytes.
    pub fn core_params(&self, core_id: usize, num_cores: usize, mem_size: u64) -> Attributes {
        let p = &self.processor;
        let sim_cores = p.num_sim_cores.unwrap_or(num_cores);
        attrs(&[
            ("core_id", core_id.to_string()),
            ("frequency", self.clock.clone()),
            ("mem_size", mem_size.to_string()),
            (
                "command_line",
                format!(
                    "--use_memhierarchy=1 --num_sim_cores={} --num_sim_large_cores={}",
                    sim_cores, sim_cores
                ),
            ),
            ("param_file", p.param_file.clone()),
            ("trace_file", p.trace_file.clone()),
            ("output_dir", p.output_dir.clone()),
            ("ptx_core", p.ptx_core.to_string()),
            ("num_link", num_cores.to_string()),
            ("debug", p.debug.to_string()),
            ("debug_addr", p.debug_addr.to_string()),
            ("debug_level", p.debug_level.to_string()),
        ])
    }

    pub fn bus_params(&self) -> Attributes {
        attrs(&[
            ("bus_frequency", self.clock.clone()),
            ("debug", "0".into()),
            ("debug_level", self.bus_debug_level.to_string()),
        ])
    }

    pub fn directory_params(&self) -> Attributes {
        attrs(&[
            ("coherence_protocol", self.coherence_protocol.clone()),
            ("network_bw", self.directory.network_bw.clone()),
            ("entry_cache_size", self.directory.entry_cache_size.to_string()),
            ("clock", self.memory_clock.clone()),
            ("debug", "0".into()),
        ])
    }

    /// `local_size` is the number of bytes backing each controller.
    pub fn memory_params(&self, local_size: u64) -> Attributes {
        attrs(&[
            ("coherence_protocol", self.coherence_protocol.clone()),
            ("backend.access_time", self.memory.access_time.clone()),
            ("backend.mem_size", format!("{}B", local_size)),
            ("rangeStart", "0".into()),
            ("clock", self.memory_clock.clone()),
        ])
    }

    /// parameters common to all routers, whatever the topology
    pub fn router_params(&self) -> Attributes {
        let r = &self.router;
        attrs(&[
            ("flit_size", r.flit_size.clone()),
            ("link_bw", r.link_bw.clone()),
            ("xbar_bw", r.xbar_bw.clone()),
            ("input_latency", r.input_latency.clone()),
            ("output_latency", r.output_latency.clone()),
            ("input_buf_size", r.input_buf_size.clone()),
            ("output_buf_size", r.output_buf_size.clone()),
            ("debug", "0".into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_yaml_config() {
        let conf_str = "---
slices: 4
cores_per_tile: 1
caches_per_tile: 2
memory_controllers_per_tile: 2
l3_nodes_per_tile: 1
memory_capacity_bytes: 1073741824
cache_line_size: 64
interleave_size: 4096
link_latency: 100
topology_kind: ring
components:
  clock: 2GHz
  l2:
    cache_size: 512KB
    associativity: 8
    access_latency_cycles: 12
";
        let config = SizingConfig::from_str(conf_str).unwrap();
        assert_eq!(config.slices, 4);
        assert_eq!(config.caches_per_tile, 2);
        assert_eq!(config.interleave_size(), 4096);
        assert_eq!(config.link_latency, Latency(100));
        assert_eq!(config.topology_kind, TopologyKind::Ring);
        assert_eq!(config.mesh_shape, None);
        assert_eq!(config.num_memory_controllers(), 8);
        assert_eq!(config.local_ports(), 5);
        assert_eq!(config.components.clock, "2GHz");
        assert_eq!(config.components.l2.cache_size, "512KB");
        assert_eq!(config.components.l2.mshr_num_entries, None);
        // untouched sections keep their defaults
        assert_eq!(config.components.l3.associativity, 32);
        assert_eq!(config.program.timebase, "1ps");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn read_json_config() {
        let config = SizingConfig::from_str(
            r#"{"slices": 2, "cores_per_tile": 1, "caches_per_tile": 1,
                "memory_controllers_per_tile": 1, "l3_nodes_per_tile": 1,
                "memory_capacity_bytes": 4096, "cache_line_size": 64,
                "topology_kind": "crossbar"}"#,
        )
        .unwrap();
        assert_eq!(config.topology_kind, TopologyKind::Crossbar);
        assert_eq!(config.interleave_size(), 64);
        assert_eq!(config.link_latency, Latency(50));
    }

    #[test]
    fn write_yaml_config() {
        let config = SizingConfig::default();
        let text = serde_yaml::to_string(&config).unwrap();
        assert_eq!(SizingConfig::from_str(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_configs() {
        assert!(matches!(
            SizingConfig::from_str("slices: -1"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            SizingConfig::from_str("slices: 8\ntopology_kind: torus"),
            Err(Error::Parse(_))
        ));

        let mut config = SizingConfig::default();
        config.cores_per_tile = 0;
        assert_eq!(config.validate(), Err(Error::NonPositive("cores_per_tile")));

        let mut config = SizingConfig::default();
        config.memory_capacity_bytes = 8 * 64 * 3 + 64;
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(matches!(err, Error::CapacityNotInterleaved { .. }));
    }

    #[test]
    fn test_default_is_reference_system() {
        let config = SizingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_cores(), 32);
        assert_eq!(config.num_memory_controllers(), 8);
        assert_eq!(config.partitioner().unwrap().interleave_step(), 512);
    }

    #[test]
    fn test_component_params() {
        let components = ComponentConfiguration::default();
        let l1 = components.l1_params(64);
        assert_eq!(l1["L1"], "1");
        assert_eq!(l1["maxRequestDelay"], "1000000");
        assert!(!l1.contains_key("mshr_num_entries"));
        let l3 = components.l3_params(64, 3, 8);
        assert_eq!(l3["slice_id"], "3");
        assert_eq!(l3["num_cache_slices"], "8");
        assert_eq!(l3["cache_frequency"], "1020MHz");
        assert_eq!(l3["debug_level"], "9");
        assert_eq!(components.bus_params()["debug_level"], "10");
        assert_eq!(components.memory_params(2048)["backend.mem_size"], "2048B");

        let core = components.core_params(5, 32, 16384 * MB);
        assert_eq!(core["core_id"], "5");
        assert_eq!(core["mem_size"], "17179869184");
        assert_eq!(
            core["command_line"],
            "--use_memhierarchy=1 --num_sim_cores=32 --num_sim_large_cores=32"
        );
        assert_eq!(core["num_link"], "32");
        assert_eq!(core["param_file"], "params.in");
        assert_eq!(core["trace_file"], "trace_file_list");
        assert_eq!(core["output_dir"], ".");
        assert_eq!(core["ptx_core"], "0");
        assert_eq!(core["debug_level"], "5");

        let mut components = components;
        components.processor.num_sim_cores = Some(24);
        let core = components.core_params(0, 32, 1024);
        let command_line = &core["command_line"];
        assert!(command_line.ends_with("--num_sim_cores=24 --num_sim_large_cores=24"));
        assert_eq!(core["num_link"], "32");
    }

    #[test]
    fn test_total_overflow() {
        let config = SizingConfig {
            slices: usize::MAX,
            memory_controllers_per_tile: 2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(Error::TooLarge("memory controller count"))
        );
        assert_eq!(config.num_memory_controllers(), usize::MAX);

        let config = SizingConfig {
            caches_per_tile: usize::MAX,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(Error::TooLarge("local port count")));
        assert_eq!(config.local_ports(), usize::MAX);

        let config = SizingConfig {
            slices: usize::MAX / 2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(Error::TooLarge("fabric attachment count"))
        );

        let config = SizingConfig {
            cores_per_tile: usize::MAX / 2,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err, Error::TooLarge("core count"));
        assert!(err.is_config_error());
    }
}
