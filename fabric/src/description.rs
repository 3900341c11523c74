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

//! The serialized form of a topology handed to the execution engine.

use crate::specs::{Attributes, Endpoint, NodeKind, TopologyGraph};
use crate::{ProgramOptions, StatisticsPlan, TopologyKind};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub kind: NodeKind,
    /// engine component type
    #[serde(rename = "type")]
    pub component: String,
    pub params: Attributes,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EndpointRecord {
    pub component: String,
    pub port: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LinkRecord {
    pub name: String,
    pub left: EndpointRecord,
    pub right: EndpointRecord,
    pub latency: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TopologyDescription {
    pub topology: TopologyKind,
    pub program: ProgramOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StatisticsPlan>,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

impl TopologyDescription {
    /// nodes and links are listed in creation order
    pub fn new(graph: &TopologyGraph, program: &ProgramOptions) -> Self {
        let endpoint = |end: Endpoint| EndpointRecord {
            component: graph.node(end.node).name().to_string(),
            port: end.port.to_string(),
        };
        let nodes = graph
            .nodes()
            .map(|n| NodeRecord {
                name: n.name().to_string(),
                kind: n.kind(),
                component: n.kind().component_type().to_string(),
                params: n.params(),
            })
            .collect();
        let links = graph
            .links()
            .map(|l| LinkRecord {
                name: l.name().to_string(),
                left: endpoint(l.left()),
                right: endpoint(l.right()),
                latency: l.latency().to_string(),
            })
            .collect();
        Self {
            topology: graph.kind(),
            program: program.clone(),
            statistics: None,
            nodes,
            links,
        }
    }

    pub fn with_statistics(mut self, plan: Option<StatisticsPlan>) -> Self {
        self.statistics = plan;
        self
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize topology to json")
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("failed to serialize topology to yaml")
    }

    /// Write the description to `file_name`: YAML for `.yaml`/`.yml`
    /// files, JSON otherwise.
    pub fn write_to<P: AsRef<Path>>(&self, file_name: P) -> anyhow::Result<()> {
        let path = file_name.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let writer = BufWriter::new(file);
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            serde_yaml::to_writer(writer, self)
                .with_context(|| format!("failed to write {}", path.display()))?;
        } else {
            serde_json::to_writer_pretty(writer, self)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        log::info!(
            "wrote {} nodes and {} links to {}",
            self.nodes.len(),
            self.links.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build, SizingConfig};
    use mktemp::Temp;

    fn ring() -> (SizingConfig, TopologyGraph) {
        let config = SizingConfig {
            slices: 2,
            cores_per_tile: 1,
            caches_per_tile: 1,
            ..Default::default()
        };
        let graph = build(&config, TopologyKind::Ring).unwrap();
        (config, graph)
    }

    #[test]
    fn test_records() {
        let (config, graph) = ring();
        let desc = TopologyDescription::new(&graph, &config.program);
        assert_eq!(desc.nodes.len(), graph.node_count());
        assert_eq!(desc.links.len(), graph.link_count());

        let dc = desc.nodes.iter().find(|n| n.name == "dc_1").unwrap();
        assert_eq!(dc.component, "memHierarchy.DirectoryController");
        assert_eq!(dc.params["network_address"], "5");
        assert_eq!(dc.params["interleave_step"], "128B");

        let link = desc.links.iter().find(|l| l.name == "rtr_pos_5").unwrap();
        assert_eq!(link.left.component, "rtr.5");
        assert_eq!(link.left.port, "port0");
        assert_eq!(link.right.component, "rtr.0");
        assert_eq!(link.right.port, "port1");
        assert_eq!(link.latency, "50ps");

        let json = desc.to_json().unwrap();
        assert!(json.contains("\"type\": \"merlin.hr_router\""));
        assert!(!json.contains("statistics"));
        let yaml = desc.to_yaml().unwrap();
        assert!(yaml.contains("name: rtr_pos_5"));
        assert!(yaml.contains("type: merlin.hr_router"));
    }

    #[test]
    fn test_write_files() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (config, graph) = ring();
        let plan = StatisticsPlan::for_graph(&graph, &config.statistics);
        let desc = TopologyDescription::new(&graph, &config.program).with_statistics(plan);

        let temp_dir = Temp::new_dir().unwrap();
        let json_path = temp_dir.as_path().join("ring.json");
        desc.write_to(&json_path).unwrap();
        let text = std::fs::read_to_string(&json_path).unwrap();
        let back: TopologyDescription = serde_json::from_str(&text).unwrap();
        assert_eq!(back, desc);

        let yaml_path = temp_dir.as_path().join("ring.yaml");
        desc.write_to(&yaml_path).unwrap();
        let text = std::fs::read_to_string(&yaml_path).unwrap();
        assert!(text.starts_with("---"));
        assert!(text.contains("sst-ring.stat.csv"));

        let missing = temp_dir.as_path().join("no/such/dir/out.json");
        assert!(desc.write_to(&missing).is_err());
    }
}
