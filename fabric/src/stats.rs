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

//! Statistics enablement for the engine.
//!
//! The plan only tells the engine which statistics to collect and where to
//! write them; nothing is collected here.

use crate::specs::{Attributes, TopologyGraph};
use crate::TopologyKind;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatisticsConfiguration {
    pub enabled: bool,
    pub load_level: u32,
    pub statistic_type: String,
    /// component types whose statistics are all enabled
    pub component_types: Vec<String>,
    pub output: String,
    pub separator: String,
}

impl Default for StatisticsConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            load_level: 4,
            statistic_type: "sst.AccumulatorStatistic".into(),
            component_types: vec![
                "macsimComponent.macsimComponent".into(),
                "memHierarchy.Cache".into(),
                "memHierarchy.MemController".into(),
            ],
            output: "sst.statOutputCSV".into(),
            separator: ",".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StatisticsPlan {
    pub load_level: u32,
    pub statistic_type: String,
    pub component_types: Vec<String>,
    pub output: String,
    pub output_options: Attributes,
}

fn output_file(kind: TopologyKind) -> String {
    let name = match kind {
        TopologyKind::Crossbar => "xbar".to_string(),
        kind => kind.to_string(),
    };
    format!("sst-{}.stat.csv", name)
}

impl StatisticsPlan {
    /// The plan for a finished graph, None when statistics are disabled.
    ///
    /// Only the configured component types that the graph instantiates are
    /// enabled.
    pub fn for_graph(graph: &TopologyGraph, config: &StatisticsConfiguration) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let present = graph
            .nodes()
            .map(|n| n.kind().component_type())
            .collect::<BTreeSet<_>>();
        let component_types = config
            .component_types
            .iter()
            .filter(|t| present.contains(t.as_str()))
            .sorted()
            .dedup()
            .cloned()
            .collect::<Vec<_>>();
        log::debug!("statistics enabled for {:?}", component_types);

        let mut output_options = Attributes::new();
        output_options.insert("filepath".into(), output_file(graph.kind()));
        output_options.insert("separator".into(), config.separator.clone());
        for flag in ["outputtopheader", "outputsimtime", "outputrank"].iter() {
            output_options.insert(flag.to_string(), "1".into());
        }

        Some(Self {
            load_level: config.load_level,
            statistic_type: config.statistic_type.clone(),
            component_types,
            output: config.output.clone(),
            output_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build, SizingConfig};

    #[test]
    fn test_plan() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = SizingConfig::default();
        let graph = build(&config, TopologyKind::Crossbar).unwrap();
        let plan = StatisticsPlan::for_graph(&graph, &config.statistics).unwrap();
        assert_eq!(plan.load_level, 4);
        assert_eq!(
            plan.component_types,
            vec![
                "macsimComponent.macsimComponent",
                "memHierarchy.Cache",
                "memHierarchy.MemController"
            ]
        );
        assert_eq!(plan.output_options["filepath"], "sst-xbar.stat.csv");
        assert_eq!(plan.output_options["outputrank"], "1");
    }

    #[test]
    fn test_absent_types_and_disabled() {
        let mut config = SizingConfig::default();
        config.statistics.component_types = vec![
            "memHierarchy.MemController".into(),
            "merlin.hr_router".into(),
            "miranda.BaseCPU".into(),
        ];
        let graph = build(&config, TopologyKind::Mesh).unwrap();
        let plan = StatisticsPlan::for_graph(&graph, &config.statistics).unwrap();
        assert_eq!(
            plan.component_types,
            vec!["memHierarchy.MemController", "merlin.hr_router"]
        );
        assert_eq!(plan.output_options["filepath"], "sst-mesh.stat.csv");

        config.statistics.enabled = false;
        assert_eq!(StatisticsPlan::for_graph(&graph, &config.statistics), None);
    }
}
