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

//! Generate the structural description of a tiled many-core system.

use anyhow::Context;
use env_logger::{Env, Target};
use fabric::{SizingConfig, StatisticsPlan, TopologyDescription, TopologyKind};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "topogen",
    about = "Build the interconnect topology of a tiled many-core memory system"
)]
struct Arguments {
    /// supported topologies: mesh, ring, crossbar. Overrides the config file.
    #[structopt(short, long)]
    topology: Option<TopologyKind>,
    /// sizing configuration (YAML or JSON); the reference system if omitted
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// output file, .json or .yaml; stdout if omitted
    #[structopt(short, long, parse(from_os_str))]
    out: Option<PathBuf>,
    /// print YAML instead of JSON on stdout
    #[structopt(long)]
    yaml: bool,
    /// also write the graph in dot format
    #[structopt(long, parse(from_os_str))]
    dot: Option<PathBuf>,
    /// do not emit the statistics plan
    #[structopt(long)]
    no_stats: bool,
}

fn to_stdout(description: &TopologyDescription, yaml: bool) -> anyhow::Result<String> {
    if yaml {
        description.to_yaml()
    } else {
        description.to_json()
    }
}

fn run(args: &Arguments) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => SizingConfig::from_file(path)?,
        None => SizingConfig::default(),
    };
    let kind = args.topology.unwrap_or(config.topology_kind);
    let graph = fabric::build(&config, kind)
        .with_context(|| format!("failed to build {} topology", kind))?;

    let plan = if args.no_stats {
        None
    } else {
        StatisticsPlan::for_graph(&graph, &config.statistics)
    };
    let description = TopologyDescription::new(&graph, &config.program).with_statistics(plan);
    match &args.out {
        Some(path) => description.write_to(path)?,
        None => println!("{}", to_stdout(&description, args.yaml)?),
    }

    if let Some(path) = &args.dot {
        std::fs::write(path, graph.to_string())
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("wrote dot graph to {}", path.display());
    }
    Ok(())
}

fn main() {
    let args = Arguments::from_args();

    env_logger::Builder::from_env(Env::default().default_filter_or("topogen=info,fabric=info"))
        .target(Target::Stderr)
        .init();

    if let Err(err) = run(&args) {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}
