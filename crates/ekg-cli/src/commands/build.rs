//! The build command: prepare, import and derive the full graph.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use ekg_core::datasets::DataSets;
use ekg_core::header::SemanticHeader;
use ekg_graph::{BuildOptions, GraphBuilder, GraphClient, GraphConfig, StepToggles};

use crate::output;

#[derive(Args)]
pub struct BuildArgs {
    /// Dataset name; configs are <config-dir>/<DATASET>.json and <DATASET>_DS.json
    #[arg(long)]
    pub dataset: String,

    /// Directory holding the semantic header and data structure JSON files
    #[arg(long, default_value = "json_files")]
    pub config_dir: PathBuf,

    /// Root directory the data structures' file directories are relative to
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Rows per import batch
    #[arg(long, default_value_t = ekg_graph::import::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Restrict event tables to their declared sample populations
    #[arg(long)]
    pub sample: bool,

    /// RNG seed for random sampling
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Write a step timing report (CSV) to this path
    #[arg(long)]
    pub perf: Option<PathBuf>,

    /// Minimum absolute DF frequency for DF_C edges (0 disables)
    #[arg(long, default_value_t = 0)]
    pub dfc_threshold: u32,

    /// Minimum DF frequency relative to the reverse direction (0 disables)
    #[arg(long, default_value_t = 0.0)]
    pub dfc_relative_threshold: f64,

    /// Keep the existing database contents
    #[arg(long)]
    pub skip_clear: bool,

    /// Skip table import (assumes events already loaded)
    #[arg(long)]
    pub skip_import: bool,

    /// Skip attribute value filters
    #[arg(long)]
    pub skip_filter: bool,

    /// Skip log nodes and HAS links
    #[arg(long)]
    pub skip_log: bool,

    /// Skip entity creation and correlation
    #[arg(long)]
    pub skip_entities: bool,

    /// Skip class nodes and OBSERVED links
    #[arg(long)]
    pub skip_classes: bool,

    /// Skip typed entity-to-entity relations
    #[arg(long)]
    pub skip_relations: bool,

    /// Skip relation reification
    #[arg(long)]
    pub skip_reify: bool,

    /// Skip directly-follows edges
    #[arg(long)]
    pub skip_df: bool,

    /// Keep reified DF edges that parallel an underlying entity's DF edge
    #[arg(long)]
    pub skip_parallel_df_cleanup: bool,

    /// Keep parallel duplicate DF edges instead of merging them
    #[arg(long)]
    pub skip_merge_duplicate_df: bool,

    /// Skip class-level DF_C aggregation
    #[arg(long)]
    pub skip_dfc: bool,
}

impl BuildArgs {
    fn step_toggles(&self) -> StepToggles {
        StepToggles {
            clear_db: !self.skip_clear,
            load_events: !self.skip_import,
            filter_events: !self.skip_filter,
            create_log: !self.skip_log,
            create_entities: !self.skip_entities,
            create_classes: !self.skip_classes,
            create_relations: !self.skip_relations,
            reify_relations: !self.skip_reify,
            create_df: !self.skip_df,
            delete_parallel_df: !self.skip_parallel_df_cleanup,
            merge_duplicate_df: !self.skip_merge_duplicate_df,
            create_dfc: !self.skip_dfc,
        }
    }
}

/// Load and validate the header/data structure pair for a dataset.
pub fn load_configs(config_dir: &Path, dataset: &str) -> Result<(SemanticHeader, DataSets)> {
    let header_path = config_dir.join(format!("{dataset}.json"));
    let datasets_path = config_dir.join(format!("{dataset}_DS.json"));

    let header = SemanticHeader::load(&header_path)
        .with_context(|| format!("Failed to load semantic header {}", header_path.display()))?;
    let datasets = DataSets::load(&datasets_path)
        .with_context(|| format!("Failed to load data structures {}", datasets_path.display()))?;
    ekg_core::validate::validate(&header, &datasets)?;

    Ok((header, datasets))
}

pub async fn execute(args: BuildArgs, config: &GraphConfig) -> Result<()> {
    let (header, datasets) = load_configs(&args.config_dir, &args.dataset)?;

    println!(
        "{}",
        format!("Building event knowledge graph for {}", header.name).bold()
    );

    let client = GraphClient::connect(config).await?;
    let options = BuildOptions {
        batch_size: args.batch_size,
        use_sample: args.sample,
        sample_seed: args.seed,
        dfc_threshold: args.dfc_threshold,
        dfc_relative_threshold: args.dfc_relative_threshold,
        steps: args.step_toggles(),
    };

    let mut builder = GraphBuilder::new(&client, &header, &datasets, options);
    builder.build(&args.data_dir).await?;

    output::print_performance(builder.performance());
    if let Some(path) = &args.perf {
        builder.performance().save(path)?;
        println!("Timing report written to {}", path.display());
    }

    let counts = client.get_counts().await?;
    println!("\n{}", "Build complete:".green().bold());
    println!("  Nodes: {}", counts.nodes);
    println!("  Relationships: {}", counts.relationships);

    Ok(())
}
