//! The validate command: parse configs and run the upfront checks.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::build::load_configs;
use crate::output;

#[derive(Args)]
pub struct ValidateArgs {
    /// Dataset name; configs are <config-dir>/<DATASET>.json and <DATASET>_DS.json
    #[arg(long)]
    pub dataset: String,

    /// Directory holding the semantic header and data structure JSON files
    #[arg(long, default_value = "json_files")]
    pub config_dir: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let (header, datasets) = load_configs(&args.config_dir, &args.dataset)?;

    println!("{}", "Configuration valid.".green().bold());
    output::print_header_summary(&header, &datasets);
    Ok(())
}
