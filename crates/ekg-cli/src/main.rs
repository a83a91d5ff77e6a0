//! ekg - event knowledge graph builder.
//!
//! Loads tabular event logs into Neo4j and derives entities, correlations,
//! directly-follows edges and class-level aggregations from a semantic
//! header.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::Cli;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "ekg=debug,ekg_core=debug,ekg_data=debug,ekg_graph=debug"
    } else {
        "ekg=info,ekg_core=info,ekg_data=info,ekg_graph=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.execute().await
}
