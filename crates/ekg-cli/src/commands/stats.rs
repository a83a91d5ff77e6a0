//! The stats command: node and edge counts.

use anyhow::Result;

use ekg_graph::{GraphClient, GraphConfig, GraphStats};

use crate::output;

pub async fn execute(config: &GraphConfig) -> Result<()> {
    let client = GraphClient::connect(config).await?;
    let stats = GraphStats::gather(&client).await?;
    output::print_stats(&stats);
    Ok(())
}
