//! The clear command: wipe the database.

use anyhow::Result;
use colored::Colorize;

use ekg_graph::{GraphClient, GraphConfig};

pub async fn execute(config: &GraphConfig) -> Result<()> {
    let client = GraphClient::connect(config).await?;
    ekg_graph::schema::clear_database(&client).await?;
    println!("{}", "Database cleared.".green().bold());
    Ok(())
}
