//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};

use ekg_graph::GraphConfig;

pub mod build;
pub mod clear;
pub mod stats;
pub mod validate;

/// Event knowledge graph builder
#[derive(Parser)]
#[command(name = "ekg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Neo4j bolt URI
    #[arg(long, global = true, env = "EKG_NEO4J_URI", default_value = "bolt://localhost:7687")]
    pub uri: String,

    /// Neo4j user
    #[arg(long, global = true, env = "EKG_NEO4J_USER", default_value = "neo4j")]
    pub user: String,

    /// Neo4j password
    #[arg(long, global = true, env = "EKG_NEO4J_PASSWORD", default_value = "neo4j")]
    pub password: String,

    /// Neo4j database name
    #[arg(long, global = true, env = "EKG_NEO4J_DATABASE", default_value = "neo4j")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the event knowledge graph for a dataset
    Build(build::BuildArgs),

    /// Parse and validate dataset configs without touching the database
    Validate(validate::ValidateArgs),

    /// Delete all nodes, relationships and constraints
    Clear,

    /// Show node and edge counts
    Stats,
}

impl Cli {
    fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            uri: self.uri.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.graph_config();
        match self.command {
            Commands::Build(args) => build::execute(args, &config).await,
            Commands::Validate(args) => validate::execute(args),
            Commands::Clear => clear::execute(&config).await,
            Commands::Stats => stats::execute(&config).await,
        }
    }
}
