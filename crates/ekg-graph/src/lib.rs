//! Neo4j event knowledge graph construction.
//!
//! Turns prepared event tables ([`ekg_data`]) and a parsed semantic header
//! ([`ekg_core::header`]) into a labelled property graph: `Event`, `Entity`,
//! `Log` and `Class` nodes connected by `CORR`, `DF`, `REIFIED`, `OBSERVED`,
//! `HAS` and aggregated `DF_C` relationships.

pub mod builder;
pub mod client;
pub mod import;
pub mod queries;
pub mod schema;
pub mod stats;

pub use builder::{BuildOptions, GraphBuilder, StepToggles};
pub use client::{GraphClient, GraphConfig, GraphCounts};
pub use import::Importer;
pub use stats::GraphStats;
