//! The graph construction pipeline.
//!
//! Runs the fixed stage sequence over one connection: clear, import,
//! constrain, filter, log, entities, classes, relations, reification,
//! directly-follows, DF cleanup and class-level aggregation. Each stage is
//! gated by a toggle and iterates its semantic-header subset in file order.

use std::path::Path;

use anyhow::{Context, Result};
use neo4rs::Query;
use tracing::info;

use ekg_core::datasets::DataSets;
use ekg_core::header::SemanticHeader;
use ekg_core::perf::Performance;

use crate::import::{Importer, DEFAULT_BATCH_SIZE};
use crate::queries::{classes, df, entities, log, relations};
use crate::{schema, GraphClient};

/// Which pipeline stages to run. All on by default.
#[derive(Debug, Clone)]
pub struct StepToggles {
    pub clear_db: bool,
    pub load_events: bool,
    pub filter_events: bool,
    pub create_log: bool,
    pub create_entities: bool,
    pub create_classes: bool,
    pub create_relations: bool,
    pub reify_relations: bool,
    pub create_df: bool,
    pub delete_parallel_df: bool,
    pub merge_duplicate_df: bool,
    pub create_dfc: bool,
}

impl Default for StepToggles {
    fn default() -> Self {
        Self {
            clear_db: true,
            load_events: true,
            filter_events: true,
            create_log: true,
            create_entities: true,
            create_classes: true,
            create_relations: true,
            reify_relations: true,
            create_df: true,
            delete_parallel_df: true,
            merge_duplicate_df: true,
            create_dfc: true,
        }
    }
}

/// Pipeline knobs beyond the step toggles.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub batch_size: usize,
    pub use_sample: bool,
    pub sample_seed: u64,
    /// Minimum absolute DF frequency for a DF_C edge; 0 disables.
    pub dfc_threshold: u32,
    /// Minimum frequency relative to the reverse direction; 0 disables.
    pub dfc_relative_threshold: f64,
    pub steps: StepToggles,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            use_sample: false,
            sample_seed: ekg_data::prepare::DEFAULT_SAMPLE_SEED,
            dfc_threshold: 0,
            dfc_relative_threshold: 0.0,
            steps: StepToggles::default(),
        }
    }
}

/// Builds the event knowledge graph from prepared tables and a header.
pub struct GraphBuilder<'a> {
    client: &'a GraphClient,
    header: &'a SemanticHeader,
    datasets: &'a DataSets,
    options: BuildOptions,
    perf: Performance,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        client: &'a GraphClient,
        header: &'a SemanticHeader,
        datasets: &'a DataSets,
        options: BuildOptions,
    ) -> Self {
        Self {
            client,
            header,
            datasets,
            options,
            perf: Performance::new(),
        }
    }

    /// Run the full pipeline. The first failed query aborts the run with the
    /// failing stage attached; a rerun starts from a clean database.
    pub async fn build(&mut self, data_dir: &Path) -> Result<()> {
        info!(header = %self.header.name, "Starting graph build");

        if self.options.steps.clear_db {
            schema::clear_database(self.client)
                .await
                .context("Clear stage failed")?;
            self.perf.finished_step("cleared database");
        }

        if self.options.steps.load_events {
            self.import_data(data_dir)
                .await
                .context("Import stage failed")?;
        }

        schema::initialize_schema(self.client)
            .await
            .context("Constraint stage failed")?;
        self.perf.finished_step("created constraints");

        self.filter_and_finalize()
            .await
            .context("Filter stage failed")?;

        if self.options.steps.create_log && self.header.log.include {
            self.exec(log::create_log_nodes())
                .await
                .context("Log stage failed")?;
            if self.header.log.has {
                self.exec(log::link_events_to_log())
                    .await
                    .context("Log stage failed")?;
            }
            self.perf.finished_step("created log nodes");
        }

        if self.options.steps.create_entities {
            self.create_entities().await.context("Entity stage failed")?;
        }

        if self.options.steps.create_classes {
            self.create_classes().await.context("Class stage failed")?;
        }

        if self.options.steps.create_relations {
            for relation in &self.header.relations {
                self.exec(relations::create_relation(relation))
                    .await
                    .with_context(|| format!("Relation stage failed on '{}'", relation.rel_type))?;
                self.perf
                    .finished_step(&format!("created relation {}", relation.rel_type));
            }
        }

        if self.options.steps.reify_relations {
            self.reify_relations()
                .await
                .context("Reification stage failed")?;
        }

        if self.options.steps.create_df {
            for spec in self.header.entities.iter().filter(|e| e.df) {
                self.exec(df::create_directly_follows(spec))
                    .await
                    .with_context(|| format!("DF stage failed on '{}'", spec.entity_type))?;
                self.perf
                    .finished_step(&format!("created df for {}", spec.entity_type));
            }
        }

        if self.options.steps.delete_parallel_df {
            self.delete_parallel_df()
                .await
                .context("Parallel DF cleanup failed")?;
        }

        if self.options.steps.merge_duplicate_df {
            for spec in self.header.entities.iter().filter(|e| e.merge_duplicate_df) {
                self.exec(df::merge_duplicate_df(spec))
                    .await
                    .with_context(|| format!("DF merge failed on '{}'", spec.entity_type))?;
                self.perf
                    .finished_step(&format!("merged duplicate df for {}", spec.entity_type));
            }
        }

        if self.options.steps.create_dfc {
            self.aggregate_df()
                .await
                .context("DF aggregation stage failed")?;
        }

        self.perf.finish();
        info!(
            seconds = self.perf.total_seconds(),
            "Graph build finished"
        );
        Ok(())
    }

    /// Timing report of the finished build.
    pub fn performance(&self) -> &Performance {
        &self.perf
    }

    async fn import_data(&mut self, data_dir: &Path) -> Result<()> {
        let importer = Importer::new(self.client, self.options.batch_size);
        // One counter for every event table in the dataset. The DF queries
        // order by (timestamp, seq), so seq must never repeat across tables.
        let mut seq = 0i64;
        for structure in &self.datasets.structures {
            let preparer = ekg_data::TablePreparer::with_seed(structure, self.options.sample_seed);
            for file_name in &structure.file_names {
                let table = preparer
                    .prepare(data_dir, file_name, self.options.use_sample)
                    .with_context(|| format!("Preparing '{file_name}' failed"))?;
                importer
                    .import_table(structure, &table, file_name, &mut seq)
                    .await?;
                self.perf.finished_step(&format!(
                    "imported data from table {}: {file_name}",
                    structure.name
                ));
            }
            if structure.is_event_data() {
                importer.convert_timestamps(structure).await?;
                self.perf.finished_step(&format!(
                    "converted timestamps of table {}",
                    structure.name
                ));
            }
        }
        Ok(())
    }

    async fn filter_and_finalize(&mut self) -> Result<()> {
        let importer = Importer::new(self.client, self.options.batch_size);
        for structure in &self.datasets.structures {
            if self.options.steps.filter_events {
                importer.filter_nodes(structure).await?;
            }
            // The marker comes off even when filtering is skipped.
            importer.finalize(structure).await?;
        }
        self.perf.finished_step("filtered and finalized import");
        Ok(())
    }

    async fn create_entities(&mut self) -> Result<()> {
        for spec in self.header.entities_from_nodes() {
            if let Some(statement) = entities::create_entity(spec) {
                self.exec(statement)
                    .await
                    .with_context(|| format!("Creating entity '{}' failed", spec.entity_type))?;
                self.perf
                    .finished_step(&format!("created entity {}", spec.entity_type));
            }
            if spec.corr {
                self.exec(entities::correlate_events(spec))
                    .await
                    .with_context(|| format!("Correlating '{}' failed", spec.entity_type))?;
                self.perf
                    .finished_step(&format!("correlated events to {}", spec.entity_type));
            }
        }
        for spec in self.header.entities_from_query() {
            if let Some(statement) = entities::constructor_query(spec) {
                self.exec(statement.to_string())
                    .await
                    .with_context(|| format!("Creating entity '{}' failed", spec.entity_type))?;
                self.perf
                    .finished_step(&format!("created entity {}", spec.entity_type));
            }
        }
        Ok(())
    }

    async fn create_classes(&mut self) -> Result<()> {
        for class in &self.header.classes {
            self.exec(classes::create_class(class)).await?;
            self.exec(classes::link_events_to_class(class)).await?;
            self.perf.finished_step(&format!(
                "created classes over ({})",
                class.class_identifiers.join(", ")
            ));
        }
        Ok(())
    }

    async fn reify_relations(&mut self) -> Result<()> {
        for spec in self.header.entities_from_relations() {
            if let Some(statement) = relations::reify_relation(spec) {
                self.exec(statement)
                    .await
                    .with_context(|| format!("Reifying '{}' failed", spec.entity_type))?;
            }
            if let Some(statement) = relations::link_reified(spec) {
                self.exec(statement)
                    .await
                    .with_context(|| format!("Linking reified '{}' failed", spec.entity_type))?;
            }
            if spec.corr {
                self.exec(relations::correlate_events_to_reified(spec))
                    .await
                    .with_context(|| {
                        format!("Correlating reified '{}' failed", spec.entity_type)
                    })?;
            }
            self.perf
                .finished_step(&format!("reified relation into {}", spec.entity_type));
        }
        Ok(())
    }

    /// For each reified entity flagged for it, drop DF edges that duplicate a
    /// DF edge of either endpoint entity of the underlying relation.
    async fn delete_parallel_df(&mut self) -> Result<()> {
        for spec in self
            .header
            .entities_from_relations()
            .filter(|e| e.delete_parallel_df)
        {
            let Some(relation) = reified_relation(self.header, spec) else {
                continue;
            };
            for endpoint in [&relation.from_node_label, &relation.to_node_label] {
                if let Some(original) = self.header.entity(endpoint) {
                    self.exec(df::delete_parallel_df(spec, original))
                        .await
                        .with_context(|| {
                            format!("Parallel DF cleanup failed on '{}'", spec.entity_type)
                        })?;
                }
            }
            self.perf
                .finished_step(&format!("deleted parallel df of {}", spec.entity_type));
        }
        Ok(())
    }

    async fn aggregate_df(&mut self) -> Result<()> {
        for class in &self.header.classes {
            for spec in self.header.entities.iter().filter(|e| e.df) {
                let statement = classes::aggregate_df_relations(
                    spec,
                    class,
                    self.options.dfc_threshold,
                    self.options.dfc_relative_threshold,
                );
                self.exec(statement).await.with_context(|| {
                    format!("DF aggregation failed on '{}'", spec.entity_type)
                })?;
            }
            self.perf.finished_step(&format!(
                "aggregated df over ({})",
                class.class_identifiers.join(", ")
            ));
        }
        Ok(())
    }

    async fn exec(&self, statement: String) -> Result<()> {
        self.client.execute(Query::new(statement)).await
    }
}

fn reified_relation<'h>(
    header: &'h SemanticHeader,
    spec: &ekg_core::header::model::EntitySpec,
) -> Option<&'h ekg_core::header::model::RelationSpec> {
    match &spec.constructed_by {
        ekg_core::header::model::EntityConstructor::Relation { relation_type, .. } => {
            header.relation(relation_type)
        }
        _ => None,
    }
}
