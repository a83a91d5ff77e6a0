//! Batched node import from prepared tables.

use std::collections::HashMap;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use neo4rs::{BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltString, BoltType, Query};
use tracing::info;

use ekg_core::datasets::model::DataStructure;
use ekg_data::Table;

use crate::GraphClient;

/// Default number of rows per UNWIND batch.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Imports prepared tables as nodes, in sequential UNWIND batches.
pub struct Importer<'a> {
    client: &'a GraphClient,
    batch_size: usize,
}

impl<'a> Importer<'a> {
    pub fn new(client: &'a GraphClient, batch_size: usize) -> Self {
        Self { client, batch_size }
    }

    /// Import one prepared table for a structure. Event rows get a `seq`
    /// property from the shared counter, the deterministic tie-breaker for
    /// directly-follows ordering. Returns the number of imported rows.
    pub async fn import_table(
        &self,
        structure: &DataStructure,
        table: &Table,
        file_name: &str,
        seq: &mut i64,
    ) -> Result<usize> {
        let labels = structure.labels.join(":");
        let dtypes = attribute_dtypes(structure);
        let is_event = structure.is_event_data();

        let statement = if is_event || structure.primary_keys().is_empty() {
            format!("UNWIND $batch AS row CREATE (n:{labels}) SET n += row, n.justImported = true")
        } else {
            // Static node tables merge on their primary keys so that rows
            // describing the same node collapse into one.
            let merge_keys = structure
                .primary_keys()
                .iter()
                .map(|key| format!("{key}: row.{key}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "UNWIND $batch AS row MERGE (n:{labels} {{{merge_keys}}}) \
                 SET n += row, n.justImported = true"
            )
        };

        let chunks = table.len().div_ceil(self.batch_size.max(1));
        let pbar = ProgressBar::new(chunks as u64);
        if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}") {
            pbar.set_style(style);
        }
        pbar.set_message(format!("Importing {file_name}"));

        let rows = table_rows(table, &dtypes, is_event, seq);
        let imported = rows.len();
        let mut batch = BoltList::default();
        for row in rows {
            batch.push(BoltType::Map(row));

            if batch.len() == self.batch_size {
                self.send_batch(&statement, std::mem::take(&mut batch))
                    .await?;
                pbar.inc(1);
            }
        }
        if !batch.is_empty() {
            self.send_batch(&statement, batch).await?;
            pbar.inc(1);
        }
        pbar.finish_and_clear();

        info!(
            table = %structure.name,
            file = file_name,
            rows = imported,
            "imported table"
        );
        Ok(imported)
    }

    async fn send_batch(&self, statement: &str, batch: BoltList) -> Result<()> {
        let query = Query::new(statement.to_string()).param("batch", BoltType::List(batch));
        self.client
            .execute(query)
            .await
            .context("Batch import failed")
    }

    /// Convert just-imported string timestamps to Cypher datetime values.
    pub async fn convert_timestamps(&self, structure: &DataStructure) -> Result<()> {
        for (attribute, _) in structure.datetime_formats() {
            let statement = format!(
                "MATCH (e:Event) WHERE e.{attribute} IS NOT NULL AND e.justImported = true \
                 SET e.{attribute} = datetime(e.{attribute})"
            );
            self.client
                .execute(Query::new(statement))
                .await
                .with_context(|| format!("Converting timestamps of '{attribute}' failed"))?;
        }
        Ok(())
    }

    /// Delete just-imported events matching the structure's value filters.
    pub async fn filter_nodes(&self, structure: &DataStructure) -> Result<()> {
        for exclude in [true, false] {
            for (attribute, values) in structure.filtered_attribute_values(exclude) {
                let statement = match (exclude, values) {
                    (true, Some(_)) => format!(
                        "MATCH (e:Event) WHERE e.justImported = true \
                         AND e.{attribute} IN $values DETACH DELETE e"
                    ),
                    (false, Some(_)) => format!(
                        "MATCH (e:Event) WHERE e.justImported = true \
                         AND NOT e.{attribute} IN $values DETACH DELETE e"
                    ),
                    (_, None) => format!(
                        "MATCH (e:Event) WHERE e.justImported = true \
                         AND e.{attribute} IS NOT NULL DETACH DELETE e"
                    ),
                };
                let mut query = Query::new(statement);
                if let Some(values) = values {
                    let mut list = BoltList::default();
                    for value in values {
                        list.push(BoltType::String(BoltString::from(value.as_str())));
                    }
                    query = query.param("values", BoltType::List(list));
                }
                self.client
                    .execute(query)
                    .await
                    .with_context(|| format!("Filtering on '{attribute}' failed"))?;
            }
        }
        Ok(())
    }

    /// Drop the `justImported` marker after a structure is fully loaded.
    pub async fn finalize(&self, structure: &DataStructure) -> Result<()> {
        let labels = structure.labels.join(":");
        let statement =
            format!("MATCH (n:{labels}) WHERE n.justImported = true REMOVE n.justImported");
        self.client.execute(Query::new(statement)).await
    }
}

/// Declared dtypes keyed by attribute name (a compound attribute takes its
/// first source column's dtype).
fn attribute_dtypes(structure: &DataStructure) -> HashMap<&str, &str> {
    structure
        .attributes
        .iter()
        .filter_map(|a| {
            a.columns
                .first()
                .and_then(|c| c.dtype.as_deref())
                .map(|dtype| (a.name.as_str(), dtype))
        })
        .collect()
}

/// Build Bolt row maps for a prepared table. Event rows take the next value
/// from the shared `seq` counter, which must not repeat between tables.
fn table_rows(
    table: &Table,
    dtypes: &HashMap<&str, &str>,
    is_event: bool,
    seq: &mut i64,
) -> Vec<BoltMap> {
    let mut rows = Vec::with_capacity(table.len());
    for record in table.records() {
        let mut row = BoltMap::default();
        for (column, value) in record {
            row.put(
                BoltString::from(column),
                bolt_value(dtypes.get(column).copied(), value),
            );
        }
        if is_event {
            row.put(
                BoltString::from("seq"),
                BoltType::Integer(BoltInteger::new(*seq)),
            );
            *seq += 1;
        }
        rows.push(row);
    }
    rows
}

/// Map a prepared cell to a Bolt value according to its declared dtype.
/// Values that fail to parse as the declared dtype fall back to strings.
fn bolt_value(dtype: Option<&str>, value: &str) -> BoltType {
    match dtype {
        Some("bool") => BoltType::Boolean(BoltBoolean::new(value == "true")),
        Some("int") | Some("Int64") => match value.parse::<i64>() {
            Ok(n) => BoltType::Integer(BoltInteger::new(n)),
            Err(_) => BoltType::String(BoltString::from(value)),
        },
        Some("float") => match value.parse::<f64>() {
            Ok(f) => BoltType::Float(BoltFloat::new(f)),
            Err(_) => BoltType::String(BoltString::from(value)),
        },
        _ => BoltType::String(BoltString::from(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_conversion_falls_back_to_strings() {
        assert_eq!(
            bolt_value(Some("int"), "42"),
            BoltType::Integer(BoltInteger::new(42))
        );
        assert_eq!(
            bolt_value(Some("int"), "n/a"),
            BoltType::String(BoltString::from("n/a"))
        );
        assert_eq!(
            bolt_value(Some("bool"), "true"),
            BoltType::Boolean(BoltBoolean::new(true))
        );
        assert_eq!(
            bolt_value(None, "text"),
            BoltType::String(BoltString::from("text"))
        );
    }

    #[test]
    fn seq_stays_unique_across_event_tables() {
        // Two event tables whose rows tie on timestamp. With one shared
        // counter, (timestamp, seq) must still order every event strictly.
        let event_table = |timestamp: &str| {
            let mut table = Table::new(vec!["timestamp".to_string()]);
            table.push_row(vec![Some(timestamp.to_string())]);
            table.push_row(vec![Some(timestamp.to_string())]);
            table
        };
        let dtypes = HashMap::new();
        let mut seq = 0i64;
        let mut keys = Vec::new();
        for table in [
            event_table("2016-01-04 09:00:00"),
            event_table("2016-01-04 09:00:00"),
        ] {
            for row in table_rows(&table, &dtypes, true, &mut seq) {
                let timestamp = match row.value.get(&BoltString::from("timestamp")) {
                    Some(BoltType::String(s)) => s.value.clone(),
                    other => panic!("unexpected timestamp value: {other:?}"),
                };
                let seq = match row.value.get(&BoltString::from("seq")) {
                    Some(BoltType::Integer(n)) => n.value,
                    other => panic!("unexpected seq value: {other:?}"),
                };
                keys.push((timestamp, seq));
            }
        }
        assert_eq!(keys.len(), 4);
        keys.sort();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn static_rows_carry_no_seq() {
        let mut table = Table::new(vec!["id".to_string()]);
        table.push_row(vec![Some("r1".to_string())]);
        let mut seq = 7i64;
        let rows = table_rows(&table, &HashMap::new(), false, &mut seq);
        assert_eq!(seq, 7);
        assert!(rows[0].value.get(&BoltString::from("seq")).is_none());
    }

    #[test]
    fn compound_attribute_takes_first_column_dtype() {
        let structure: DataStructure = serde_json::from_str(
            r#"{
                "name": "T", "file_directory": ".", "file_names": [],
                "labels": ["Event"],
                "attributes": [
                    {"name": "amount",
                     "columns": [{"name": "amount", "dtype": "float"}]},
                    {"name": "case", "columns": [{"name": "case"}]}
                ]
            }"#,
        )
        .unwrap();
        let dtypes = attribute_dtypes(&structure);
        assert_eq!(dtypes.get("amount"), Some(&"float"));
        assert_eq!(dtypes.get("case"), None);
    }
}
