//! Table preparation: from a raw CSV file to the declared attribute columns.
//!
//! The steps per attribute run in declaration order: paired-column NA fill,
//! scalar NA fill, mandatory `"Unknown"` fill, compound construction or
//! rename. The table is then subset to exactly the declared attribute names
//! and datetime attributes are reformatted. Steps skip work that a previous
//! run already did, so preparing an already-prepared table is a no-op.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use ekg_core::datasets::model::{Attribute, DataStructure, DatetimeSpec};
use ekg_core::{EkgError, EkgResult};

use crate::table::Table;

/// Default RNG seed for sampling; fixed so sampled runs are reproducible.
pub const DEFAULT_SAMPLE_SEED: u64 = 1;

/// Prepares one [`DataStructure`]'s CSV files.
pub struct TablePreparer<'a> {
    structure: &'a DataStructure,
    seed: u64,
}

impl<'a> TablePreparer<'a> {
    pub fn new(structure: &'a DataStructure) -> Self {
        Self {
            structure,
            seed: DEFAULT_SAMPLE_SEED,
        }
    }

    pub fn with_seed(structure: &'a DataStructure, seed: u64) -> Self {
        Self { structure, seed }
    }

    /// Read, sample, and prepare one file of the structure.
    pub fn prepare(
        &self,
        data_dir: &Path,
        file_name: &str,
        use_sample: bool,
    ) -> EkgResult<Table> {
        let mut table = self.read_csv(data_dir, file_name)?;
        debug!(
            table = %self.structure.name,
            file = file_name,
            rows = table.len(),
            "read raw csv"
        );

        if use_sample && self.structure.is_event_data() {
            self.apply_sample(&mut table, file_name)?;
            debug!(rows = table.len(), "sampled population");
        }

        self.apply_attributes(&mut table)?;
        let mut table = table.select(&self.declared_attribute_names())?;
        self.reformat_datetimes(&mut table)?;
        Ok(table)
    }

    /// Re-run only the attribute steps on an existing table. Idempotent.
    pub fn apply_attributes(&self, table: &mut Table) -> EkgResult<()> {
        for attribute in &self.structure.attributes {
            if !attribute.na_rep_columns.is_empty() {
                self.fill_from_paired_columns(table, attribute)?;
            }
            if let Some(na_value) = &attribute.na_rep_value {
                self.fill_missing(table, attribute, na_value, |_| true)?;
            }
            if attribute.mandatory {
                self.fill_missing(table, attribute, "Unknown", |c| c.mandatory)?;
            }
            if attribute.is_compound() {
                self.build_compound(table, attribute)?;
            } else {
                self.rename_to_attribute(table, attribute)?;
            }
        }
        Ok(())
    }

    /// The final column set: declared attribute names, first-seen order.
    pub fn declared_attribute_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for attribute in &self.structure.attributes {
            if !names.contains(&attribute.name) {
                names.push(attribute.name.clone());
            }
        }
        names
    }

    fn read_csv(&self, data_dir: &Path, file_name: &str) -> EkgResult<Table> {
        let path = data_dir
            .join(&self.structure.file_directory)
            .join(file_name);
        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();

        let required = self.structure.required_columns();
        let indices: Vec<usize> = required
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h == *name)
                    .ok_or_else(|| EkgError::MissingColumn {
                        table: self.structure.name.clone(),
                        column: (*name).to_string(),
                    })
            })
            .collect::<EkgResult<_>>()?;

        let mut table = Table::new(required.iter().map(|n| n.to_string()).collect());
        for record in reader.records() {
            let record = record?;
            let cells = indices
                .iter()
                .map(|&i| record.get(i).map(|v| self.coerce_bool(v)))
                .collect();
            table.push_row(cells);
        }
        Ok(table)
    }

    fn coerce_bool(&self, raw: &str) -> String {
        if self.structure.true_values.iter().any(|v| v == raw) {
            "true".to_string()
        } else if self.structure.false_values.iter().any(|v| v == raw) {
            "false".to_string()
        } else {
            raw.to_string()
        }
    }

    /// Restrict rows to a sampled population of the declared column.
    fn apply_sample(&self, table: &mut Table, file_name: &str) -> EkgResult<()> {
        let sample = self.structure.samples.get(file_name).ok_or_else(|| {
            EkgError::Sample(format!(
                "no sample population defined for '{}' in table '{}'",
                file_name, self.structure.name
            ))
        })?;

        let selection: HashSet<String> = if sample.use_random_sample {
            let population: Vec<String> = table
                .distinct_values(&sample.population_column)
                .into_iter()
                .map(str::to_string)
                .collect();
            if sample.size > population.len() {
                return Err(EkgError::Sample(format!(
                    "sample size {} exceeds population {} for '{}'",
                    sample.size,
                    population.len(),
                    sample.population_column
                )));
            }
            let mut rng = StdRng::seed_from_u64(self.seed);
            population
                .choose_multiple(&mut rng, sample.size)
                .cloned()
                .collect()
        } else {
            sample.ids.iter().cloned().collect()
        };

        table.retain_rows_by(&sample.population_column, |value| {
            value.is_some_and(|v| selection.contains(v))
        })
    }

    fn fill_from_paired_columns(
        &self,
        table: &mut Table,
        attribute: &Attribute,
    ) -> EkgResult<()> {
        // Validated upfront, but a preparer used standalone still gets the
        // hard error instead of misaligned pairing.
        if attribute.na_rep_columns.len() != attribute.columns.len() {
            return Err(EkgError::validation(format!(
                "attribute '{}': na_rep_columns and columns differ in length",
                attribute.name
            )));
        }

        for (column, na_column) in attribute.columns.iter().zip(&attribute.na_rep_columns) {
            let Some(target) = table.column_index(&column.name) else {
                self.require_already_prepared(table, attribute, &column.name)?;
                continue;
            };
            if !table.has_column(&na_column.name) {
                return Err(EkgError::MissingColumn {
                    table: self.structure.name.clone(),
                    column: na_column.name.clone(),
                });
            }
            for row in 0..table.len() {
                if table.get(row, &column.name).is_none() {
                    let fallback = table.get(row, &na_column.name).map(str::to_string);
                    table.set(row, target, fallback);
                }
            }
        }
        Ok(())
    }

    fn fill_missing(
        &self,
        table: &mut Table,
        attribute: &Attribute,
        value: &str,
        column_applies: impl Fn(&ekg_core::datasets::model::Column) -> bool,
    ) -> EkgResult<()> {
        for column in &attribute.columns {
            if !column_applies(column) {
                continue;
            }
            let Some(idx) = table.column_index(&column.name) else {
                self.require_already_prepared(table, attribute, &column.name)?;
                continue;
            };
            for row in 0..table.len() {
                if table.get(row, &column.name).is_none() {
                    table.set(row, idx, Some(value.to_string()));
                }
            }
        }
        Ok(())
    }

    fn build_compound(&self, table: &mut Table, attribute: &Attribute) -> EkgResult<()> {
        let missing_source = attribute
            .columns
            .iter()
            .find(|c| !table.has_column(&c.name));
        if let Some(column) = missing_source {
            // Already built by a previous run, or genuinely absent.
            return self.require_already_prepared(table, attribute, &column.name);
        }

        let separator = attribute.separator.as_deref().unwrap_or("-");
        let idx = match table.column_index(&attribute.name) {
            Some(idx) => idx,
            None => table.add_column(&attribute.name),
        };
        for row in 0..table.len() {
            let joined: Vec<&str> = attribute
                .columns
                .iter()
                .filter_map(|c| table.get(row, &c.name))
                .collect();
            table.set(row, idx, Some(joined.join(separator)));
        }
        Ok(())
    }

    fn rename_to_attribute(&self, table: &mut Table, attribute: &Attribute) -> EkgResult<()> {
        let source = &attribute.columns[0].name;
        if source == &attribute.name {
            return Ok(());
        }
        if table.has_column(source) {
            table.rename_column(source, &attribute.name)
        } else {
            self.require_already_prepared(table, attribute, source)
        }
    }

    /// A vanished source column is fine when the attribute column already
    /// exists (prepared output); otherwise the configuration names a column
    /// the table never had.
    fn require_already_prepared(
        &self,
        table: &Table,
        attribute: &Attribute,
        column: &str,
    ) -> EkgResult<()> {
        if table.has_column(&attribute.name) {
            Ok(())
        } else {
            Err(EkgError::MissingColumn {
                table: self.structure.name.clone(),
                column: column.to_string(),
            })
        }
    }

    /// Reparse and reformat datetime attributes in place.
    pub fn reformat_datetimes(&self, table: &mut Table) -> EkgResult<()> {
        for (name, spec) in self.structure.datetime_formats() {
            let Some(idx) = table.column_index(name) else {
                continue;
            };
            for row in 0..table.len() {
                let Some(raw) = table.get(row, name).map(str::to_string) else {
                    continue;
                };
                let value = reformat_datetime(spec, &raw)?;
                table.set(row, idx, Some(value));
            }
        }
        Ok(())
    }
}

/// Reformat a single raw datetime value according to its declared format.
///
/// Values that already carry the target format are passed through, which
/// keeps re-preparation idempotent.
pub fn reformat_datetime(spec: &DatetimeSpec, raw: &str) -> EkgResult<String> {
    let (value, format) = if spec.timezone_offset.is_empty() {
        (raw.to_string(), spec.format.clone())
    } else {
        (
            format!("{raw}{}", spec.timezone_offset),
            format!("{}%z", spec.format),
        )
    };

    if let Ok(dt) = DateTime::parse_from_str(&value, &format) {
        return Ok(dt.format(&spec.convert_to).to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&value, &format) {
        return Ok(dt.format(&spec.convert_to).to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&value, &format) {
        return Ok(date.format(&spec.convert_to).to_string());
    }

    // Already converted by an earlier run?
    if NaiveDateTime::parse_from_str(raw, &spec.convert_to).is_ok()
        || DateTime::parse_from_str(raw, &spec.convert_to).is_ok()
        || NaiveDate::parse_from_str(raw, &spec.convert_to).is_ok()
    {
        return Ok(raw.to_string());
    }

    Err(EkgError::Timestamp {
        value: raw.to_string(),
        format: spec.format.clone(),
    })
}
