//! In-memory tabular batch.
//!
//! Cells are optional strings; `None` is a missing value. CSV sources encode
//! missing values as either an empty cell or the literal string `nan`
//! (stringified float NaN); both are normalized to `None` on entry.

use ekg_core::{EkgError, EkgResult};

/// True when a raw cell value counts as missing.
pub fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "nan"
}

/// A small column-addressed table of string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Push a row; normalizes missing-value spellings to `None`.
    pub fn push_row(&mut self, cells: Vec<Option<String>>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        let normalized = cells
            .into_iter()
            .map(|cell| cell.filter(|v| !is_missing(v)))
            .collect();
        self.rows.push(normalized);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows[row][idx].as_deref()
    }

    pub fn set(&mut self, row: usize, column_idx: usize, value: Option<String>) {
        self.rows[row][column_idx] = value.filter(|v| !is_missing(v));
    }

    /// Append a new empty column, returning its index.
    pub fn add_column(&mut self, name: &str) -> usize {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> EkgResult<()> {
        match self.columns.iter_mut().find(|c| *c == from) {
            Some(column) => {
                *column = to.to_string();
                Ok(())
            }
            None => Err(EkgError::MissingColumn {
                table: String::new(),
                column: from.to_string(),
            }),
        }
    }

    /// Subset and reorder columns to exactly `names`.
    pub fn select(&self, names: &[String]) -> EkgResult<Table> {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| EkgError::MissingColumn {
                    table: String::new(),
                    column: name.clone(),
                })
            })
            .collect::<EkgResult<_>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            columns: names.to_vec(),
            rows,
        })
    }

    /// Keep only rows whose value in `column` satisfies the predicate.
    pub fn retain_rows_by(
        &mut self,
        column: &str,
        mut keep: impl FnMut(Option<&str>) -> bool,
    ) -> EkgResult<()> {
        let idx = self.column_index(column).ok_or_else(|| EkgError::MissingColumn {
            table: String::new(),
            column: column.to_string(),
        })?;
        self.rows.retain(|row| keep(row[idx].as_deref()));
        Ok(())
    }

    /// Iterate rows as (column name, value) pairs, skipping missing cells.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &str)>> {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .zip(row.iter())
                .filter_map(|(name, cell)| cell.as_deref().map(|v| (name.as_str(), v)))
                .collect()
        })
    }

    /// Distinct non-missing values of a column, in first-seen order.
    pub fn distinct_values(&self, column: &str) -> Vec<&str> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let mut seen: Vec<&str> = Vec::new();
        for row in &self.rows {
            if let Some(value) = row[idx].as_deref() {
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn missing_value_spellings_normalize_to_none() {
        let mut table = Table::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(cells(&["x", "nan", ""]));
        assert_eq!(table.get(0, "a"), Some("x"));
        assert_eq!(table.get(0, "b"), None);
        assert_eq!(table.get(0, "c"), None);
    }

    #[test]
    fn select_reorders_and_subsets() {
        let mut table = Table::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(cells(&["1", "2", "3"]));
        let selected = table.select(&["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(selected.columns(), ["c", "a"]);
        assert_eq!(selected.get(0, "c"), Some("3"));
        assert_eq!(selected.get(0, "a"), Some("1"));
    }

    #[test]
    fn select_unknown_column_errors() {
        let table = Table::new(vec!["a".into()]);
        assert!(table.select(&["missing".to_string()]).is_err());
    }

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let mut table = Table::new(vec!["k".into()]);
        for v in ["b", "a", "b", "c", "a"] {
            table.push_row(cells(&[v]));
        }
        assert_eq!(table.distinct_values("k"), vec!["b", "a", "c"]);
    }

    #[test]
    fn retain_rows_filters_on_column_value() {
        let mut table = Table::new(vec!["k".into()]);
        for v in ["keep", "drop", "keep"] {
            table.push_row(cells(&[v]));
        }
        table.retain_rows_by("k", |v| v == Some("keep")).unwrap();
        assert_eq!(table.len(), 2);
    }
}
