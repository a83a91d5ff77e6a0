//! Raw-table shape: which CSV columns feed which attributes.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

/// A source column of a raw CSV file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub dtype: Option<String>,
    #[serde(default = "default_true")]
    pub mandatory: bool,
}

/// How a datetime attribute is reparsed and reformatted.
///
/// `format` and `convert_to` are chrono strftime patterns; when
/// `timezone_offset` is set it is appended to the raw value before parsing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatetimeSpec {
    pub format: String,
    #[serde(default)]
    pub timezone_offset: String,
    pub convert_to: String,
}

/// One declared attribute of a prepared table.
///
/// Backed by one source column (rename) or several (compound, joined with
/// `separator`). Missing-value handling runs in a fixed order: paired column
/// fill, scalar fill, then `"Unknown"` for mandatory columns.
#[derive(Debug, Clone, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default, rename = "datetime_object")]
    pub datetime: Option<DatetimeSpec>,
    #[serde(default)]
    pub na_rep_value: Option<String>,
    #[serde(default)]
    pub na_rep_columns: Vec<Column>,
    #[serde(default)]
    pub filter_include_values: Option<Vec<String>>,
    #[serde(default)]
    pub filter_exclude_values: Option<Vec<String>>,
    #[serde(default)]
    pub use_filter: Option<bool>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
}

impl Attribute {
    pub fn is_compound(&self) -> bool {
        self.columns.len() > 1
    }

    pub fn is_datetime(&self) -> bool {
        self.datetime.is_some()
    }

    /// A filter applies when requested explicitly, or by default when either
    /// value list is declared.
    pub fn uses_filter(&self) -> bool {
        self.use_filter.unwrap_or(
            self.filter_include_values.is_some() || self.filter_exclude_values.is_some(),
        )
    }
}

/// Per-file sampling declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    pub file_name: String,
    #[serde(default)]
    pub use_random_sample: bool,
    pub population_column: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// One raw table: its files, node labels, and attribute declarations.
#[derive(Debug, Clone, Deserialize)]
pub struct DataStructure {
    #[serde(default = "default_true")]
    pub include: bool,
    pub name: String,
    pub file_directory: String,
    pub file_names: Vec<String>,
    pub labels: Vec<String>,
    #[serde(default)]
    pub true_values: Vec<String>,
    #[serde(default)]
    pub false_values: Vec<String>,
    #[serde(default, deserialize_with = "samples_by_file")]
    pub samples: HashMap<String, Sample>,
    pub attributes: Vec<Attribute>,
}

fn default_true() -> bool {
    true
}

fn samples_by_file<'de, D>(deserializer: D) -> Result<HashMap<String, Sample>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let samples: Vec<Sample> = Vec::deserialize(deserializer)?;
    Ok(samples
        .into_iter()
        .map(|s| (s.file_name.clone(), s))
        .collect())
}

impl DataStructure {
    /// Tables labelled `Event` hold event data; others are static node tables.
    pub fn is_event_data(&self) -> bool {
        self.labels.iter().any(|l| l == "Event")
    }

    pub fn primary_keys(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.is_primary_key)
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn foreign_keys(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.is_foreign_key)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Source columns needed from the CSV, in first-seen order.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for attribute in &self.attributes {
            for column in attribute.columns.iter().chain(&attribute.na_rep_columns) {
                if !columns.contains(&column.name.as_str()) {
                    columns.push(&column.name);
                }
            }
        }
        columns
    }

    /// Declared dtypes per source column; conflicting declarations keep the
    /// first one and warn.
    pub fn dtype_map(&self) -> HashMap<&str, &str> {
        let mut dtypes: HashMap<&str, &str> = HashMap::new();
        for attribute in &self.attributes {
            for column in &attribute.columns {
                let Some(dtype) = column.dtype.as_deref() else {
                    continue;
                };
                match dtypes.get(column.name.as_str()) {
                    None => {
                        dtypes.insert(&column.name, dtype);
                    }
                    Some(existing) if *existing != dtype => {
                        warn!(
                            column = %column.name,
                            kept = %existing,
                            ignored = %dtype,
                            "multiple dtypes declared for column"
                        );
                    }
                    Some(_) => {}
                }
            }
        }
        dtypes
    }

    /// Datetime attributes and their parse/format specs.
    pub fn datetime_formats(&self) -> Vec<(&str, &DatetimeSpec)> {
        self.attributes
            .iter()
            .filter_map(|a| a.datetime.as_ref().map(|dt| (a.name.as_str(), dt)))
            .collect()
    }

    /// Attribute/value pairs that filter imported events.
    ///
    /// `None` values mean "filter on presence of the attribute alone".
    pub fn filtered_attribute_values(
        &self,
        exclude: bool,
    ) -> Vec<(&str, Option<&[String]>)> {
        self.attributes
            .iter()
            .filter(|a| a.uses_filter())
            .filter_map(|a| {
                let values = if exclude {
                    &a.filter_exclude_values
                } else {
                    &a.filter_include_values
                };
                match (exclude, values) {
                    // an include filter with no include list (or vice versa)
                    // contributes nothing for this polarity
                    (_, Some(v)) => Some((a.name.as_str(), Some(v.as_slice()))),
                    (true, None) if a.filter_include_values.is_none() => {
                        Some((a.name.as_str(), None))
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(json: &str) -> DataStructure {
        serde_json::from_str(json).unwrap()
    }

    const OFFERS: &str = r#"{
        "name": "Offers",
        "file_directory": "data/bpic17",
        "file_names": ["offers.csv"],
        "labels": ["Event"],
        "attributes": [
            {"name": "OfferID", "columns": [{"name": "OfferID", "dtype": "str"}],
             "is_primary_key": true, "mandatory": true},
            {"name": "activity_lifecycle",
             "columns": [{"name": "Activity"}, {"name": "lifecycle"}],
             "separator": "+"},
            {"name": "timestamp",
             "columns": [{"name": "time"}],
             "datetime_object": {"format": "%Y/%m/%d %H:%M:%S", "convert_to": "%Y-%m-%dT%H:%M:%S"}},
            {"name": "org", "columns": [{"name": "resource", "dtype": "str"}],
             "filter_exclude_values": ["SYSTEM"]}
        ]
    }"#;

    #[test]
    fn event_table_detection_and_keys() {
        let ds = structure(OFFERS);
        assert!(ds.is_event_data());
        assert_eq!(ds.primary_keys(), vec!["OfferID"]);
        assert!(ds.foreign_keys().is_empty());
    }

    #[test]
    fn required_columns_keep_declaration_order() {
        let ds = structure(OFFERS);
        assert_eq!(
            ds.required_columns(),
            vec!["OfferID", "Activity", "lifecycle", "time", "resource"]
        );
    }

    #[test]
    fn compound_and_datetime_flags() {
        let ds = structure(OFFERS);
        assert!(ds.attributes[1].is_compound());
        assert!(ds.attributes[2].is_datetime());
        assert!(!ds.attributes[0].is_compound());
    }

    #[test]
    fn filter_defaults_from_value_lists() {
        let ds = structure(OFFERS);
        assert!(ds.attributes[3].uses_filter());
        assert!(!ds.attributes[0].uses_filter());
        let excluded = ds.filtered_attribute_values(true);
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].0, "org");
        assert_eq!(excluded[0].1.unwrap(), ["SYSTEM".to_string()]);
        assert!(ds.filtered_attribute_values(false).is_empty());
    }

    #[test]
    fn column_mandatory_defaults_to_true() {
        let ds = structure(OFFERS);
        assert!(ds.attributes[0].columns[0].mandatory);
    }
}
