//! Raw-table declarations loaded from `<dataset>_DS.json`.

pub mod model;

use std::path::Path;

use crate::error::EkgResult;
use model::DataStructure;

/// The declared tables of one dataset, `include: false` entries dropped.
#[derive(Debug, Clone)]
pub struct DataSets {
    pub structures: Vec<DataStructure>,
}

impl DataSets {
    pub fn from_json_str(json: &str) -> EkgResult<Self> {
        let raw: Vec<DataStructure> = serde_json::from_str(json)?;
        let structures = raw.into_iter().filter(|s| s.include).collect();
        Ok(Self { structures })
    }

    pub fn load(path: impl AsRef<Path>) -> EkgResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_structures_are_dropped() {
        let json = r#"[
            {"name": "A", "file_directory": "d", "file_names": [], "labels": ["Event"],
             "attributes": []},
            {"name": "B", "include": false, "file_directory": "d", "file_names": [],
             "labels": ["Event"], "attributes": []}
        ]"#;
        let sets = DataSets::from_json_str(json).unwrap();
        assert_eq!(sets.structures.len(), 1);
        assert_eq!(sets.structures[0].name, "A");
    }
}
