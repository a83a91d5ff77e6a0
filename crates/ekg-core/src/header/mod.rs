//! Semantic header: the declarative description of the graph to build.

pub mod model;

use std::path::Path;

use serde::Deserialize;

use crate::error::EkgResult;
use model::{ClassSpec, EntitySpec, LogSpec, RawClass, RawEntity, RawLog, RawRelation, RelationSpec};

/// The root aggregate parsed from `<dataset>.json`.
///
/// Lists keep file order; the JSON author is responsible for ordering
/// entities before the relations that reference them. Read-only after load.
#[derive(Debug, Clone)]
pub struct SemanticHeader {
    pub name: String,
    pub version: String,
    /// All included entities, in file order, regardless of constructor kind.
    pub entities: Vec<EntitySpec>,
    pub relations: Vec<RelationSpec>,
    pub classes: Vec<ClassSpec>,
    pub log: LogSpec,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    relations: Vec<RawRelation>,
    #[serde(default)]
    classes: Vec<RawClass>,
    log: Option<RawLog>,
}

impl SemanticHeader {
    pub fn from_json_str(json: &str) -> EkgResult<Self> {
        let raw: RawHeader = serde_json::from_str(json)?;

        let mut entities = Vec::with_capacity(raw.entities.len());
        for raw_entity in raw.entities {
            if let Some(entity) = raw_entity.resolve()? {
                entities.push(entity);
            }
        }

        let relations = raw
            .relations
            .into_iter()
            .filter_map(RawRelation::resolve)
            .collect();
        let classes = raw.classes.into_iter().map(RawClass::resolve).collect();
        let log = raw.log.map(RawLog::resolve).unwrap_or_default();

        Ok(Self {
            name: raw.name,
            version: raw.version.unwrap_or_else(|| "1.0".to_string()),
            entities,
            relations,
            classes,
            log,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> EkgResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Entities constructed from nodes, in file order.
    pub fn entities_from_nodes(&self) -> impl Iterator<Item = &EntitySpec> {
        self.entities.iter().filter(|e| {
            matches!(e.constructed_by, model::EntityConstructor::Node { .. })
        })
    }

    /// Reified entities (constructed from relations), in file order.
    pub fn entities_from_relations(&self) -> impl Iterator<Item = &EntitySpec> {
        self.entities.iter().filter(|e| e.is_reified())
    }

    /// Entities constructed by a verbatim query, in file order.
    pub fn entities_from_query(&self) -> impl Iterator<Item = &EntitySpec> {
        self.entities.iter().filter(|e| {
            matches!(e.constructed_by, model::EntityConstructor::Query { .. })
        })
    }

    /// Look up an entity by type name.
    pub fn entity(&self, entity_type: &str) -> Option<&EntitySpec> {
        self.entities.iter().find(|e| e.entity_type == entity_type)
    }

    /// Look up a relation by type name.
    pub fn relation(&self, rel_type: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.rel_type == rel_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"{
        "name": "BPIC17",
        "version": "1.1",
        "entities": [
            {
                "type": "Application",
                "primary_keys": ["case"],
                "corr": true,
                "df": true,
                "constructed_by_node": {"node_label": "Event"}
            },
            {
                "type": "Workflow",
                "primary_keys": ["case"],
                "include": false,
                "constructed_by_node": {"node_label": "Event"}
            },
            {
                "type": "CaseAO",
                "primary_keys": ["caseAO"],
                "corr": true,
                "df": true,
                "delete_parallel_df": true,
                "constructed_by_relation": {"relation_type": "AO"}
            }
        ],
        "relations": [
            {
                "type": "AO",
                "from_node_label": "Application",
                "to_node_label": "Offer",
                "foreign_key": "case",
                "include": true
            },
            {
                "type": "AW",
                "from_node_label": "Application",
                "to_node_label": "Workflow",
                "foreign_key": "case",
                "include": false
            }
        ],
        "classes": [
            {"class_identifiers": ["Activity", "lifecycle"]}
        ],
        "log": {"include": true, "has": true}
    }"#;

    #[test]
    fn excluded_objects_are_absent_from_lists() {
        let header = SemanticHeader::from_json_str(HEADER).unwrap();
        assert_eq!(header.entities.len(), 2);
        assert!(header.entity("Workflow").is_none());
        assert_eq!(header.relations.len(), 1);
        assert!(header.relation("AW").is_none());
    }

    #[test]
    fn entities_partition_by_constructor() {
        let header = SemanticHeader::from_json_str(HEADER).unwrap();
        let by_node: Vec<_> = header.entities_from_nodes().collect();
        let by_rel: Vec<_> = header.entities_from_relations().collect();
        assert_eq!(by_node.len(), 1);
        assert_eq!(by_node[0].entity_type, "Application");
        assert_eq!(by_rel.len(), 1);
        assert_eq!(by_rel[0].entity_type, "CaseAO");
        assert!(by_rel[0].delete_parallel_df);
    }

    #[test]
    fn log_defaults_when_absent() {
        let header =
            SemanticHeader::from_json_str(r#"{"name": "X", "entities": []}"#).unwrap();
        assert!(header.log.include);
        assert!(header.log.has);
        assert_eq!(header.version, "1.0");
    }

    #[test]
    fn class_label_defaults_to_event() {
        let header = SemanticHeader::from_json_str(HEADER).unwrap();
        assert_eq!(header.classes[0].label, "Event");
    }
}
