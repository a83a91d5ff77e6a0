//! Semantic header domain models.
//!
//! The semantic header is the declarative JSON description of which entities,
//! relations, and event classes the graph builder derives from imported
//! events. Objects are parsed from a raw serde shape and resolved once into
//! immutable specs; anything with `include: false` is dropped during
//! resolution rather than carried around as an inactive flag.

use serde::Deserialize;

use crate::error::{EkgError, EkgResult};

/// A filter condition on an attribute of the source node or relation.
///
/// An empty value list means "the attribute exists and is not a stringified
/// missing value" (the `nan`/`None` literals produced by table preparation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub attribute: String,
    pub values: Vec<String>,
}

impl Condition {
    /// True when this condition only requires the attribute to be present.
    pub fn is_existence_only(&self) -> bool {
        self.values.is_empty()
    }
}

/// How an entity's nodes are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityConstructor {
    /// Merge entity nodes out of nodes with the given label (usually `Event`).
    Node {
        node_label: String,
        conditions: Vec<Condition>,
    },
    /// Materialize an existing relation type as a first-class entity.
    Relation {
        relation_type: String,
        conditions: Vec<Condition>,
    },
    /// Run a user-supplied query verbatim.
    Query { query: String },
}

/// A derived entity type.
///
/// Flag chaining is resolved at parse time: `df` can only be true when `corr`
/// is, and the DF refinement flags can only be true when `df` is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpec {
    pub entity_type: String,
    pub constructed_by: EntityConstructor,
    /// Label set for created nodes; the entity type always comes first and
    /// the generic `Entity` label is kept out (it is added by rendering).
    pub labels: Vec<String>,
    pub primary_keys: Vec<String>,
    /// All node properties, primary keys included.
    pub entity_attributes: Vec<String>,
    /// Convenience partition of `entity_attributes` minus `primary_keys`.
    pub attributes_wo_primary_keys: Vec<String>,
    pub corr: bool,
    pub df: bool,
    pub include_label_in_df: bool,
    pub merge_duplicate_df: bool,
    pub delete_parallel_df: bool,
}

impl EntitySpec {
    /// Entities constructed from a relation are "reified" entities.
    pub fn is_reified(&self) -> bool {
        matches!(self.constructed_by, EntityConstructor::Relation { .. })
    }

    pub fn conditions(&self) -> &[Condition] {
        match &self.constructed_by {
            EntityConstructor::Node { conditions, .. }
            | EntityConstructor::Relation { conditions, .. } => conditions,
            EntityConstructor::Query { .. } => &[],
        }
    }
}

/// A typed relation between two entity types, joined through a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    pub rel_type: String,
    pub from_node_label: String,
    pub to_node_label: String,
    pub primary_key: String,
    pub foreign_key: String,
}

/// An event classifier: the attribute tuple that groups events into classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpec {
    pub label: String,
    pub class_identifiers: Vec<String>,
}

/// Log-node construction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSpec {
    pub include: bool,
    /// When true, events are linked to their log node with `[:HAS]`.
    pub has: bool,
}

impl Default for LogSpec {
    fn default() -> Self {
        Self {
            include: true,
            has: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw serde shapes + resolution
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCondition {
    attribute: String,
    #[serde(default)]
    values: Option<Vec<serde_json::Value>>,
}

impl RawCondition {
    fn resolve(self) -> Condition {
        let values = self
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Condition {
            attribute: self.attribute,
            values,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawNodeConstructor {
    node_label: String,
    #[serde(default)]
    conditions: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRelationConstructor {
    relation_type: String,
    #[serde(default)]
    conditions: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueryConstructor {
    query: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEntity {
    #[serde(default = "default_true")]
    include: bool,
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(default)]
    labels: Vec<String>,
    primary_keys: Vec<String>,
    #[serde(default)]
    entity_attributes: Vec<String>,
    #[serde(default)]
    corr: bool,
    #[serde(default)]
    df: bool,
    #[serde(default)]
    include_label_in_df: bool,
    #[serde(default)]
    merge_duplicate_df: bool,
    #[serde(default)]
    delete_parallel_df: bool,
    constructed_by_node: Option<RawNodeConstructor>,
    constructed_by_relation: Option<RawRelationConstructor>,
    constructed_by_query: Option<RawQueryConstructor>,
}

impl RawEntity {
    /// Resolve into an [`EntitySpec`], or `None` when excluded.
    pub(crate) fn resolve(self) -> EkgResult<Option<EntitySpec>> {
        if !self.include {
            return Ok(None);
        }

        let constructed_by = match (
            self.constructed_by_node,
            self.constructed_by_relation,
            self.constructed_by_query,
        ) {
            (Some(node), None, None) => EntityConstructor::Node {
                node_label: node.node_label,
                conditions: node.conditions.into_iter().map(RawCondition::resolve).collect(),
            },
            (None, Some(rel), None) => EntityConstructor::Relation {
                relation_type: rel.relation_type,
                conditions: rel.conditions.into_iter().map(RawCondition::resolve).collect(),
            },
            (None, None, Some(q)) => EntityConstructor::Query { query: q.query },
            (None, None, None) => {
                return Err(EkgError::validation(format!(
                    "entity '{}' has no constructor (expected one of constructed_by_node, \
                     constructed_by_relation, constructed_by_query)",
                    self.entity_type
                )))
            }
            _ => {
                return Err(EkgError::validation(format!(
                    "entity '{}' declares more than one constructor",
                    self.entity_type
                )))
            }
        };

        if self.primary_keys.is_empty() {
            return Err(EkgError::validation(format!(
                "entity '{}' declares no primary keys",
                self.entity_type
            )));
        }

        // Normalize labels: the entity type leads, the generic `Entity`
        // label is stripped (rendering prepends it).
        let mut labels: Vec<String> =
            self.labels.into_iter().filter(|l| l != "Entity").collect();
        if !labels.contains(&self.entity_type) {
            labels.insert(0, self.entity_type.clone());
        }

        // Primary keys are node properties too; fold missing ones in front.
        let mut entity_attributes = self.entity_attributes;
        for (i, key) in self.primary_keys.iter().enumerate() {
            if !entity_attributes.contains(key) {
                entity_attributes.insert(i, key.clone());
            }
        }
        let attributes_wo_primary_keys = entity_attributes
            .iter()
            .filter(|a| !self.primary_keys.contains(a))
            .cloned()
            .collect();

        // Inclusion chaining: df requires corr, the DF refinements require df.
        let corr = self.corr;
        let df = corr && self.df;
        let include_label_in_df = df && self.include_label_in_df;
        let merge_duplicate_df = df && self.merge_duplicate_df;
        let delete_parallel_df = df && self.delete_parallel_df;

        Ok(Some(EntitySpec {
            entity_type: self.entity_type,
            constructed_by,
            labels,
            primary_keys: self.primary_keys,
            entity_attributes,
            attributes_wo_primary_keys,
            corr,
            df,
            include_label_in_df,
            merge_duplicate_df,
            delete_parallel_df,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRelation {
    #[serde(default = "default_true")]
    include: bool,
    #[serde(rename = "type")]
    rel_type: String,
    from_node_label: String,
    to_node_label: String,
    #[serde(default = "default_primary_key")]
    primary_key: String,
    foreign_key: String,
}

fn default_primary_key() -> String {
    "ID".to_string()
}

impl RawRelation {
    pub(crate) fn resolve(self) -> Option<RelationSpec> {
        if !self.include {
            return None;
        }
        Some(RelationSpec {
            rel_type: self.rel_type,
            from_node_label: self.from_node_label,
            to_node_label: self.to_node_label,
            primary_key: self.primary_key,
            foreign_key: self.foreign_key,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawClass {
    #[serde(default = "default_class_label")]
    label: String,
    class_identifiers: Vec<String>,
}

fn default_class_label() -> String {
    "Event".to_string()
}

impl RawClass {
    pub(crate) fn resolve(self) -> ClassSpec {
        ClassSpec {
            label: self.label,
            class_identifiers: self.class_identifiers,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLog {
    #[serde(default = "default_true")]
    include: bool,
    #[serde(default = "default_true")]
    has: bool,
}

impl RawLog {
    pub(crate) fn resolve(self) -> LogSpec {
        LogSpec {
            include: self.include,
            // `has` is meaningless without a log node.
            has: self.include && self.has,
        }
    }
}
