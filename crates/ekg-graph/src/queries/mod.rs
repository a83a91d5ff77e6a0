//! Cypher rendering for the graph construction pipeline.
//!
//! Each submodule holds pure functions from parsed header specs to Cypher
//! strings, so the rendered shape can be unit tested without a database.
//! The builder wraps the strings in [`neo4rs::Query`] values.

pub mod classes;
pub mod df;
pub mod entities;
pub mod log;
pub mod relations;

use ekg_core::header::model::{Condition, EntitySpec};

/// Quote a value as a Cypher string literal.
pub(crate) fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Full label string for entity nodes: `Entity:<Type>[:extra…]`.
pub fn entity_label_string(spec: &EntitySpec) -> String {
    format!("Entity:{}", spec.labels.join(":"))
}

/// DF edge label: `DF`, or `DF_<TYPE>` when the entity type goes in the label.
pub fn df_label(spec: &EntitySpec) -> String {
    if spec.include_label_in_df {
        format!("DF_{}", spec.entity_type.to_uppercase())
    } else {
        "DF".to_string()
    }
}

/// Aggregated DF edge label: `DF_C`, or `DF_C_<TYPE>`.
pub fn dfc_label(spec: &EntitySpec) -> String {
    if spec.include_label_in_df {
        format!("DF_C_{}", spec.entity_type.to_uppercase())
    } else {
        "DF_C".to_string()
    }
}

/// Primary keys combined into one id expression, joined with `"-"`.
pub fn composed_id(alias: &str, keys: &[String]) -> String {
    keys.iter()
        .map(|key| format!("{alias}.{key}"))
        .collect::<Vec<_>>()
        .join("+\"-\"+")
}

/// `alias.key AS key` projections for carrying attributes through a WITH.
pub fn attribute_aliases(alias: &str, attributes: &[String]) -> String {
    attributes
        .iter()
        .map(|key| format!("{alias}.{key} AS {key}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `key: key` property assignments for a node pattern.
pub fn node_properties(keys: &[String]) -> String {
    keys.iter()
        .map(|key| format!("{key}: {key}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn primary_key_exists(alias: &str, keys: &[String]) -> String {
    keys.iter()
        .map(|key| {
            format!(
                "{alias}.{key} IS NOT NULL AND {alias}.{key} <> \"nan\" AND {alias}.{key} <> \"None\""
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn extra_conditions(alias: &str, conditions: &[Condition]) -> Vec<String> {
    let mut clauses = Vec::new();
    for condition in conditions {
        if condition.is_existence_only() {
            clauses.push(format!("{alias}.{} IS NOT NULL", condition.attribute));
        }
        for value in &condition.values {
            clauses.push(format!("{alias}.{} = {}", condition.attribute, quote(value)));
        }
    }
    clauses
}

/// The full WHERE condition for an entity: primary keys present and not a
/// missing-value marker, plus any declared attribute/value conditions.
pub fn where_condition(spec: &EntitySpec, alias: &str) -> String {
    let mut clauses = vec![primary_key_exists(alias, &spec.primary_keys)];
    clauses.extend(extra_conditions(alias, spec.conditions()));
    clauses.join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekg_core::header::model::EntityConstructor;

    fn offer_spec() -> EntitySpec {
        EntitySpec {
            entity_type: "Offer".to_string(),
            constructed_by: EntityConstructor::Node {
                node_label: "Event".to_string(),
                conditions: vec![Condition {
                    attribute: "EventOrigin".to_string(),
                    values: vec!["Offer".to_string()],
                }],
            },
            labels: vec!["Offer".to_string()],
            primary_keys: vec!["OfferID".to_string()],
            entity_attributes: vec!["OfferID".to_string()],
            attributes_wo_primary_keys: vec![],
            corr: true,
            df: true,
            include_label_in_df: true,
            merge_duplicate_df: false,
            delete_parallel_df: false,
        }
    }

    #[test]
    fn labels_follow_conventions() {
        let spec = offer_spec();
        assert_eq!(entity_label_string(&spec), "Entity:Offer");
        assert_eq!(df_label(&spec), "DF_OFFER");
        assert_eq!(dfc_label(&spec), "DF_C_OFFER");

        let mut plain = spec;
        plain.include_label_in_df = false;
        assert_eq!(df_label(&plain), "DF");
        assert_eq!(dfc_label(&plain), "DF_C");
    }

    #[test]
    fn composed_id_joins_with_dash() {
        let keys = vec!["case".to_string(), "resource".to_string()];
        assert_eq!(composed_id("e", &keys), "e.case+\"-\"+e.resource");
    }

    #[test]
    fn where_condition_includes_value_filters() {
        let cond = where_condition(&offer_spec(), "e");
        assert!(cond.contains("e.OfferID IS NOT NULL"));
        assert!(cond.contains("e.OfferID <> \"nan\""));
        assert!(cond.contains("e.EventOrigin = \"Offer\""));
    }

    #[test]
    fn quoting_escapes_literals() {
        assert_eq!(quote("O\"1\""), "\"O\\\"1\\\"\"");
    }
}
