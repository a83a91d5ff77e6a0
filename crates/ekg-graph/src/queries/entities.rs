//! Entity node creation and event correlation.

use ekg_core::header::model::{EntityConstructor, EntitySpec};

use super::{attribute_aliases, composed_id, entity_label_string, node_properties, where_condition};

/// Merge one entity node per distinct primary-key combination found on the
/// source nodes. Entities whose composed id is the `"Unknown"` filler are
/// skipped.
pub fn create_entity(spec: &EntitySpec) -> Option<String> {
    let node_label = match &spec.constructed_by {
        EntityConstructor::Node { node_label, .. } => node_label,
        _ => return None,
    };

    Some(format!(
        "MATCH (e:{node_label}) WHERE {conditions} \
         WITH {id} AS id, {attributes} \
         WHERE id <> \"Unknown\" \
         MERGE (en:{labels} {{ID: id, uID: \"{entity_type}_\"+toString(id), \
         entityType: \"{entity_type}\", {properties}}})",
        conditions = where_condition(spec, "e"),
        id = composed_id("e", &spec.primary_keys),
        attributes = attribute_aliases("e", &spec.entity_attributes),
        labels = entity_label_string(spec),
        entity_type = spec.entity_type,
        properties = node_properties(&spec.entity_attributes),
    ))
}

/// The verbatim query of a query-constructed entity, if any.
pub fn constructor_query(spec: &EntitySpec) -> Option<&str> {
    match &spec.constructed_by {
        EntityConstructor::Query { query } => Some(query),
        _ => None,
    }
}

/// Link each event carrying an entity's keys to that entity node with CORR.
pub fn correlate_events(spec: &EntitySpec) -> String {
    format!(
        "MATCH (e:Event) WHERE {conditions} \
         WITH e, {id} AS id \
         MATCH (n:{labels}) WHERE id = n.ID \
         MERGE (e)-[:CORR]->(n)",
        conditions = where_condition(spec, "e"),
        id = composed_id("e", &spec.primary_keys),
        labels = entity_label_string(spec),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekg_core::header::model::{Condition, EntityConstructor};

    fn application_spec() -> EntitySpec {
        EntitySpec {
            entity_type: "Application".to_string(),
            constructed_by: EntityConstructor::Node {
                node_label: "Event".to_string(),
                conditions: vec![],
            },
            labels: vec!["Application".to_string()],
            primary_keys: vec!["case".to_string()],
            entity_attributes: vec!["case".to_string()],
            attributes_wo_primary_keys: vec![],
            corr: true,
            df: true,
            include_label_in_df: false,
            merge_duplicate_df: false,
            delete_parallel_df: false,
        }
    }

    #[test]
    fn create_entity_merges_with_uid() {
        let cypher = create_entity(&application_spec()).unwrap();
        assert!(cypher.contains("MATCH (e:Event)"));
        assert!(cypher.contains("WHERE id <> \"Unknown\""));
        assert!(cypher.contains("MERGE (en:Entity:Application"));
        assert!(cypher.contains("uID: \"Application_\"+toString(id)"));
        assert!(cypher.contains("entityType: \"Application\""));
    }

    #[test]
    fn create_entity_is_none_for_other_constructors() {
        let mut spec = application_spec();
        spec.constructed_by = EntityConstructor::Query {
            query: "MATCH (n) RETURN n".to_string(),
        };
        assert!(create_entity(&spec).is_none());
        assert_eq!(constructor_query(&spec), Some("MATCH (n) RETURN n"));
    }

    #[test]
    fn correlation_matches_on_composed_id() {
        let mut spec = application_spec();
        spec.constructed_by = EntityConstructor::Node {
            node_label: "Event".to_string(),
            conditions: vec![Condition {
                attribute: "EventOrigin".to_string(),
                values: vec![],
            }],
        };
        let cypher = correlate_events(&spec);
        assert!(cypher.contains("WITH e, e.case AS id"));
        assert!(cypher.contains("MATCH (n:Entity:Application) WHERE id = n.ID"));
        assert!(cypher.contains("MERGE (e)-[:CORR]->(n)"));
        assert!(cypher.contains("e.EventOrigin IS NOT NULL"));
    }
}
