//! Typed entity-to-entity relations and their reification into entities.

use ekg_core::header::model::{EntityConstructor, EntitySpec, RelationSpec};

use super::{attribute_aliases, composed_id, entity_label_string, node_properties, where_condition};

/// Create a typed relation between two entity types through a foreign key.
/// The foreign key may hold a single id or a list of ids.
pub fn create_relation(relation: &RelationSpec) -> String {
    let from = &relation.from_node_label;
    let to = &relation.to_node_label;
    format!(
        "MATCH (_from:{from}) \
         MATCH (to:{to}) \
         WHERE to <> _from AND (to.{pk} IN _from.{fk} OR to.{pk} = _from.{fk}) \
         WITH DISTINCT _from, to \
         MERGE (_from)-[:{rel_type} {{type: \"Rel\", {from_id}: _from.ID, {to_id}: to.{pk}}}]->(to)",
        pk = relation.primary_key,
        fk = relation.foreign_key,
        rel_type = relation.rel_type.to_uppercase(),
        from_id = format!("{}Id", from.to_lowercase()),
        to_id = format!("{}Id", to.to_lowercase()),
    )
}

/// Materialize a relation-constructed entity: one entity node per relation
/// instance, keyed by the relation's carried ids.
pub fn reify_relation(spec: &EntitySpec) -> Option<String> {
    let relation_type = reified_relation_type(spec)?;
    Some(format!(
        "MATCH (n1)-[r:{relation_type}]->(n2) WHERE {conditions} \
         WITH {id} AS id, {attributes} \
         MERGE (en:{labels} {{ID: id, uID: \"{entity_type}_\"+toString(id), \
         entityType: \"{entity_type}\", {properties}}})",
        conditions = where_condition(spec, "r"),
        id = composed_id("r", &spec.primary_keys),
        attributes = attribute_aliases("r", &spec.entity_attributes),
        labels = entity_label_string(spec),
        entity_type = spec.entity_type,
        properties = node_properties(&spec.entity_attributes),
    ))
}

/// Link a reified entity back to the two endpoints of its source relation.
pub fn link_reified(spec: &EntitySpec) -> Option<String> {
    let relation_type = reified_relation_type(spec)?;
    Some(format!(
        "MATCH (n1)-[r:{relation_type}]->(n2) WHERE {conditions} \
         WITH n1, n2, {id} AS id \
         MATCH (reified:{labels}) WHERE id = reified.ID \
         MERGE (n1)<-[:REIFIED]-(reified)-[:REIFIED]->(n2)",
        conditions = where_condition(spec, "r"),
        id = composed_id("r", &spec.primary_keys),
        labels = entity_label_string(spec),
    ))
}

/// Correlate events of the underlying entities to the reified entity.
pub fn correlate_events_to_reified(spec: &EntitySpec) -> String {
    format!(
        "MATCH (e:Event)-[:CORR]->(n:Entity)<-[:REIFIED]-(r:{labels}) \
         MERGE (e)-[:CORR]->(r)",
        labels = entity_label_string(spec),
    )
}

fn reified_relation_type(spec: &EntitySpec) -> Option<&str> {
    match &spec.constructed_by {
        EntityConstructor::Relation { relation_type, .. } => Some(relation_type),
        _ => None,
    }
}
