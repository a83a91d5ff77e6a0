//! Event class nodes, OBSERVED links and class-level DF aggregation.

use ekg_core::header::model::{ClassSpec, EntitySpec};

use super::{df_label, dfc_label, quote};

/// The combined class identifier expression, e.g. `activity+lifecycle`.
fn class_type(class: &ClassSpec) -> String {
    class.class_identifiers.join("+")
}

/// The label suffix, e.g. `Class_activity_lifecycle`.
fn class_label(class: &ClassSpec) -> String {
    class.class_identifiers.join("_")
}

/// Merge one class node per distinct identifier tuple over the events.
pub fn create_class(class: &ClassSpec) -> String {
    let not_null = class
        .class_identifiers
        .iter()
        .map(|key| format!("e.{key} IS NOT NULL"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let group_by = class
        .class_identifiers
        .iter()
        .map(|key| format!("e.{key} AS {key}"))
        .collect::<Vec<_>>()
        .join(", ");
    let properties = class
        .class_identifiers
        .iter()
        .map(|key| format!("{key}: {key}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "MATCH (e:{label}) WHERE {not_null} \
         WITH DISTINCT {group_by} \
         MERGE (c:Class:Class_{class_label} {{cID: {cid}, {properties}, classType: {class_type}}})",
        label = class.label,
        class_label = class_label(class),
        cid = class_type(class),
        class_type = quote(&class_type(class)),
    )
}

/// Link each event to the class node matching its identifier values.
pub fn link_events_to_class(class: &ClassSpec) -> String {
    let link_condition = class
        .class_identifiers
        .iter()
        .map(|key| format!("c.{key} = e.{key}"))
        .collect::<Vec<_>>()
        .join(" AND ");

    format!(
        "MATCH (c:Class_{class_label}) \
         MATCH (e:Event) WHERE {link_condition} \
         MERGE (e)-[:OBSERVED]->(c)",
        class_label = class_label(class),
    )
}

/// Aggregate an entity's DF edges to class level as DF_C edges carrying the
/// observed frequency. With thresholds, weak edges are dropped the way a
/// heuristics miner would: absolute frequency first, then frequency relative
/// to the reverse direction.
pub fn aggregate_df_relations(
    entity: &EntitySpec,
    class: &ClassSpec,
    df_threshold: u32,
    relative_df_threshold: f64,
) -> String {
    let df = df_label(entity);
    let dfc = dfc_label(entity);
    let entity_type = &entity.entity_type;
    let class_type = quote(&class_type(class));

    if df_threshold == 0 && relative_df_threshold == 0.0 {
        format!(
            "MATCH (c1:Class)<-[:OBSERVED]-(e1:Event)-[df:{df} {{entityType: \"{entity_type}\"}}]->\
             (e2:Event)-[:OBSERVED]->(c2:Class) \
             MATCH (e1)-[:CORR]->(n)<-[:CORR]-(e2) \
             WHERE n.entityType = df.entityType \
             AND c1.classType = {class_type} AND c2.classType = {class_type} \
             WITH n.entityType AS EType, c1, count(df) AS df_freq, c2 \
             MERGE (c1)-[rel:{dfc} {{entityType: \"{entity_type}\", type: \"DF_C\"}}]->(c2) \
             ON CREATE SET rel.count = df_freq"
        )
    } else {
        format!(
            "MATCH (c1:Class)<-[:OBSERVED]-(e1:Event)-[df:{df} {{entityType: \"{entity_type}\"}}]->\
             (e2:Event)-[:OBSERVED]->(c2:Class) \
             MATCH (e1)-[:CORR]->(n)<-[:CORR]-(e2) \
             WHERE n.entityType = df.entityType \
             AND c1.classType = {class_type} AND c2.classType = {class_type} \
             WITH n.entityType AS entityType, c1, count(df) AS df_freq, c2 \
             WHERE df_freq > {df_threshold} \
             OPTIONAL MATCH (c2)<-[:OBSERVED]-(e2b:Event)-[df2:{df}]->(e1b:Event)-[:OBSERVED]->(c1) \
             WITH entityType AS EType, c1, df_freq, count(df2) AS df_freq2, c2 \
             WHERE df_freq*{relative_df_threshold} > df_freq2 \
             MERGE (c1)-[rel:{dfc} {{entityType: \"{entity_type}\", type: \"DF_C\"}}]->(c2) \
             ON CREATE SET rel.count = df_freq"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekg_core::header::model::EntityConstructor;

    fn activity_lifecycle() -> ClassSpec {
        ClassSpec {
            label: "Event".to_string(),
            class_identifiers: vec!["activity".to_string(), "lifecycle".to_string()],
        }
    }

    fn offer() -> EntitySpec {
        EntitySpec {
            entity_type: "Offer".to_string(),
            constructed_by: EntityConstructor::Node {
                node_label: "Event".to_string(),
                conditions: vec![],
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
    fn class_node_carries_cid_and_class_type() {
        let cypher = create_class(&activity_lifecycle());
        assert!(cypher.contains("WITH DISTINCT e.activity AS activity, e.lifecycle AS lifecycle"));
        assert!(cypher.contains("MERGE (c:Class:Class_activity_lifecycle"));
        assert!(cypher.contains("cID: activity+lifecycle"));
        assert!(cypher.contains("classType: \"activity+lifecycle\""));
    }

    // Three distinct (activity, lifecycle) tuples over events
    // [(A,start),(A,complete),(B,start)] must yield three classes, each
    // observing exactly its own events. The DISTINCT grouping plus the
    // equality link condition encode that contract.
    #[test]
    fn distinct_tuples_partition_events() {
        let events = [("A", "start"), ("A", "complete"), ("B", "start")];
        let mut classes: Vec<(&str, &str)> = Vec::new();
        for tuple in events {
            if !classes.contains(&tuple) {
                classes.push(tuple);
            }
        }
        assert_eq!(classes.len(), 3);
        for class in &classes {
            let observed = events.iter().filter(|e| **e == *class).count();
            assert_eq!(observed, 1);
        }

        let link = link_events_to_class(&activity_lifecycle());
        assert!(link.contains("c.activity = e.activity AND c.lifecycle = e.lifecycle"));
        assert!(link.contains("MERGE (e)-[:OBSERVED]->(c)"));
    }

    #[test]
    fn plain_aggregation_counts_df_frequency() {
        let cypher = aggregate_df_relations(&offer(), &activity_lifecycle(), 0, 0.0);
        assert!(cypher.contains("[df:DF_OFFER {entityType: \"Offer\"}]"));
        assert!(cypher.contains("c1.classType = \"activity+lifecycle\""));
        assert!(cypher.contains("MERGE (c1)-[rel:DF_C_OFFER"));
        assert!(cypher.contains("ON CREATE SET rel.count = df_freq"));
        assert!(!cypher.contains("OPTIONAL MATCH"));
    }

    #[test]
    fn thresholds_drop_weak_edges() {
        let cypher = aggregate_df_relations(&offer(), &activity_lifecycle(), 5, 0.5);
        assert!(cypher.contains("WHERE df_freq > 5"));
        assert!(cypher.contains("OPTIONAL MATCH (c2)<-[:OBSERVED]-(e2b:Event)-[df2:DF_OFFER]"));
        assert!(cypher.contains("df_freq*0.5 > df_freq2"));
    }
}
