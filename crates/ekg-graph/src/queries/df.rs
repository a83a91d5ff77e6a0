//! Directly-follows edges between consecutive events of an entity.

use ekg_core::header::model::EntitySpec;

use super::{df_label, entity_label_string};

/// Per entity instance, sort correlated events by timestamp then import
/// order and link each event to its immediate successor.
pub fn create_directly_follows(spec: &EntitySpec) -> String {
    format!(
        "MATCH (n:{labels})<-[:CORR]-(e) \
         WITH n, e AS nodes ORDER BY e.timestamp, e.seq \
         WITH n, collect(nodes) AS nodeList \
         UNWIND range(0, size(nodeList)-2) AS i \
         WITH n, nodeList[i] AS first, nodeList[i+1] AS second \
         MERGE (first)-[df:{df} {{entityType: \"{entity_type}\"}}]->(second) \
         SET df.type = \"DF\"",
        labels = entity_label_string(spec),
        df = df_label(spec),
        entity_type = spec.entity_type,
    )
}

/// Collapse parallel DF edges of one entity type between the same pair of
/// events into a single edge carrying the multiplicity.
pub fn merge_duplicate_df(spec: &EntitySpec) -> String {
    format!(
        "MATCH (n1:Event)-[r:{df} {{entityType: \"{entity_type}\"}}]->(n2:Event) \
         WITH n1, n2, collect(r) AS rels \
         WHERE size(rels) > 1 \
         UNWIND rels AS r \
         DELETE r \
         MERGE (n1)-[:{df} {{entityType: \"{entity_type}\", Count: size(rels), type: \"DF\"}}]->(n2)",
        df = df_label(spec),
        entity_type = spec.entity_type,
    )
}

/// Drop DF edges of a reified entity that duplicate a DF edge of one of its
/// underlying entities between the same events.
pub fn delete_parallel_df(reified: &EntitySpec, original: &EntitySpec) -> String {
    format!(
        "MATCH (e1:Event)-[df:{reified_df} {{entityType: \"{reified_type}\"}}]->(e2:Event) \
         WHERE (e1:Event)-[:{original_df} {{entityType: \"{original_type}\"}}]->(e2:Event) \
         DELETE df",
        reified_df = df_label(reified),
        reified_type = reified.entity_type,
        original_df = df_label(original),
        original_type = original.entity_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekg_core::header::model::{Condition, EntityConstructor};

    fn spec(entity_type: &str, include_label_in_df: bool) -> EntitySpec {
        EntitySpec {
            entity_type: entity_type.to_string(),
            constructed_by: EntityConstructor::Node {
                node_label: "Event".to_string(),
                conditions: vec![],
            },
            labels: vec![entity_type.to_string()],
            primary_keys: vec!["ID".to_string()],
            entity_attributes: vec!["ID".to_string()],
            attributes_wo_primary_keys: vec![],
            corr: true,
            df: true,
            include_label_in_df,
            merge_duplicate_df: false,
            delete_parallel_df: false,
        }
    }

    #[test]
    fn df_orders_by_timestamp_then_import_order() {
        let cypher = create_directly_follows(&spec("Offer", true));
        assert!(cypher.contains("ORDER BY e.timestamp, e.seq"));
        assert!(cypher.contains("UNWIND range(0, size(nodeList)-2)"));
        assert!(cypher.contains("[df:DF_OFFER {entityType: \"Offer\"}]"));
    }

    // The contract behind the rendered ORDER BY: sorting (timestamp, seq)
    // tuples links out-of-file-order events chronologically.
    #[test]
    fn df_ordering_is_deterministic_for_one_entity() {
        let mut events = vec![("10:00", 0), ("09:00", 1), ("11:00", 2)];
        events.sort();
        let edges: Vec<_> = events.windows(2).map(|w| (w[0].1, w[1].1)).collect();
        assert_eq!(edges, vec![(1, 0), (0, 2)]);
    }

    #[test]
    fn equal_timestamps_fall_back_to_import_order() {
        let mut events = vec![("09:00", 2), ("09:00", 0), ("09:00", 1)];
        events.sort();
        let edges: Vec<_> = events.windows(2).map(|w| (w[0].1, w[1].1)).collect();
        assert_eq!(edges, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn merge_duplicate_keeps_count() {
        let cypher = merge_duplicate_df(&spec("Case", false));
        assert!(cypher.contains("WHERE size(rels) > 1"));
        assert!(cypher.contains("Count: size(rels)"));
        assert!(cypher.contains("[:DF {entityType: \"Case\""));
    }

    #[test]
    fn parallel_df_deletion_targets_reified_label() {
        let reified = spec("CaseAO", true);
        let original = spec("Application", true);
        let cypher = delete_parallel_df(&reified, &original);
        assert!(cypher.contains("[df:DF_CASEAO {entityType: \"CaseAO\"}]"));
        assert!(cypher.contains("[:DF_APPLICATION {entityType: \"Application\"}]"));
        assert!(cypher.ends_with("DELETE df"));
    }

    #[test]
    fn conditions_do_not_leak_into_df() {
        let mut s = spec("Offer", false);
        s.constructed_by = EntityConstructor::Node {
            node_label: "Event".to_string(),
            conditions: vec![Condition {
                attribute: "EventOrigin".to_string(),
                values: vec!["Offer".to_string()],
            }],
        };
        let cypher = create_directly_follows(&s);
        assert!(!cypher.contains("EventOrigin"));
    }
}
