//! Log nodes and their HAS links to events.

/// One `:Log` node per distinct log value found on events.
pub fn create_log_nodes() -> String {
    "MATCH (e:Event) WHERE e.log IS NOT NULL AND e.log <> \"nan\" \
     WITH DISTINCT e.log AS log \
     MERGE (:Log {ID: log})"
        .to_string()
}

/// Connect each log node to its events.
pub fn link_events_to_log() -> String {
    "MATCH (l:Log) \
     MATCH (e:Event {log: l.ID}) \
     MERGE (l)-[:HAS]->(e)"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_nodes_skip_missing_values() {
        let cypher = create_log_nodes();
        assert!(cypher.contains("e.log IS NOT NULL AND e.log <> \"nan\""));
        assert!(cypher.contains("MERGE (:Log {ID: log})"));
    }

    #[test]
    fn has_links_match_on_log_id() {
        let cypher = link_events_to_log();
        assert!(cypher.contains("MATCH (e:Event {log: l.ID})"));
        assert!(cypher.contains("MERGE (l)-[:HAS]->(e)"));
    }
}
