//! Neo4j schema initialization (constraints) and database reset.

use anyhow::Result;
use neo4rs::Query;
use tracing::info;

use crate::GraphClient;

/// Cypher statements for schema initialization.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT unique_event_ids IF NOT EXISTS FOR (e:Event) REQUIRE e.ID IS UNIQUE",
    "CREATE CONSTRAINT unique_entity_uids IF NOT EXISTS FOR (en:Entity) REQUIRE en.uID IS UNIQUE",
    "CREATE CONSTRAINT unique_log_ids IF NOT EXISTS FOR (l:Log) REQUIRE l.ID IS UNIQUE",
];

/// Initialize Neo4j schema with uniqueness constraints.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses.
pub async fn initialize_schema(client: &GraphClient) -> Result<()> {
    info!("Initializing Neo4j schema...");

    for statement in SCHEMA_STATEMENTS {
        client.execute(Query::new(statement.to_string())).await?;
    }

    info!(
        "Neo4j schema initialized ({} statements)",
        SCHEMA_STATEMENTS.len()
    );
    Ok(())
}

/// Delete all nodes, relationships and constraints.
///
/// Constraints are dropped as well so that a rebuild with a different header
/// does not trip over stale uniqueness rules.
pub async fn clear_database(client: &GraphClient) -> Result<()> {
    info!("Clearing database...");

    client
        .execute(Query::new("MATCH (n) DETACH DELETE n".to_string()))
        .await?;

    let rows = client
        .query(Query::new(
            "SHOW CONSTRAINTS YIELD name RETURN name".to_string(),
        ))
        .await?;
    for row in rows {
        if let Ok(name) = row.get::<String>("name") {
            client
                .execute(Query::new(format!("DROP CONSTRAINT {name} IF EXISTS")))
                .await?;
        }
    }

    info!("Database cleared");
    Ok(())
}
