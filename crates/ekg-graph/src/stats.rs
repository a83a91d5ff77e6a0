//! Node and edge statistics for status display.

use anyhow::Result;
use neo4rs::Query;

use crate::GraphClient;

/// Per-label node counts and per-type edge counts.
///
/// Semantic edges carry a `type` property (DF, DF_C, Rel); edges without one
/// are structural (CORR, OBSERVED, HAS, REIFIED) and are counted by their
/// relationship type instead.
#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    pub node_counts: Vec<(String, i64)>,
    pub semantic_edge_counts: Vec<(String, i64)>,
    pub structural_edge_counts: Vec<(String, i64)>,
}

impl GraphStats {
    pub async fn gather(client: &GraphClient) -> Result<Self> {
        let node_counts = counts(
            client,
            "MATCH (n) WITH labels(n)[0] AS name, count(n) AS count \
             RETURN name, count ORDER BY name",
        )
        .await?;
        let semantic_edge_counts = counts(
            client,
            "MATCH ()-[r]->() WHERE r.type IS NOT NULL \
             WITH toUpper(r.type) AS name, count(r) AS count \
             RETURN name, count ORDER BY name",
        )
        .await?;
        let structural_edge_counts = counts(
            client,
            "MATCH ()-[r]->() WHERE r.type IS NULL \
             WITH type(r) AS name, count(r) AS count \
             RETURN name, count ORDER BY name",
        )
        .await?;

        Ok(Self {
            node_counts,
            semantic_edge_counts,
            structural_edge_counts,
        })
    }
}

async fn counts(client: &GraphClient, statement: &str) -> Result<Vec<(String, i64)>> {
    let rows = client.query(Query::new(statement.to_string())).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row
            .get("name")
            .map_err(|e| anyhow::anyhow!("Failed to get count label: {:?}", e))?;
        let count: i64 = row
            .get("count")
            .map_err(|e| anyhow::anyhow!("Failed to get count value: {:?}", e))?;
        out.push((name, count));
    }
    Ok(out)
}
