//! Cypher shared by the Neo4j and FalkorDB stores.
//!
//! Both backends speak Cypher, so the triplet operations are written once
//! against [`GraphStore::query`] and each store only supplies transport.

use std::collections::BTreeSet;

use serde_json::json;

use graphgate_core::error::GraphResult;
use graphgate_core::traits::{quote_identifier, relation_type, GraphStore, RelMap, Triplet};
use graphgate_core::types::{Params, Row};

/// `[rel, obj]` pairs leaving `subject`.
pub(crate) async fn get<S: GraphStore + ?Sized>(
    store: &S,
    label: &str,
    subject: &str,
) -> GraphResult<Vec<Vec<String>>> {
    let label = quote_identifier(label);
    let text = format!(
        "MATCH (n1:{label})-[r]->(n2:{label}) WHERE n1.id = $subj \
         RETURN type(r) AS rel, n2.id AS obj"
    );
    let params = Params::from([("subj".to_string(), json!(subject))]);

    let rows = store.query(&text, &params).await?;
    rows.iter()
        .map(|row| -> GraphResult<Vec<String>> {
            Ok(vec![row.get("rel")?, row.get("obj")?])
        })
        .collect()
}

/// Paths of up to `depth` hops from each subject, flattened to `[rel, obj, ...]`.
pub(crate) async fn get_rel_map<S: GraphStore + ?Sized>(
    store: &S,
    label: &str,
    subjects: &[String],
    depth: usize,
    limit: usize,
) -> GraphResult<RelMap> {
    if subjects.is_empty() || depth == 0 || limit == 0 {
        return Ok(RelMap::new());
    }

    let text = format!(
        "MATCH p=(n1:{label})-[*1..{depth}]->() WHERE n1.id IN $subjs \
         RETURN n1.id AS subj, \
         [r IN relationships(p) | [type(r), coalesce(endNode(r).id, '')]] AS path \
         LIMIT $limit",
        label = quote_identifier(label),
    );
    let params = Params::from([
        ("subjs".to_string(), json!(subjects)),
        ("limit".to_string(), json!(limit)),
    ]);

    let rows = store.query(&text, &params).await?;
    collect_rel_map(&rows)
}

/// Group `subj`/`path` rows into a relation map.
pub(crate) fn collect_rel_map(rows: &[Row]) -> GraphResult<RelMap> {
    let mut rel_map = RelMap::new();
    for row in rows {
        let subject: String = row.get("subj")?;
        let hops: Vec<Vec<String>> = row.get("path")?;
        let path: Vec<String> = hops.into_iter().flatten().collect();
        if path.is_empty() {
            continue;
        }
        rel_map.entry(subject).or_default().push(path);
    }
    Ok(rel_map)
}

/// Merge both endpoints and the relation between them.
pub(crate) async fn upsert_triplet<S: GraphStore + ?Sized>(
    store: &S,
    label: &str,
    triplet: &Triplet,
) -> GraphResult<()> {
    let text = format!(
        "MERGE (n1:{label} {{id: $subj}}) \
         MERGE (n2:{label} {{id: $obj}}) \
         MERGE (n1)-[:{rel}]->(n2)",
        label = quote_identifier(label),
        rel = quote_identifier(&relation_type(&triplet.relation)),
    );
    store.query(&text, &triplet_params(triplet)).await?;
    Ok(())
}

/// Delete the relation, then any endpoint left with no relations.
pub(crate) async fn delete<S: GraphStore + ?Sized>(
    store: &S,
    label: &str,
    triplet: &Triplet,
) -> GraphResult<()> {
    let label = quote_identifier(label);
    let text = format!(
        "MATCH (n1:{label})-[r:{rel}]->(n2:{label}) \
         WHERE n1.id = $subj AND n2.id = $obj DELETE r",
        rel = quote_identifier(&relation_type(&triplet.relation)),
    );
    store.query(&text, &triplet_params(triplet)).await?;

    let orphan = format!("MATCH (n:{label}) WHERE n.id = $entity AND NOT (n)--() DELETE n");
    for entity in [&triplet.subject, &triplet.object] {
        let params = Params::from([("entity".to_string(), json!(entity))]);
        store.query(&orphan, &params).await?;
    }
    Ok(())
}

/// Node labels and relationship types, one line each.
pub(crate) async fn schema<S: GraphStore + ?Sized>(store: &S) -> GraphResult<String> {
    let no_params = Params::new();
    let labels = store.query("CALL db.labels()", &no_params).await?;
    let rel_types = store.query("CALL db.relationshipTypes()", &no_params).await?;

    Ok(format!(
        "Node labels: {}\nRelationship types: {}",
        column_values(&labels, "label")?.join(", "),
        column_values(&rel_types, "relationshipType")?.join(", "),
    ))
}

fn column_values(rows: &[Row], column: &str) -> GraphResult<Vec<String>> {
    let mut values = BTreeSet::new();
    for row in rows {
        if let Some(value) = row.get_opt::<String>(column)? {
            values.insert(value);
        }
    }
    Ok(values.into_iter().collect())
}

fn triplet_params(triplet: &Triplet) -> Params {
    Params::from([
        ("subj".to_string(), json!(triplet.subject)),
        ("obj".to_string(), json!(triplet.object)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use graphgate_core::traits::GraphStoreDatabase;

    /// Records every query and answers with canned rows.
    #[derive(Default)]
    struct RecordingStore {
        queries: Mutex<Vec<(String, Params)>>,
        rows: Vec<Row>,
    }

    #[async_trait]
    impl GraphStore for RecordingStore {
        fn backend(&self) -> GraphStoreDatabase {
            GraphStoreDatabase::Neo4j
        }

        async fn query(&self, query: &str, params: &Params) -> GraphResult<Vec<Row>> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), params.clone()));
            Ok(self.rows.clone())
        }

        async fn get(&self, subject: &str) -> GraphResult<Vec<Vec<String>>> {
            get(self, "Entity", subject).await
        }

        async fn get_rel_map(
            &self,
            subjects: &[String],
            depth: usize,
            limit: usize,
        ) -> GraphResult<RelMap> {
            get_rel_map(self, "Entity", subjects, depth, limit).await
        }

        async fn upsert_triplet(&self, triplet: &Triplet) -> GraphResult<()> {
            upsert_triplet(self, "Entity", triplet).await
        }

        async fn delete(&self, triplet: &Triplet) -> GraphResult<()> {
            delete(self, "Entity", triplet).await
        }

        async fn get_schema(&self, _refresh: bool) -> GraphResult<String> {
            schema(self).await
        }
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_upsert_normalises_relation() {
        let store = RecordingStore::default();
        store
            .upsert_triplet(&Triplet::new("Alice", "works at", "Acme"))
            .await
            .unwrap();

        let queries = store.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        let (text, params) = &queries[0];
        assert!(text.contains("MERGE (n1)-[:`WORKS_AT`]->(n2)"));
        assert!(text.contains("MERGE (n1:`Entity` {id: $subj})"));
        assert_eq!(params["subj"], json!("Alice"));
        assert_eq!(params["obj"], json!("Acme"));
    }

    #[tokio::test]
    async fn test_delete_removes_orphans() {
        let store = RecordingStore::default();
        store
            .delete(&Triplet::new("Alice", "knows", "Bob"))
            .await
            .unwrap();

        let queries = store.queries.lock().unwrap();
        assert_eq!(queries.len(), 3);
        assert!(queries[0].0.contains("[r:`KNOWS`]"));
        assert_eq!(queries[1].1["entity"], json!("Alice"));
        assert_eq!(queries[2].1["entity"], json!("Bob"));
    }

    #[tokio::test]
    async fn test_rel_map_short_circuits_without_subjects() {
        let store = RecordingStore::default();
        let rel_map = store.get_rel_map(&[], 2, 30).await.unwrap();
        assert!(rel_map.is_empty());
        assert!(store.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rel_map_groups_paths_by_subject() {
        let store = RecordingStore {
            rows: vec![
                row(&[
                    ("subj", json!("Alice")),
                    ("path", json!([["KNOWS", "Bob"], ["WORKS_AT", "Acme"]])),
                ]),
                row(&[("subj", json!("Alice")), ("path", json!([["LIKES", "Tea"]]))]),
                row(&[("subj", json!("Bob")), ("path", json!([]))]),
            ],
            ..Default::default()
        };

        let rel_map = store
            .get_rel_map(&["Alice".to_string(), "Bob".to_string()], 2, 30)
            .await
            .unwrap();

        assert_eq!(
            rel_map["Alice"],
            vec![
                vec!["KNOWS", "Bob", "WORKS_AT", "Acme"],
                vec!["LIKES", "Tea"],
            ]
        );
        assert!(!rel_map.contains_key("Bob"));

        let queries = store.queries.lock().unwrap();
        assert!(queries[0].0.contains("[*1..2]"));
        assert_eq!(queries[0].1["limit"], json!(30));
    }

    #[tokio::test]
    async fn test_get_pairs() {
        let store = RecordingStore {
            rows: vec![row(&[("rel", json!("KNOWS")), ("obj", json!("Bob"))])],
            ..Default::default()
        };
        let pairs = store.get("Alice").await.unwrap();
        assert_eq!(pairs, vec![vec!["KNOWS".to_string(), "Bob".to_string()]]);
    }

    #[test]
    fn test_column_values_sorted_and_deduplicated() {
        let rows = vec![
            row(&[("label", json!("Person"))]),
            row(&[("label", json!("Entity"))]),
            row(&[("label", json!("Person"))]),
        ];
        assert_eq!(column_values(&rows, "label").unwrap(), vec!["Entity", "Person"]);
    }
}
