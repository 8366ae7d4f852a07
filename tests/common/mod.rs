#![allow(dead_code)]

use flowstore::migration::units::all_units;
use flowstore::{Catalog, MigrationId, Migrator, RunReport, SchemaIntrospector};
use sqlx::{Connection, SqliteConnection};

pub async fn memory_store() -> SqliteConnection {
    SqliteConnection::connect("sqlite::memory:")
        .await
        .expect("in-memory store")
}

/// Catalog holding every shipped unit ordered before `id`
pub fn catalog_before(id: &str) -> Catalog {
    let limit = MigrationId::parse(id).unwrap();
    let units = all_units()
        .into_iter()
        .filter(|unit| MigrationId::parse(unit.id()).unwrap() < limit)
        .collect();
    Catalog::new(units).unwrap()
}

/// Bring a store to the schema shape that existed right before `id`
pub async fn migrate_before(conn: &mut SqliteConnection, id: &str) -> RunReport {
    Migrator::new(catalog_before(id))
        .unwrap()
        .run(conn)
        .await
        .expect("legacy migration run")
}

pub async fn migrate_all(conn: &mut SqliteConnection) -> RunReport {
    Migrator::new(flowstore::default_catalog().unwrap())
        .unwrap()
        .run(conn)
        .await
        .expect("full migration run")
}

pub async fn columns(conn: &mut SqliteConnection, table: &str) -> Vec<String> {
    SchemaIntrospector::table_columns(conn, table)
        .await
        .unwrap()
        .map(|set| set.into_iter().collect())
        .unwrap_or_default()
}

pub async fn insert_correlation(conn: &mut SqliteConnection, correlation_id: &str, process_instance_id: &str) {
    sqlx::query(r#"INSERT INTO "Correlations" (correlationId, processInstanceId, processModelId) VALUES (?1, ?2, 'model')"#)
        .bind(correlation_id)
        .bind(process_instance_id)
        .execute(&mut *conn)
        .await
        .unwrap();
}

/// Insert a flow node instance into a store that already carries the
/// relocated identifier columns
pub async fn insert_flow_node_instance(
    conn: &mut SqliteConnection,
    flow_node_instance_id: &str,
    process_instance_id: &str,
    correlation_id: &str,
    state: &str,
) {
    sqlx::query(
        r#"INSERT INTO "FlowNodeInstances" (flowNodeInstanceId, flowNodeId, state, processInstanceId, correlationId)
           VALUES (?1, 'node', ?2, ?3, ?4)"#,
    )
    .bind(flow_node_instance_id)
    .bind(state)
    .bind(process_instance_id)
    .bind(correlation_id)
    .execute(&mut *conn)
    .await
    .unwrap();
}

pub async fn correlation_state(conn: &mut SqliteConnection, correlation_id: &str) -> String {
    sqlx::query_scalar(r#"SELECT state FROM "Correlations" WHERE correlationId = ?1"#)
        .bind(correlation_id)
        .fetch_one(&mut *conn)
        .await
        .unwrap()
}

/// Every schema object definition, for comparing schema states
pub async fn schema_snapshot(conn: &mut SqliteConnection) -> Vec<(String, String)> {
    sqlx::query_as(
        "SELECT name, IFNULL(sql, '') FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name",
    )
    .fetch_all(&mut *conn)
    .await
    .unwrap()
}
