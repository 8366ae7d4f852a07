mod common;

use common::*;
use flowstore::migration::units::{all_units, baseline, correlation_state, external_task};
use flowstore::migration::{
    Catalog, MigrationLedger, MigrationUnit, Migrator, Resolution, SqlMigration, UnitState,
};
use flowstore::{default_catalog, MigrationError, SchemaIntrospector};
use async_trait::async_trait;
use sqlx::{Connection, SqliteConnection};

fn sql_unit(id: &str, statements: &[&str]) -> Box<dyn MigrationUnit> {
    let mut unit = SqlMigration::new(id, format!("test unit {id}"));
    for sql in statements {
        unit = unit.statement(*sql);
    }
    Box::new(unit)
}

async fn trace(conn: &mut SqliteConnection) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM trace ORDER BY seq")
        .fetch_all(&mut *conn)
        .await
        .unwrap()
}

#[tokio::test]
async fn empty_store_reaches_latest_schema() {
    let mut conn = memory_store().await;
    let report = migrate_all(&mut conn).await;

    assert_eq!(report.executed.len(), all_units().len());
    assert!(report.detected.is_empty());
    assert!(report.skipped.is_empty());

    let correlations = columns(&mut conn, "Correlations").await;
    assert!(correlations.contains(&"state".to_string()));
    assert!(correlations.contains(&"error".to_string()));

    let flow_node_instances = columns(&mut conn, "FlowNodeInstances").await;
    for column in [
        "processInstanceId",
        "processModelId",
        "correlationId",
        "identity",
        "parentProcessInstanceId",
        "interruptedBy",
        "flowNodeName",
        "flowNodeLane",
        "flowNodeType",
    ] {
        assert!(flow_node_instances.contains(&column.to_string()), "missing {column}");
    }
    assert!(!flow_node_instances.contains(&"isSuspended".to_string()));

    let tokens = columns(&mut conn, "ProcessTokens").await;
    for removed in ["processInstanceId", "processModelId", "correlationId", "identity", "caller"] {
        assert!(!tokens.contains(&removed.to_string()), "{removed} still on ProcessTokens");
    }
    assert!(tokens.contains(&"flowNodeInstanceId".to_string()));

    assert!(columns(&mut conn, "ExternalTasks").await.contains(&"identity".to_string()));
    for index in external_task::LOOKUP_INDEXES {
        assert!(SchemaIntrospector::index_exists(&mut conn, index.name).await.unwrap());
    }
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let mut conn = memory_store().await;
    migrate_all(&mut conn).await;

    let ledger = MigrationLedger::new("schema_migrations").unwrap();
    let ledger_before = ledger.entries(&mut conn).await.unwrap();
    let schema_before = schema_snapshot(&mut conn).await;

    let second = migrate_all(&mut conn).await;
    assert!(second.executed.is_empty());
    assert!(second.detected.is_empty());
    assert_eq!(second.skipped.len(), all_units().len());

    assert_eq!(ledger.entries(&mut conn).await.unwrap(), ledger_before);
    assert_eq!(schema_snapshot(&mut conn).await, schema_before);
}

#[tokio::test]
async fn units_run_in_identifier_order_not_declaration_order() {
    let mut conn = memory_store().await;
    let catalog = Catalog::new(vec![
        sql_unit("3-third", &["INSERT INTO trace (name) VALUES ('third')"]),
        sql_unit("1.10-tenth", &["INSERT INTO trace (name) VALUES ('tenth')"]),
        sql_unit(
            "1-first",
            &[
                "CREATE TABLE trace (seq INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
                "INSERT INTO trace (name) VALUES ('first')",
            ],
        ),
        sql_unit("2-second", &["INSERT INTO trace (name) VALUES ('second')"]),
        sql_unit("1.9-ninth", &["INSERT INTO trace (name) VALUES ('ninth')"]),
    ])
    .unwrap();

    let report = Migrator::new(catalog).unwrap().run(&mut conn).await.unwrap();

    let executed: Vec<String> = report.executed.iter().map(|id| id.to_string()).collect();
    assert_eq!(executed, vec!["1-first", "1.9-ninth", "1.10-tenth", "2-second", "3-third"]);
    assert_eq!(trace(&mut conn).await, vec!["first", "ninth", "tenth", "second", "third"]);
}

#[tokio::test]
async fn failing_unit_halts_run_and_rerun_resumes_there() {
    let mut conn = memory_store().await;
    let broken = Catalog::new(vec![
        sql_unit(
            "1-create",
            &[
                "CREATE TABLE trace (seq INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
                "INSERT INTO trace (name) VALUES ('create')",
            ],
        ),
        sql_unit(
            "2-broken",
            &[
                "CREATE TABLE partial (x INTEGER)",
                "INSERT INTO trace (name) VALUES ('broken')",
                "INSERT INTO no_such_table VALUES (1)",
            ],
        ),
        sql_unit("3-later", &["INSERT INTO trace (name) VALUES ('later')"]),
    ])
    .unwrap();

    let err = Migrator::new(broken).unwrap().run(&mut conn).await.unwrap_err();
    match &err {
        MigrationError::Execution { id, .. } => assert_eq!(id.as_str(), "2-broken"),
        other => panic!("unexpected error: {other}"),
    }

    // The failing unit's own changes are rolled back, earlier units stay.
    assert!(!SchemaIntrospector::table_exists(&mut conn, "partial").await.unwrap());
    assert_eq!(trace(&mut conn).await, vec!["create"]);

    let ledger = MigrationLedger::new("schema_migrations").unwrap();
    let applied: Vec<String> = ledger
        .entries(&mut conn)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.id.to_string())
        .collect();
    assert_eq!(applied, vec!["1-create"]);

    let fixed = Catalog::new(vec![
        sql_unit("1-create", &["INSERT INTO trace (name) VALUES ('must not run')"]),
        sql_unit(
            "2-broken",
            &[
                "CREATE TABLE partial (x INTEGER)",
                "INSERT INTO trace (name) VALUES ('fixed')",
            ],
        ),
        sql_unit("3-later", &["INSERT INTO trace (name) VALUES ('later')"]),
    ])
    .unwrap();

    let report = Migrator::new(fixed).unwrap().run(&mut conn).await.unwrap();
    let skipped: Vec<String> = report.skipped.iter().map(|id| id.to_string()).collect();
    let executed: Vec<String> = report.executed.iter().map(|id| id.to_string()).collect();
    assert_eq!(skipped, vec!["1-create"]);
    assert_eq!(executed, vec!["2-broken", "3-later"]);
    assert_eq!(trace(&mut conn).await, vec!["create", "fixed", "later"]);
}

#[tokio::test]
async fn ledger_survives_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("engine.db").display());

    {
        let mut conn = SqliteConnection::connect(&url).await.unwrap();
        migrate_all(&mut conn).await;
        conn.close().await.unwrap();
    }

    let mut conn = SqliteConnection::connect(&url).await.unwrap();
    let migrator = Migrator::new(default_catalog().unwrap()).unwrap();
    let statuses = migrator.status(&mut conn).await.unwrap();
    assert!(statuses
        .iter()
        .all(|status| matches!(status.state, UnitState::Applied { resolution: Resolution::Executed, .. })));

    let report = migrator.run(&mut conn).await.unwrap();
    assert_eq!(report.newly_applied(), 0);
}

#[tokio::test]
async fn status_lists_pending_then_applied_without_mutating() {
    let mut conn = memory_store().await;
    let migrator = Migrator::new(default_catalog().unwrap()).unwrap();

    let before = migrator.status(&mut conn).await.unwrap();
    assert_eq!(before.len(), all_units().len());
    assert!(before.iter().all(|status| status.state == UnitState::Pending));
    assert_eq!(before[0].id.as_str(), baseline::ID);
    assert!(!SchemaIntrospector::table_exists(&mut conn, "schema_migrations").await.unwrap());

    migrator.run(&mut conn).await.unwrap();

    let after = migrator.status(&mut conn).await.unwrap();
    assert!(after.iter().all(|status| status.state != UnitState::Pending));

    let json = serde_json::to_value(&after[0]).unwrap();
    assert_eq!(json["state"], "applied");
    assert_eq!(json["resolution"], "executed");
    assert_eq!(json["id"], baseline::ID);
    assert_eq!(
        json["tables"],
        serde_json::json!(["Correlations", "FlowNodeInstances", "ProcessTokens", "ExternalTasks"])
    );
}

#[tokio::test]
async fn ledgerless_legacy_store_is_detected_not_reexecuted() {
    let mut conn = memory_store().await;
    migrate_all(&mut conn).await;

    // A store migrated by a release that kept its ledger elsewhere
    let fresh_ledger = MigrationLedger::new("adopted_migrations").unwrap();
    let report = Migrator::new(default_catalog().unwrap())
        .unwrap()
        .with_ledger(fresh_ledger.clone())
        .run(&mut conn)
        .await
        .unwrap();

    assert!(report.executed.is_empty());
    assert_eq!(report.detected.len(), all_units().len());
    assert!(fresh_ledger
        .entries(&mut conn)
        .await
        .unwrap()
        .iter()
        .all(|entry| entry.resolution == Resolution::Detected));
}

#[tokio::test]
async fn forward_operations_rerun_cleanly_on_migrated_store() {
    let mut conn = memory_store().await;
    migrate_all(&mut conn).await;
    let schema_before = schema_snapshot(&mut conn).await;

    let report = Migrator::new(default_catalog().unwrap())
        .unwrap()
        .with_ledger(MigrationLedger::new("replay_migrations").unwrap())
        .with_introspection_fallback(false)
        .run(&mut conn)
        .await
        .unwrap();

    assert_eq!(report.executed.len(), all_units().len());

    let mut schema_after = schema_snapshot(&mut conn).await;
    schema_after.retain(|(name, _)| name != "replay_migrations");
    assert_eq!(schema_after, schema_before);
}

#[tokio::test]
async fn reverse_operations_are_callable_no_ops() {
    let mut conn = memory_store().await;
    migrate_all(&mut conn).await;
    let schema_before = schema_snapshot(&mut conn).await;

    for unit in all_units() {
        unit.reverse(&mut conn).await.unwrap();
    }

    assert_eq!(schema_snapshot(&mut conn).await, schema_before);
}

#[tokio::test]
async fn partially_migrated_store_continues_from_ledger() {
    let mut conn = memory_store().await;
    let legacy = migrate_before(&mut conn, correlation_state::ID).await;
    assert!(!legacy.executed.is_empty());

    let report = migrate_all(&mut conn).await;
    assert_eq!(report.skipped, legacy.executed);
    assert_eq!(report.executed[0].as_str(), correlation_state::ID);
}

#[tokio::test]
async fn invalid_ledger_table_name_is_rejected() {
    let err = MigrationLedger::new("ledger; DROP TABLE x").unwrap_err();
    assert!(matches!(err, MigrationError::InvalidLedgerTable(_)));
}

/// Unit whose schema lookups fail, either while detecting or while applying
struct UnreadableSchema {
    fail_in_detect: bool,
}

fn introspection_failure() -> MigrationError {
    MigrationError::SchemaIntrospection {
        table: "Correlations".to_string(),
        source: sqlx::Error::Protocol("schema unreadable".to_string()),
    }
}

#[async_trait]
impl MigrationUnit for UnreadableSchema {
    fn id(&self) -> &str {
        "2-unreadable"
    }

    fn description(&self) -> &str {
        "fails to read the schema"
    }

    fn target_tables(&self) -> &[&'static str] {
        &["Correlations"]
    }

    async fn detect_applied(&self, _conn: &mut SqliteConnection) -> flowstore::error::Result<bool> {
        if self.fail_in_detect {
            return Err(introspection_failure());
        }
        Ok(false)
    }

    async fn forward(&self, _conn: &mut SqliteConnection) -> flowstore::error::Result<()> {
        Err(introspection_failure())
    }
}

#[tokio::test]
async fn introspection_failure_aborts_run_without_recording() {
    for fail_in_detect in [true, false] {
        let mut conn = memory_store().await;
        let catalog = Catalog::new(vec![
            sql_unit("1-first", &["CREATE TABLE trace (seq INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)"]),
            Box::new(UnreadableSchema { fail_in_detect }),
            sql_unit("3-later", &["INSERT INTO trace (name) VALUES ('later')"]),
        ])
        .unwrap();

        let err = Migrator::new(catalog).unwrap().run(&mut conn).await.unwrap_err();
        assert!(
            matches!(err, MigrationError::SchemaIntrospection { ref table, .. } if table == "Correlations"),
            "unexpected error: {err}"
        );

        let ledger = MigrationLedger::new("schema_migrations").unwrap();
        let unreadable = "2-unreadable".parse().unwrap();
        assert!(!ledger.contains(&mut conn, &unreadable).await.unwrap());
        assert!(!ledger.contains(&mut conn, &"3-later".parse().unwrap()).await.unwrap());
        assert!(trace(&mut conn).await.is_empty());
    }
}
