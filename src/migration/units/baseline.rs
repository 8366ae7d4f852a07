/// Baseline execution schema
///
/// Creates the four execution tables in their oldest released shape.
/// Every later unit evolves from this shape, so an empty store and a store
/// written by the first release converge through the same steps.

use crate::error::Result;
use crate::migration::unit::MigrationUnit;
use crate::store::types::{CORRELATIONS, EXTERNAL_TASKS, FLOW_NODE_INSTANCES, PROCESS_TOKENS};
use crate::store::SchemaIntrospector;
use async_trait::async_trait;
use sqlx::SqliteConnection;

pub const ID: &str = "20180903000000-create_execution_tables";

const TABLES: [&str; 4] = [CORRELATIONS, FLOW_NODE_INSTANCES, PROCESS_TOKENS, EXTERNAL_TASKS];

const CREATE_STATEMENTS: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS "Correlations" (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        correlationId TEXT NOT NULL,
        processInstanceId TEXT,
        processModelId TEXT,
        processModelHash TEXT,
        identity TEXT,
        parentProcessInstanceId TEXT,
        createdAt TEXT DEFAULT CURRENT_TIMESTAMP,
        updatedAt TEXT DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "FlowNodeInstances" (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        flowNodeInstanceId TEXT NOT NULL UNIQUE,
        flowNodeId TEXT NOT NULL,
        state TEXT NOT NULL DEFAULT 'running',
        isSuspended INTEGER NOT NULL DEFAULT 0,
        createdAt TEXT DEFAULT CURRENT_TIMESTAMP,
        updatedAt TEXT DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "ProcessTokens" (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        flowNodeInstanceId TEXT,
        processInstanceId TEXT,
        processModelId TEXT,
        correlationId TEXT,
        identity TEXT,
        caller TEXT,
        type TEXT,
        payload TEXT,
        createdAt TEXT DEFAULT CURRENT_TIMESTAMP,
        updatedAt TEXT DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "ExternalTasks" (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        externalTaskId TEXT NOT NULL,
        workerId TEXT,
        topic TEXT NOT NULL,
        flowNodeInstanceId TEXT,
        correlationId TEXT,
        processModelId TEXT,
        processInstanceId TEXT,
        lockExpirationTime TEXT,
        payload TEXT,
        state TEXT NOT NULL DEFAULT 'pending',
        finishedAt TEXT,
        result TEXT,
        error TEXT,
        createdAt TEXT DEFAULT CURRENT_TIMESTAMP
    )
    "#,
];

#[derive(Debug, Default)]
pub struct CreateExecutionTables;

#[async_trait]
impl MigrationUnit for CreateExecutionTables {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Create correlation, flow node instance, process token and external task tables"
    }

    fn target_tables(&self) -> &[&'static str] {
        &TABLES
    }

    async fn detect_applied(&self, conn: &mut SqliteConnection) -> Result<bool> {
        for table in TABLES {
            if !SchemaIntrospector::table_exists(conn, table).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        for sql in CREATE_STATEMENTS {
            sqlx::query(sql).execute(&mut *conn).await?;
        }
        Ok(())
    }
}
