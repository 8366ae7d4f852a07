/// External task identity and lookup indexes
///
/// External tasks are independent of the correlation backfill. They gain an
/// identity column, and the commonly filtered column groups across the
/// execution tables get composite indexes.

use crate::error::Result;
use crate::migration::unit::MigrationUnit;
use crate::migration::units::ddl::{add_column_if_missing, quote};
use crate::store::types::{CORRELATIONS, EXTERNAL_TASKS, FLOW_NODE_INSTANCES};
use crate::store::SchemaIntrospector;
use async_trait::async_trait;
use sqlx::SqliteConnection;

pub const IDENTITY_ID: &str = "20190218000000-external_task_add_identity";
pub const INDEXES_ID: &str = "20190311000000-create_lookup_indexes";

#[derive(Debug, Default)]
pub struct ExternalTaskIdentity;

#[async_trait]
impl MigrationUnit for ExternalTaskIdentity {
    fn id(&self) -> &str {
        IDENTITY_ID
    }

    fn description(&self) -> &str {
        "Add identity to external tasks"
    }

    fn target_tables(&self) -> &[&'static str] {
        &[EXTERNAL_TASKS]
    }

    async fn detect_applied(&self, conn: &mut SqliteConnection) -> Result<bool> {
        SchemaIntrospector::has_column(conn, EXTERNAL_TASKS, "identity").await
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        add_column_if_missing(conn, EXTERNAL_TASKS, "identity", "TEXT").await?;
        Ok(())
    }
}

/// One composite index definition
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

impl IndexSpec {
    fn create_statement(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote(c)).collect();
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote(self.name),
            quote(self.table),
            columns.join(", ")
        )
    }
}

pub const LOOKUP_INDEXES: &[IndexSpec] = &[
    IndexSpec {
        name: "idx_external_tasks_topic_state_lock",
        table: EXTERNAL_TASKS,
        columns: &["topic", "state", "lockExpirationTime"],
    },
    IndexSpec {
        name: "idx_external_tasks_correlation_process_instance",
        table: EXTERNAL_TASKS,
        columns: &["correlationId", "processInstanceId"],
    },
    IndexSpec {
        name: "idx_external_tasks_flow_node_instance",
        table: EXTERNAL_TASKS,
        columns: &["flowNodeInstanceId"],
    },
    IndexSpec {
        name: "idx_external_tasks_process_model",
        table: EXTERNAL_TASKS,
        columns: &["processModelId"],
    },
    IndexSpec {
        name: "idx_external_tasks_external_task_id",
        table: EXTERNAL_TASKS,
        columns: &["externalTaskId"],
    },
    IndexSpec {
        name: "idx_external_tasks_identity",
        table: EXTERNAL_TASKS,
        columns: &["identity"],
    },
    IndexSpec {
        name: "idx_flow_node_instances_process_instance_state",
        table: FLOW_NODE_INSTANCES,
        columns: &["processInstanceId", "state"],
    },
    IndexSpec {
        name: "idx_flow_node_instances_correlation",
        table: FLOW_NODE_INSTANCES,
        columns: &["correlationId"],
    },
    IndexSpec {
        name: "idx_correlations_correlation",
        table: CORRELATIONS,
        columns: &["correlationId"],
    },
    IndexSpec {
        name: "idx_correlations_process_instance",
        table: CORRELATIONS,
        columns: &["processInstanceId"],
    },
];

#[derive(Debug, Default)]
pub struct LookupIndexes;

#[async_trait]
impl MigrationUnit for LookupIndexes {
    fn id(&self) -> &str {
        INDEXES_ID
    }

    fn description(&self) -> &str {
        "Create composite lookup indexes on external tasks, flow node instances and correlations"
    }

    fn target_tables(&self) -> &[&'static str] {
        &[EXTERNAL_TASKS, FLOW_NODE_INSTANCES, CORRELATIONS]
    }

    async fn detect_applied(&self, conn: &mut SqliteConnection) -> Result<bool> {
        for index in LOOKUP_INDEXES {
            if !SchemaIntrospector::index_exists(conn, index.name).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        for index in LOOKUP_INDEXES {
            sqlx::query(&index.create_statement())
                .execute(&mut *conn)
                .await?;
            tracing::debug!("🔖 Ensured index {} on {}", index.name, index.table);
        }
        Ok(())
    }
}
