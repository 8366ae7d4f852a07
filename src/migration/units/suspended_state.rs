/// Suspension as a flow node instance state
///
/// Older releases flagged suspension with `isSuspended` next to a `running`
/// state. The flag is folded into `state = 'suspended'` and then dropped.

use crate::error::Result;
use crate::migration::unit::MigrationUnit;
use crate::migration::units::ddl::drop_column_if_present;
use crate::store::types::{FlowNodeInstanceState, FLOW_NODE_INSTANCES};
use crate::store::SchemaIntrospector;
use async_trait::async_trait;
use sqlx::SqliteConnection;

pub const ID: &str = "20181210000000-flow_node_instance_suspended_state";

const LEGACY_FLAG: &str = "isSuspended";

#[derive(Debug, Default)]
pub struct SuspendedState;

#[async_trait]
impl MigrationUnit for SuspendedState {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Replace the isSuspended flag with the 'suspended' flow node instance state"
    }

    fn target_tables(&self) -> &[&'static str] {
        &[FLOW_NODE_INSTANCES]
    }

    async fn detect_applied(&self, conn: &mut SqliteConnection) -> Result<bool> {
        Ok(SchemaIntrospector::table_columns(conn, FLOW_NODE_INSTANCES)
            .await?
            .is_some_and(|columns| !columns.contains(LEGACY_FLAG)))
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        if !SchemaIntrospector::has_column(conn, FLOW_NODE_INSTANCES, LEGACY_FLAG).await? {
            tracing::debug!("No {} column on {}", LEGACY_FLAG, FLOW_NODE_INSTANCES);
            return Ok(());
        }

        let folded = sqlx::query(
            r#"UPDATE "FlowNodeInstances" SET state = ?1 WHERE "isSuspended" = 1 AND state = ?2"#,
        )
        .bind(FlowNodeInstanceState::Suspended.as_str())
        .bind(FlowNodeInstanceState::Running.as_str())
        .execute(&mut *conn)
        .await?
        .rows_affected();
        tracing::info!("⏸️ Marked {} flow node instances as suspended", folded);

        drop_column_if_present(conn, FLOW_NODE_INSTANCES, LEGACY_FLAG).await?;
        Ok(())
    }
}
