/// Correlation lifecycle state
///
/// Adds `state` and `error` to correlations and derives the state of every
/// existing row from its flow node instances.

use crate::backfill::backfill_correlation_states;
use crate::error::Result;
use crate::migration::unit::MigrationUnit;
use crate::migration::units::ddl::add_column_if_missing;
use crate::store::types::{CorrelationState, CORRELATIONS, FLOW_NODE_INSTANCES};
use crate::store::SchemaIntrospector;
use async_trait::async_trait;
use sqlx::SqliteConnection;

pub const ID: &str = "20190115000000-correlation_add_state";

#[derive(Debug, Default)]
pub struct CorrelationStateBackfill;

#[async_trait]
impl MigrationUnit for CorrelationStateBackfill {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Add state and error to correlations and backfill state from flow node instances"
    }

    fn target_tables(&self) -> &[&'static str] {
        &[CORRELATIONS, FLOW_NODE_INSTANCES]
    }

    async fn detect_applied(&self, conn: &mut SqliteConnection) -> Result<bool> {
        SchemaIntrospector::has_columns(conn, CORRELATIONS, &["state", "error"]).await
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        if !SchemaIntrospector::table_exists(conn, CORRELATIONS).await? {
            tracing::info!("📭 {} does not exist, nothing to backfill", CORRELATIONS);
            return Ok(());
        }

        let state_definition = format!(
            "TEXT NOT NULL DEFAULT '{}'",
            CorrelationState::default().as_str()
        );
        add_column_if_missing(conn, CORRELATIONS, "state", &state_definition).await?;
        add_column_if_missing(conn, CORRELATIONS, "error", "TEXT").await?;

        let report = backfill_correlation_states(conn).await?;
        if !report.failures.is_empty() {
            tracing::warn!(
                "⚠️ {} correlations kept their default state after backfill errors",
                report.failures.len()
            );
        }
        Ok(())
    }
}
