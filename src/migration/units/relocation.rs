/// Column relocation between tables
///
/// Moves columns from a source table to a destination table that share a
/// string key (`flowNodeInstanceId`). The order is always:
/// 1. add missing destination columns
/// 2. copy values through a correlated lookup on the key
/// 3. drop the source columns
///
/// Copying only fills destination cells that are still NULL and only reads
/// source columns that still exist, so an interrupted run can start over.
/// Destination rows with no matching source row keep the column default.

use crate::error::Result;
use crate::migration::unit::MigrationUnit;
use crate::migration::units::ddl::{add_column_if_missing, drop_column_if_present, quote};
use crate::store::types::{FLOW_NODE_INSTANCES, PROCESS_TOKENS};
use crate::store::SchemaIntrospector;
use async_trait::async_trait;
use sqlx::SqliteConnection;

pub const TOKEN_IDENTIFIERS_ID: &str = "20181120000000-relocate_process_token_identifiers";
pub const TOKEN_IDENTITY_ID: &str = "20181126000000-relocate_process_token_identity";

#[derive(Debug, Clone)]
pub struct ColumnRelocation {
    id: &'static str,
    description: &'static str,
    tables: [&'static str; 2],
    key: &'static str,
    /// Columns moved, with their destination definition
    columns: &'static [(&'static str, &'static str)],
    /// Source columns dropped without being copied
    discard: &'static [&'static str],
}

impl ColumnRelocation {
    /// processInstanceId, processModelId and correlationId move from
    /// tokens to the flow node instance that owns them
    pub fn token_identifiers() -> Self {
        Self {
            id: TOKEN_IDENTIFIERS_ID,
            description: "Move process instance, process model and correlation ids from process tokens to flow node instances",
            tables: [PROCESS_TOKENS, FLOW_NODE_INSTANCES],
            key: "flowNodeInstanceId",
            columns: &[
                ("processInstanceId", "TEXT"),
                ("processModelId", "TEXT"),
                ("correlationId", "TEXT"),
            ],
            discard: &[],
        }
    }

    /// identity moves as well; the caller column is no longer read anywhere
    pub fn token_identity() -> Self {
        Self {
            id: TOKEN_IDENTITY_ID,
            description: "Move identity from process tokens to flow node instances and drop caller",
            tables: [PROCESS_TOKENS, FLOW_NODE_INSTANCES],
            key: "flowNodeInstanceId",
            columns: &[("identity", "TEXT")],
            discard: &["caller"],
        }
    }

    fn source(&self) -> &'static str {
        self.tables[0]
    }

    fn destination(&self) -> &'static str {
        self.tables[1]
    }

    fn copy_statement(&self, column: &str) -> String {
        let src = quote(self.source());
        let dst = quote(self.destination());
        let col = quote(column);
        let key = quote(self.key);

        format!(
            r#"
            UPDATE {dst}
            SET {col} = (
                SELECT s.{col} FROM {src} AS s
                WHERE s.{key} = {dst}.{key} AND s.{col} IS NOT NULL
                ORDER BY s.rowid
                LIMIT 1
            )
            WHERE {col} IS NULL
              AND EXISTS (
                SELECT 1 FROM {src} AS s
                WHERE s.{key} = {dst}.{key} AND s.{col} IS NOT NULL
              )
            "#
        )
    }
}

#[async_trait]
impl MigrationUnit for ColumnRelocation {
    fn id(&self) -> &str {
        self.id
    }

    fn description(&self) -> &str {
        self.description
    }

    fn target_tables(&self) -> &[&'static str] {
        &self.tables
    }

    async fn detect_applied(&self, conn: &mut SqliteConnection) -> Result<bool> {
        let columns: Vec<&str> = self.columns.iter().map(|(name, _)| *name).collect();
        SchemaIntrospector::has_columns(conn, self.destination(), &columns).await
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        for (column, definition) in self.columns {
            add_column_if_missing(conn, self.destination(), column, definition).await?;
        }

        let source_columns = match SchemaIntrospector::table_columns(conn, self.source()).await? {
            Some(columns) => columns,
            None => {
                tracing::info!("📭 {} does not exist, nothing to relocate", self.source());
                return Ok(());
            }
        };

        if !source_columns.contains(self.key) {
            // Without the key nothing can be copied, so the source columns stay.
            tracing::warn!(
                "⚠️ {} has no {} column, leaving its columns in place",
                self.source(),
                self.key
            );
            return Ok(());
        }

        for (column, _) in self.columns {
            if !source_columns.contains(*column) {
                continue;
            }
            let copied = sqlx::query(&self.copy_statement(column))
                .execute(&mut *conn)
                .await?
                .rows_affected();
            tracing::info!(
                "📦 Copied {}.{} into {} rows of {}",
                self.source(),
                column,
                copied,
                self.destination()
            );
        }

        for (column, _) in self.columns {
            drop_column_if_present(conn, self.source(), column).await?;
        }
        for column in self.discard {
            drop_column_if_present(conn, self.source(), column).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_statement_is_keyed_and_null_guarded() {
        let sql = ColumnRelocation::token_identity().copy_statement("identity");
        assert!(sql.contains(r#"UPDATE "FlowNodeInstances""#));
        assert!(sql.contains(r#"s."flowNodeInstanceId" = "FlowNodeInstances"."flowNodeInstanceId""#));
        assert!(sql.contains(r#"WHERE "identity" IS NULL"#));
    }
}
