/// Schema introspection against the live store
///
/// Answers "what does this table look like right now". A missing table is a
/// normal answer (`None`), not an error: callers read it as "not migrated yet".
/// Only store failures are reported, as `MigrationError::SchemaIntrospection`.

use crate::error::{MigrationError, Result};
use sqlx::SqliteConnection;
use std::collections::BTreeSet;

/// Read-only view of the store's current tables, columns and indexes
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Check whether a table exists
    pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        )
        .bind(table)
        .fetch_one(&mut *conn)
        .await
        .map_err(|source| introspection_error(table, source))?;

        Ok(found > 0)
    }

    /// Return the column names of a table, or `None` when it does not exist
    pub async fn table_columns(
        conn: &mut SqliteConnection,
        table: &str,
    ) -> Result<Option<BTreeSet<String>>> {
        if !Self::table_exists(conn, table).await? {
            return Ok(None);
        }

        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map_err(|source| introspection_error(table, source))?;

        Ok(Some(columns.into_iter().collect()))
    }

    /// Check a single column. A missing table reports `false`.
    pub async fn has_column(conn: &mut SqliteConnection, table: &str, column: &str) -> Result<bool> {
        Ok(Self::table_columns(conn, table)
            .await?
            .is_some_and(|columns| columns.contains(column)))
    }

    /// Check that every listed column is present. A missing table reports `false`.
    pub async fn has_columns(
        conn: &mut SqliteConnection,
        table: &str,
        columns: &[&str],
    ) -> Result<bool> {
        Ok(Self::table_columns(conn, table)
            .await?
            .is_some_and(|present| columns.iter().all(|c| present.contains(*c))))
    }

    /// Check whether a named index exists
    pub async fn index_exists(conn: &mut SqliteConnection, index: &str) -> Result<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
        )
        .bind(index)
        .fetch_one(&mut *conn)
        .await
        .map_err(|source| introspection_error(index, source))?;

        Ok(found > 0)
    }

    /// Names of explicitly created indexes on `table` that include `column`.
    /// SQLite refuses to drop an indexed column, so these go first.
    pub async fn indexes_on_column(
        conn: &mut SqliteConnection,
        table: &str,
        column: &str,
    ) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT il.name
            FROM pragma_index_list(?1) AS il, pragma_index_info(il.name) AS ii
            WHERE il.origin = 'c' AND ii.name = ?2
            ORDER BY il.name
            "#,
        )
        .bind(table)
        .bind(column)
        .fetch_all(&mut *conn)
        .await
        .map_err(|source| introspection_error(table, source))
    }
}

fn introspection_error(table: &str, source: sqlx::Error) -> MigrationError {
    MigrationError::SchemaIntrospection {
        table: table.to_string(),
        source,
    }
}
