/// Guarded DDL helpers shared by the catalog units
///
/// Every helper checks the live schema first so a unit can be re-run from
/// the start after an interruption. Table and column names passed here are
/// compile-time constants; values always go through bind parameters.

use crate::error::Result;
use crate::store::SchemaIntrospector;
use sqlx::SqliteConnection;

/// Quote an identifier for interpolation into DDL
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Add a column unless it already exists. Returns whether it was added.
pub(crate) async fn add_column_if_missing(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<bool> {
    if SchemaIntrospector::has_column(conn, table, column).await? {
        tracing::debug!("Column {}.{} already present", table, column);
        return Ok(false);
    }

    let sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote(table),
        quote(column),
        definition
    );
    sqlx::query(&sql).execute(&mut *conn).await?;
    tracing::info!("➕ Added column {}.{}", table, column);
    Ok(true)
}

/// Drop a column if it is still present, removing indexes that cover it
/// first. Returns whether it was dropped.
pub(crate) async fn drop_column_if_present(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
) -> Result<bool> {
    if !SchemaIntrospector::has_column(conn, table, column).await? {
        return Ok(false);
    }

    for index in SchemaIntrospector::indexes_on_column(conn, table, column).await? {
        let sql = format!("DROP INDEX IF EXISTS {}", quote(&index));
        sqlx::query(&sql).execute(&mut *conn).await?;
        tracing::info!("🗑️ Dropped index {} covering {}.{}", index, table, column);
    }

    let sql = format!("ALTER TABLE {} DROP COLUMN {}", quote(table), quote(column));
    sqlx::query(&sql).execute(&mut *conn).await?;
    tracing::info!("➖ Dropped column {}.{}", table, column);
    Ok(true)
}
