/// Migration unit contract
///
/// A unit is one versioned schema or data change. Units are forward-only:
/// `reverse` exists so callers can invoke it uniformly, but the default is a
/// no-op and the executor never calls it.

use crate::error::Result;
use async_trait::async_trait;
use sqlx::SqliteConnection;

#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// Sortable identifier, `<timestamp|version>-<name>`
    fn id(&self) -> &str;

    /// One-line summary shown in status output
    fn description(&self) -> &str;

    /// Tables this unit reads or changes
    fn target_tables(&self) -> &[&'static str];

    /// Introspection fallback for stores that predate the ledger.
    ///
    /// Return `true` when the schema already reflects this unit's effect.
    /// Only consulted for units missing from the ledger.
    async fn detect_applied(&self, _conn: &mut SqliteConnection) -> Result<bool> {
        Ok(false)
    }

    /// Apply the change. Must be safe to run again from the start after an
    /// interrupted attempt.
    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()>;

    async fn reverse(&self, _conn: &mut SqliteConnection) -> Result<()> {
        Ok(())
    }
}

/// A unit made of plain SQL statements executed in order
///
/// Suitable for changes that are idempotent on their own
/// (`CREATE ... IF NOT EXISTS`, guarded updates).
#[derive(Debug, Clone)]
pub struct SqlMigration {
    id: String,
    description: String,
    tables: Vec<&'static str>,
    statements: Vec<String>,
}

impl SqlMigration {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tables: Vec::new(),
            statements: Vec::new(),
        }
    }

    pub fn table(mut self, table: &'static str) -> Self {
        self.tables.push(table);
        self
    }

    pub fn statement(mut self, sql: impl Into<String>) -> Self {
        self.statements.push(sql.into());
        self
    }
}

#[async_trait]
impl MigrationUnit for SqlMigration {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn target_tables(&self) -> &[&'static str] {
        &self.tables
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        for sql in &self.statements {
            sqlx::query(sql).execute(&mut *conn).await?;
        }
        Ok(())
    }
}
