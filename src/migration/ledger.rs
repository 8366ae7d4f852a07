/// Persisted ledger of applied migration units
///
/// One row per applied unit, stored in the same database as the data it
/// describes. The identifier is the primary key, so a unit can never be
/// recorded twice. Rows are only ever inserted.

use crate::error::{MigrationError, Result};
use crate::migration::id::MigrationId;
use crate::store::SchemaIntrospector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};

/// How a unit reached the applied state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The forward operation ran
    Executed,
    /// The introspector found the schema already migrated
    Detected,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Detected => "detected",
        }
    }

}

impl std::str::FromStr for Resolution {
    type Err = MigrationError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "executed" => Ok(Self::Executed),
            "detected" => Ok(Self::Detected),
            other => Err(MigrationError::Ledger(sqlx::Error::Decode(
                format!("unknown ledger resolution '{other}'").into(),
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: MigrationId,
    pub applied_at: DateTime<Utc>,
    pub resolution: Resolution,
}

#[derive(Debug, Clone)]
pub struct MigrationLedger {
    table: String,
}

impl MigrationLedger {
    /// Create a ledger handle for the given table name.
    /// The name is restricted to `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let mut chars = table.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(MigrationError::InvalidLedgerTable(table));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist yet
    pub async fn ensure(&self, conn: &mut SqliteConnection) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                id TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL,
                resolution TEXT NOT NULL DEFAULT 'executed'
            )
            "#,
            self.table
        );
        sqlx::query(&sql)
            .execute(&mut *conn)
            .await
            .map_err(MigrationError::Ledger)?;
        Ok(())
    }

    /// All recorded entries in identifier order. A store without a ledger
    /// table has no entries.
    pub async fn entries(&self, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>> {
        if !SchemaIntrospector::table_exists(conn, &self.table).await? {
            return Ok(Vec::new());
        }

        let sql = format!(r#"SELECT id, applied_at, resolution FROM "{}""#, self.table);
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrationError::Ledger)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(MigrationError::Ledger)?;
            let applied_at: String = row.try_get("applied_at").map_err(MigrationError::Ledger)?;
            let resolution: String = row.try_get("resolution").map_err(MigrationError::Ledger)?;

            let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                .map_err(|e| MigrationError::Ledger(sqlx::Error::Decode(Box::new(e))))?
                .with_timezone(&Utc);

            entries.push(LedgerEntry {
                id: MigrationId::parse(&id)?,
                applied_at,
                resolution: resolution.parse()?,
            });
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    pub async fn contains(&self, conn: &mut SqliteConnection, id: &MigrationId) -> Result<bool> {
        if !SchemaIntrospector::table_exists(conn, &self.table).await? {
            return Ok(false);
        }

        let sql = format!(r#"SELECT COUNT(*) FROM "{}" WHERE id = ?1"#, self.table);
        let found: i64 = sqlx::query_scalar(&sql)
            .bind(id.as_str())
            .fetch_one(&mut *conn)
            .await
            .map_err(MigrationError::Ledger)?;
        Ok(found > 0)
    }

    /// Append an entry. Fails if the identifier is already recorded.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        id: &MigrationId,
        resolution: Resolution,
    ) -> Result<LedgerEntry> {
        let applied_at = Utc::now();
        let sql = format!(
            r#"INSERT INTO "{}" (id, applied_at, resolution) VALUES (?1, ?2, ?3)"#,
            self.table
        );
        sqlx::query(&sql)
            .bind(id.as_str())
            .bind(applied_at.to_rfc3339())
            .bind(resolution.as_str())
            .execute(&mut *conn)
            .await
            .map_err(MigrationError::Ledger)?;

        Ok(LedgerEntry {
            id: id.clone(),
            applied_at,
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    #[test]
    fn table_names_are_plain_identifiers() {
        assert!(MigrationLedger::new("schema_migrations").is_ok());
        assert!(MigrationLedger::new("_ledger2").is_ok());
        assert!(MigrationLedger::new("").is_err());
        assert!(MigrationLedger::new("2ledger").is_err());
        assert!(MigrationLedger::new("x\"; DROP TABLE Correlations; --").is_err());
    }

    #[tokio::test]
    async fn records_each_identifier_once() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let ledger = MigrationLedger::new("schema_migrations").unwrap();
        let id = MigrationId::parse("20190101000000-first").unwrap();

        assert!(ledger.entries(&mut conn).await.unwrap().is_empty());
        assert!(!ledger.contains(&mut conn, &id).await.unwrap());

        ledger.ensure(&mut conn).await.unwrap();
        ledger.record(&mut conn, &id, Resolution::Detected).await.unwrap();

        assert!(ledger.contains(&mut conn, &id).await.unwrap());
        let entries = ledger.entries(&mut conn).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].resolution, Resolution::Detected);

        let duplicate = ledger.record(&mut conn, &id, Resolution::Executed).await;
        assert!(matches!(duplicate, Err(MigrationError::Ledger(_))));
    }

    #[tokio::test]
    async fn unknown_resolution_is_a_ledger_error() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let ledger = MigrationLedger::new("schema_migrations").unwrap();
        ledger.ensure(&mut conn).await.unwrap();

        sqlx::query(
            "INSERT INTO schema_migrations (id, applied_at, resolution) VALUES ('1-first', ?1, 'guessed')",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&mut conn)
        .await
        .unwrap();

        let err = ledger.entries(&mut conn).await.unwrap_err();
        assert!(matches!(err, MigrationError::Ledger(sqlx::Error::Decode(_))));
        assert!(err.to_string().contains("guessed"));
    }
}
