/// Error taxonomy for schema evolution runs
///
/// Introspection, execution and ledger failures are fatal and surface to the
/// operator. Per-row backfill failures are a separate type that is logged and
/// collected, never propagated.

use crate::migration::id::MigrationId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to open store {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("schema introspection failed for table {table}: {source}")]
    SchemaIntrospection {
        table: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("migration {id} failed: {source}")]
    Execution {
        id: MigrationId,
        #[source]
        source: Box<MigrationError>,
    },
    #[error("ledger error: {0}")]
    Ledger(#[source] sqlx::Error),
    #[error("invalid migration identifier: {0}")]
    InvalidMigrationId(String),
    #[error("duplicate migration identifier in catalog: {0}")]
    DuplicateMigration(MigrationId),
    #[error("invalid ledger table name: {0}")]
    InvalidLedgerTable(String),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl MigrationError {
    /// Attribute a forward-operation failure to the unit that raised it.
    /// Introspection failures keep their own variant.
    pub(crate) fn into_execution(self, id: &MigrationId) -> Self {
        match self {
            err @ Self::SchemaIntrospection { .. } => err,
            err @ Self::Execution { .. } => err,
            other => Self::Execution {
                id: id.clone(),
                source: Box::new(other),
            },
        }
    }
}

/// A single correlation row that could not be classified or updated
#[derive(Debug, Error)]
#[error("correlation row {row_id} ({correlation_id:?}) could not be backfilled: {source}")]
pub struct BackfillRowError {
    /// Rowid of the correlation record
    pub row_id: i64,
    /// Business correlation id, when it could be read
    pub correlation_id: Option<String>,
    #[source]
    pub source: sqlx::Error,
}

pub type Result<T, E = MigrationError> = std::result::Result<T, E>;
