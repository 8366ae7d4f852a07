/// Migration executor
///
/// Walks the catalog in ascending identifier order. Each unit moves
/// `pending → applied` exactly once:
/// - already in the ledger: skipped
/// - recognised by the introspection fallback: recorded as `detected`
/// - otherwise: forward operation and ledger insert commit in one transaction
///
/// The introspection fallback only applies to stores whose ledger is missing
/// or empty when the run starts. Once a store carries ledger entries, the
/// ledger alone decides what is pending.
///
/// A failing forward operation rolls back its own transaction and halts the
/// run. Units before it stay applied, the failing unit and everything after it
/// stay pending, and the next run retries from the failing unit.

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::migration::catalog::Catalog;
use crate::migration::id::MigrationId;
use crate::migration::ledger::{LedgerEntry, MigrationLedger, Resolution};
use serde::Serialize;
use sqlx::{Connection, SqliteConnection};
use std::collections::{HashMap, HashSet};

/// Outcome of one executor run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Units whose forward operation ran in this run
    pub executed: Vec<MigrationId>,
    /// Units recorded because the schema already reflected them
    pub detected: Vec<MigrationId>,
    /// Units already present in the ledger
    pub skipped: Vec<MigrationId>,
}

impl RunReport {
    /// Units that moved to applied during this run
    pub fn newly_applied(&self) -> usize {
        self.executed.len() + self.detected.len()
    }
}

/// Applied/pending state of one catalog unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Applied {
        applied_at: chrono::DateTime<chrono::Utc>,
        resolution: Resolution,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub id: MigrationId,
    pub description: String,
    /// Tables the unit reads or changes
    pub tables: Vec<String>,
    #[serde(flatten)]
    pub state: UnitState,
}

#[derive(Debug)]
pub struct Migrator {
    catalog: Catalog,
    ledger: MigrationLedger,
    introspection_fallback: bool,
}

impl Migrator {
    /// Create a migrator with the default ledger table and the
    /// introspection fallback enabled
    pub fn new(catalog: Catalog) -> Result<Self> {
        Ok(Self {
            catalog,
            ledger: MigrationLedger::new(crate::config::DEFAULT_LEDGER_TABLE)?,
            introspection_fallback: true,
        })
    }

    pub fn from_config(catalog: Catalog, config: &MigrationConfig) -> Result<Self> {
        Ok(Self {
            catalog,
            ledger: MigrationLedger::new(config.ledger_table.clone())?,
            introspection_fallback: config.introspection_fallback,
        })
    }

    pub fn with_ledger(mut self, ledger: MigrationLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_introspection_fallback(mut self, enabled: bool) -> Self {
        self.introspection_fallback = enabled;
        self
    }

    /// Apply every pending unit in ascending identifier order
    pub async fn run(&self, conn: &mut SqliteConnection) -> Result<RunReport> {
        tracing::info!(
            "🚀 Starting migration run: {} units in catalog, ledger table '{}'",
            self.catalog.len(),
            self.ledger.table()
        );

        let applied: HashSet<MigrationId> = self
            .ledger
            .entries(conn)
            .await?
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        let detect = self.introspection_fallback && applied.is_empty();
        if detect {
            tracing::info!("🔍 No ledger entries yet, schema introspection enabled for this run");
        }

        self.ledger.ensure(conn).await?;

        let mut report = RunReport::default();

        for entry in self.catalog.iter() {
            let id = &entry.id;

            if applied.contains(id) {
                tracing::debug!("⏭️ Already applied: {}", id);
                report.skipped.push(id.clone());
                continue;
            }

            if detect && entry.unit.detect_applied(conn).await? {
                tracing::info!("🔍 Schema already reflects {}, recording without executing", id);
                self.ledger.record(conn, id, Resolution::Detected).await?;
                report.detected.push(id.clone());
                continue;
            }

            tracing::info!("▶️ Applying {}: {}", id, entry.unit.description());
            let started = std::time::Instant::now();

            let mut tx = conn
                .begin()
                .await
                .map_err(|e| MigrationError::from(e).into_execution(id))?;

            if let Err(err) = entry.unit.forward(&mut *tx).await {
                tracing::error!("❌ Migration {} failed: {}", id, err);
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("⚠️ Rollback of {} failed: {}", id, rollback);
                }
                return Err(err.into_execution(id));
            }

            self.ledger.record(&mut *tx, id, Resolution::Executed).await?;
            tx.commit()
                .await
                .map_err(|e| MigrationError::from(e).into_execution(id))?;

            tracing::info!("✅ Applied {} in {:?}", id, started.elapsed());
            report.executed.push(id.clone());
        }

        tracing::info!(
            "🏁 Migration run complete: {} executed, {} detected, {} already applied",
            report.executed.len(),
            report.detected.len(),
            report.skipped.len()
        );

        Ok(report)
    }

    /// Report the state of every catalog unit without changing the store
    pub async fn status(&self, conn: &mut SqliteConnection) -> Result<Vec<UnitStatus>> {
        let entries: HashMap<MigrationId, LedgerEntry> = self
            .ledger
            .entries(conn)
            .await?
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();

        Ok(self
            .catalog
            .iter()
            .map(|unit| UnitStatus {
                id: unit.id.clone(),
                description: unit.unit.description().to_string(),
                tables: unit.unit.target_tables().iter().map(|t| t.to_string()).collect(),
                state: match entries.get(&unit.id) {
                    Some(entry) => UnitState::Applied {
                        applied_at: entry.applied_at,
                        resolution: entry.resolution,
                    },
                    None => UnitState::Pending,
                },
            })
            .collect())
    }
}
