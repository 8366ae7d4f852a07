/// Schema Evolution Layer
///
/// This module evolves the execution store across releases:
/// - Identifiers that establish execution order
/// - The catalog of forward-only migration units
/// - The persisted ledger of applied units
/// - The executor that applies pending units in order

pub mod catalog;
pub mod executor;
pub mod id;
pub mod ledger;
pub mod unit;
pub mod units;

pub use catalog::Catalog;
pub use executor::{Migrator, RunReport, UnitState, UnitStatus};
pub use id::MigrationId;
pub use ledger::{LedgerEntry, MigrationLedger, Resolution};
pub use unit::{MigrationUnit, SqlMigration};
pub use units::default_catalog;
