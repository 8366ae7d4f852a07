/// Flowstore: schema evolution for workflow execution stores
///
/// Upgrades the relational store holding correlations, flow node instances,
/// process tokens and external tasks across releases without losing
/// in-flight execution history.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by every layer
pub mod error;

// Store access - connection opening, schema introspection, record types
pub mod store;

// Schema evolution - identifiers, catalog, ledger, executor and shipped units
pub mod migration;

// Data backfills invoked by migration units
pub mod backfill;

// Run orchestration used by the migrate binary
pub mod app;

// Re-export commonly used types for external consumers
pub use backfill::{backfill_correlation_states, BackfillReport};
pub use config::Config;
pub use error::{BackfillRowError, MigrationError};
pub use migration::{default_catalog, Catalog, MigrationId, MigrationUnit, Migrator, RunReport};
pub use store::{CorrelationState, FlowNodeInstanceState, SchemaIntrospector};
