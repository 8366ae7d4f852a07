/// Migration units shipped with the runtime
///
/// Each unit evolves the execution store by one released step. Identifiers
/// are timestamp-prefixed; the catalog orders them, not this list.

pub mod baseline;
pub mod correlation_state;
pub(crate) mod ddl;
pub mod external_task;
pub mod flow_node_metadata;
pub mod relocation;
pub mod suspended_state;

pub use baseline::CreateExecutionTables;
pub use correlation_state::CorrelationStateBackfill;
pub use external_task::{ExternalTaskIdentity, LookupIndexes};
pub use flow_node_metadata::FlowNodeInstanceMetadata;
pub use relocation::ColumnRelocation;
pub use suspended_state::SuspendedState;

use crate::error::Result;
use crate::migration::catalog::Catalog;
use crate::migration::unit::MigrationUnit;

/// Every unit the runtime knows about
pub fn all_units() -> Vec<Box<dyn MigrationUnit>> {
    vec![
        Box::new(CreateExecutionTables),
        Box::new(FlowNodeInstanceMetadata),
        Box::new(ColumnRelocation::token_identifiers()),
        Box::new(ColumnRelocation::token_identity()),
        Box::new(SuspendedState),
        Box::new(CorrelationStateBackfill),
        Box::new(ExternalTaskIdentity),
        Box::new(LookupIndexes),
    ]
}

/// The catalog applied by `flowstore-migrate`
pub fn default_catalog() -> Result<Catalog> {
    Catalog::new(all_units())
}
