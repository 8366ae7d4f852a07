/// Data Backfill Layer
///
/// Derives attributes that did not exist when historical rows were written.
/// Backfills are best-effort per row: a malformed row is reported, never fatal.

pub mod correlation;

pub use correlation::{backfill_correlation_states, classify, BackfillReport};
