/// Run orchestration
///
/// Wires together configuration, the store connection, the catalog and the
/// executor. Used by the `flowstore-migrate` binary and by embedding runtimes
/// that migrate on startup.

use crate::{
    backfill::{backfill_correlation_states, BackfillReport},
    config::Config,
    migration::{default_catalog, Migrator, RunReport, UnitStatus},
    store,
};
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for command-line runs
///
/// Honours `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

fn build_migrator(config: &Config) -> Result<Migrator> {
    let catalog = default_catalog().context("Failed to build migration catalog")?;
    Migrator::from_config(catalog, &config.migrations).context("Invalid migration configuration")
}

/// Apply every pending migration unit
pub async fn run_migrations(config: &Config) -> Result<RunReport> {
    tracing::info!("📋 Preparing migration run");
    let migrator = build_migrator(config)?;

    let mut conn = store::connect(&config.database)
        .await
        .context("Failed to open execution store")?;

    let report = migrator
        .run(&mut conn)
        .await
        .context("Migration run aborted; re-run after fixing the cause")?;

    if report.newly_applied() == 0 {
        tracing::info!("✅ Store already up to date");
    }

    Ok(report)
}

/// Report applied and pending units without changing the store
pub async fn migration_status(config: &Config) -> Result<Vec<UnitStatus>> {
    let migrator = build_migrator(config)?;
    let mut conn = store::connect(&config.database)
        .await
        .context("Failed to open execution store")?;

    migrator
        .status(&mut conn)
        .await
        .context("Failed to read migration ledger")
}

/// Re-derive correlation states outside of a migration run
pub async fn rerun_correlation_backfill(config: &Config) -> Result<BackfillReport> {
    let mut conn = store::connect(&config.database)
        .await
        .context("Failed to open execution store")?;

    backfill_correlation_states(&mut conn)
        .await
        .context("Failed to list correlations for backfill")
}
