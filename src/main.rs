/// Flowstore migrate: upgrade a workflow execution store
///
/// Main entry point for operators. Applies pending migration units, reports
/// their state, or re-derives correlation states. Exits non-zero when a run
/// aborts so deployment tooling stops before the runtime starts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use flowstore::{
    app::{init_tracing, migration_status, rerun_correlation_backfill, run_migrations},
    config::Config,
    migration::UnitState,
};

#[derive(Parser)]
#[command(name = "flowstore-migrate")]
#[command(about = "Evolve and backfill the workflow execution store")]
struct Cli {
    /// Store URL, overrides FLOWSTORE_DATABASE_URL
    #[arg(long, global = true)]
    database: Option<String>,
    /// Trust only the ledger, never the schema introspector
    #[arg(long, global = true)]
    no_introspection: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migration units (default)
    Migrate,
    /// List catalog units and whether they are applied
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Re-derive correlation states from flow node instances
    Backfill,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::default();
    if let Some(url) = cli.database {
        config.database.url = url;
    }
    if cli.no_introspection {
        config.migrations.introspection_fallback = false;
    }

    match cli.command.unwrap_or(Command::Migrate) {
        Command::Migrate => {
            let report = run_migrations(&config).await?;
            tracing::info!(
                "Applied {} units ({} detected), {} already applied",
                report.executed.len() + report.detected.len(),
                report.detected.len(),
                report.skipped.len()
            );
        }
        Command::Status { json } => {
            let statuses = migration_status(&config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                for status in statuses {
                    let tables = status.tables.join(", ");
                    match status.state {
                        UnitState::Pending => println!("pending   {}  [{}]", status.id, tables),
                        UnitState::Applied { applied_at, resolution } => println!(
                            "applied   {}  [{}]  ({} at {})",
                            status.id,
                            tables,
                            resolution.as_str(),
                            applied_at.to_rfc3339()
                        ),
                    }
                }
            }
        }
        Command::Backfill => {
            let report = rerun_correlation_backfill(&config).await?;
            if !report.performed {
                tracing::info!("Nothing to backfill");
            } else if !report.failures.is_empty() {
                tracing::warn!("{} correlations could not be backfilled", report.failures.len());
            }
        }
    }

    Ok(())
}
