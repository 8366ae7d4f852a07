/// Configuration management for the flowstore migrator
///
/// Handles store location, ledger naming, and migration runtime switches.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store configuration
    pub database: DatabaseConfig,
    /// Migration runtime configuration
    pub migrations: MigrationConfig,
}

/// Store location for the workflow execution records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g., "sqlite://data/process_engine.db")
    /// The directory of the database file is created before connecting.
    pub url: String,
}

/// Migration executor switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Name of the table that records applied migration units
    pub ledger_table: String,
    /// Consult the schema introspector for units missing from the ledger.
    /// Needed when upgrading stores written before the ledger existed.
    pub introspection_fallback: bool,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        let data_dir = std::env::var("FLOWSTORE_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        Self {
            database: DatabaseConfig {
                url: std::env::var("FLOWSTORE_DATABASE_URL")
                    .unwrap_or_else(|_| format!("sqlite://{}/process_engine.db", data_dir)),
            },
            migrations: MigrationConfig::default(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            ledger_table: std::env::var("FLOWSTORE_LEDGER_TABLE")
                .unwrap_or_else(|_| DEFAULT_LEDGER_TABLE.to_string()),
            introspection_fallback: std::env::var("FLOWSTORE_INTROSPECTION_FALLBACK")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }
}

/// Ledger table used when nothing else is configured
pub const DEFAULT_LEDGER_TABLE: &str = "schema_migrations";

fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}
