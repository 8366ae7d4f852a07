/// Store access layer
///
/// Opens the single SQLite connection a migration run works on and exposes
/// the schema introspector plus the persisted record types.

pub mod introspector;
pub mod types;

pub use introspector::SchemaIntrospector;
pub use types::{CorrelationState, FlowNodeInstanceState};

use crate::config::DatabaseConfig;
use crate::error::{MigrationError, Result};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, SqliteConnection};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directory holding the database file a SQLite URL points at.
/// `None` for in-memory stores and files in the working directory.
fn database_dir(url: &str) -> Option<PathBuf> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }

    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Open the store connection for a migration run
///
/// Creates the directory of the database file and the file itself when
/// missing, so an empty installation migrates from nothing.
pub async fn connect(config: &DatabaseConfig) -> Result<SqliteConnection> {
    if let Some(dir) = database_dir(&config.url) {
        std::fs::create_dir_all(&dir).map_err(|e| MigrationError::Connect {
            url: config.url.clone(),
            source: sqlx::Error::Io(e),
        })?;
    }

    tracing::info!("🗄️ Opening execution store: {}", config.url);

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|source| MigrationError::Connect {
            url: config.url.clone(),
            source,
        })?
        .create_if_missing(true);

    options.connect().await.map_err(|source| MigrationError::Connect {
        url: config.url.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_dir_follows_the_url() {
        assert_eq!(database_dir("sqlite://data/engine.db"), Some(PathBuf::from("data")));
        assert_eq!(
            database_dir("sqlite:///var/lib/flows/engine.db?mode=rwc"),
            Some(PathBuf::from("/var/lib/flows"))
        );
        assert_eq!(database_dir("sqlite://engine.db"), None);
        assert_eq!(database_dir("sqlite::memory:"), None);
        assert_eq!(database_dir("sqlite://:memory:"), None);
    }

    #[tokio::test]
    async fn connect_creates_only_the_url_directory() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("nested").join("store");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", target.join("engine.db").display()),
        };

        connect(&config).await.unwrap();

        assert!(target.join("engine.db").exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }
}
