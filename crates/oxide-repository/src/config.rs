//! Connection configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{RepositoryError, Result};

/// Database URL used when none is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:db.sqlite3";

/// Settings for the pool handed to repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Create the database file if it does not exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

fn default_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_acquire_timeout() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            create_if_missing: default_true(),
        }
    }
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL` and `DATABASE_MAX_CONNECTIONS`, falling back to
    /// the defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("DATABASE_URL") {
            config.url = url;
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = max.trim().parse().map_err(|_| {
                RepositoryError::Config(format!(
                    "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{max}'"
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings without connecting.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(RepositoryError::Config("database url is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(RepositoryError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Opens a pool with foreign key enforcement on.
    pub async fn connect(&self) -> Result<SqlitePool> {
        self.validate()?;
        let options = SqliteConnectOptions::from_str(&self.url)?
            .create_if_missing(self.create_if_missing)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        info!(
            url = %self.url,
            max_connections = self.max_connections,
            "Database connection pool created"
        );
        Ok(pool)
    }
}
