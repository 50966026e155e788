//! SQLite access. One [`Database`] is opened at startup and cloned into the
//! stores; the schema is applied through [`Database::migrate`].

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if necessary) the database file named by the config.
    /// WAL with NORMAL sync keeps concurrent event intake and read queries
    /// from blocking each other; foreign keys must be on for the cascade
    /// semantics the schema relies on.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let db_file = Path::new(&config.database_path);
        if let Some(dir) = db_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create database directory {}", dir.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database {}", db_file.display()))?;

        Ok(Self { pool })
    }

    /// Apply any pending schema migrations. Idempotent; runs on every start.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to apply database migrations")
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
