//! All things related to the storage of aliases

use core::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqlitePoolOptions;

pub use Config as DatabaseConfig;
pub use form_types::*;

use crate::aliases::Alias;
use crate::aliases::Status;
use types::MIGRATOR;
use types::ensure_expires_at_column;

mod form_types;
mod types;

/// Storage errors
#[derive(Debug)]
pub enum Error {
    /// A connection error with the storage
    Connection(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Connection(error) => write!(f, "Connection error: {error}"),
        }
    }
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Database configuration
pub enum Config {
    /// Open (or create) the database file at the given path
    Path(PathBuf),

    /// Use existing connection
    ExistingConnection(SqlitePool),
}

/// `SQLite` storage
#[derive(Clone, Debug)]
pub struct Database {
    /// Pool of connections
    connection_pool: SqlitePool,
}

/// Columns of an alias, with fallbacks for rows written before `expires_at` existed
const ALIAS_COLUMNS: &str = r"
    id,
    alias,
    COALESCE(rule_id, '') AS rule_id,
    created_at,
    COALESCE(expires_at, created_at) AS expires_at,
    status
";

impl Database {
    /// Create a new `SQLite` storage
    ///
    /// # Errors
    ///
    /// Will return `Err` when the database can not be opened or migrated
    pub async fn from_config(config: Config) -> Result<Self> {
        match config {
            Config::Path(path) => Self::new(path).await,
            Config::ExistingConnection(pool) => Self::new_with_pool(pool).await,
        }
    }

    /// Create `SQLite` storage from a file path
    ///
    /// The file and its parent directory are created when missing, migrations will be run
    async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(connection_error)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        let connection_pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await
            .map_err(connection_error)?;

        tracing::debug!("Opened database at {}", path.display());

        Self::new_with_pool(connection_pool).await
    }

    /// Create `SQLite` storage with existing pool
    ///
    /// Migrations will be run
    async fn new_with_pool(connection_pool: SqlitePool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        ensure_expires_at_column(&connection_pool).await;

        Ok(Self { connection_pool })
    }
}

impl Database {
    /// Create an active alias, returns the new ID
    pub async fn create_alias(&self, values: &CreateAliasValues<'_>) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO emails (alias, rule_id, created_at, expires_at, status)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(values.address)
        .bind(values.rule_id)
        .bind(Utc::now())
        .bind(values.expires_at)
        .bind(Status::Active)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.last_insert_rowid())
    }

    /// Find a single alias by ID
    ///
    /// DOES NOT respect the soft-delete, deleted aliases are kept for history
    pub async fn find_single_alias_by_id(&self, id: i64) -> Result<Option<Alias>> {
        let alias = sqlx::query_as::<_, Alias>(&format!(
            r"
            SELECT {ALIAS_COLUMNS}
            FROM emails
            WHERE id = ?
            LIMIT 1
            "
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(alias)
    }

    /// Find all aliases
    ///
    /// Active aliases first, then everything else; newest first within each group
    pub async fn find_all_aliases(&self) -> Result<Vec<Alias>> {
        let aliases = sqlx::query_as::<_, Alias>(&format!(
            r"
            SELECT {ALIAS_COLUMNS}
            FROM emails
            ORDER BY
                CASE WHEN status = 'active' THEN 1 ELSE 2 END,
                julianday(created_at) DESC,
                id DESC
            "
        ))
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(aliases)
    }

    /// Find all active aliases that expired before `now`
    ///
    /// Rows without an expiration (created before the column existed) never expire
    pub async fn find_expired_active_aliases(&self, now: DateTime<Utc>) -> Result<Vec<Alias>> {
        let aliases = sqlx::query_as::<_, Alias>(&format!(
            r"
            SELECT {ALIAS_COLUMNS}
            FROM emails
            WHERE status = 'active'
                AND expires_at IS NOT NULL
                AND julianday(expires_at) < julianday(?)
            ORDER BY julianday(expires_at), id
            "
        ))
        .bind(now)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(aliases)
    }

    /// Update status and rule ID together
    ///
    /// Both are written in one statement, a reader never sees one without the other
    pub async fn update_status_and_rule(
        &self,
        id: i64,
        values: &UpdateStatusValues<'_>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE emails
            SET status = ?, rule_id = ?
            WHERE id = ?
            ",
        )
        .bind(values.status)
        .bind(values.rule_id)
        .bind(id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(())
    }

    /// Update status and rule ID of an alias that is not deleted
    ///
    /// Returns `false` when nothing was updated: the alias is missing or deleted
    pub async fn update_status_and_rule_unless_deleted(
        &self,
        id: i64,
        values: &UpdateStatusValues<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE emails
            SET status = ?, rule_id = ?
            WHERE id = ? AND status != 'deleted'
            ",
        )
        .bind(values.status)
        .bind(values.rule_id)
        .bind(id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Push the expiration of an active alias forward
    ///
    /// Returns `false` when nothing was updated: the alias is missing or not active
    pub async fn extend_expiry(&self, id: i64, delta: TimeDelta) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE emails
            SET expires_at = strftime('%Y-%m-%dT%H:%M:%f+00:00', COALESCE(expires_at, created_at), ?)
            WHERE id = ? AND status = 'active'
            ",
        )
        .bind(format!("{:+} seconds", delta.num_seconds()))
        .bind(id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Make an alias active again with a new rule and expiration
    pub async fn reset_for_recreate(&self, id: i64, values: &RecreateAliasValues<'_>) -> Result<()> {
        sqlx::query(
            r"
            UPDATE emails
            SET status = ?, rule_id = ?, expires_at = ?
            WHERE id = ?
            ",
        )
        .bind(Status::Active)
        .bind(values.rule_id)
        .bind(values.expires_at)
        .bind(id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(())
    }
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}
