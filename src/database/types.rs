//! Database storage types and functions

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;

/// Migrator to run migrations on startup
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Add the `expires_at` column to databases created before it existed
///
/// Those databases already have the `emails` table, so the migration leaves them untouched. The
/// column being present already is the common case, that error is ignored.
pub async fn ensure_expires_at_column(connection_pool: &SqlitePool) {
    let result = sqlx::query("ALTER TABLE emails ADD COLUMN expires_at DATETIME")
        .execute(connection_pool)
        .await;

    match result {
        Ok(_) => tracing::info!("Added missing `expires_at` column to `emails`"),
        Err(err) => tracing::debug!("Column `expires_at` not added: {err}"),
    }
}
