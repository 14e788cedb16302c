//! SQLite pool factory and migration runner.

use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use bookshelf_kernel::Migration;

/// Open a connection pool against the configured SQLite database,
/// creating the database file if it does not exist yet.
pub async fn connect(
    settings: &bookshelf_kernel::settings::DatabaseSettings,
) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .with_context(|| "failed to open database pool")?;

    tracing::info!(url = %settings.url, "database pool ready");

    Ok(pool)
}

/// Apply module-contributed migrations, each at most once.
/// Applied migration ids are tracked in a `_migrations` table.
pub async fn run_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (id TEXT PRIMARY KEY)")
        .execute(pool)
        .await
        .with_context(|| "failed to create migration tracking table")?;

    for (module, migration) in migrations {
        let key = format!("{}/{}", module, migration.id);

        let applied = sqlx::query("SELECT id FROM _migrations WHERE id = ?")
            .bind(&key)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("failed to check migration '{}'", key))?;

        if applied.is_some() {
            tracing::debug!(migration = %key, "migration already applied");
            continue;
        }

        tracing::info!(migration = %key, "applying migration");

        sqlx::raw_sql(migration.up)
            .execute(pool)
            .await
            .with_context(|| format!("failed to apply migration '{}'", key))?;

        sqlx::query("INSERT INTO _migrations (id) VALUES (?)")
            .bind(&key)
            .execute(pool)
            .await
            .with_context(|| format!("failed to record migration '{}'", key))?;
    }

    Ok(())
}
