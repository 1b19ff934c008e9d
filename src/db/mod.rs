mod models;

pub use models::*;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("condominio.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Core schema (users, sessions, payments, receipts, notifications)
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Community modules (announcements, maintenance, common spaces)
    execute_sql(pool, include_str!("../../migrations/002_comunidad.sql")).await?;

    // Migration 003: Add phone number to user profiles
    let has_telefono: Option<(String,)> =
        sqlx::query_as("SELECT name FROM pragma_table_info('usuarios') WHERE name = 'telefono'")
            .fetch_optional(pool)
            .await?;
    if has_telefono.is_none() {
        execute_sql(pool, include_str!("../../migrations/003_telefono.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

/// In-memory pool with the full schema applied, for tests.
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("pragma");
    run_migrations(&pool).await.expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_database_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();

        assert!(dir.path().join("condominio.db").exists());

        // Migrations ran, including the conditional telefono column
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
        let telefono: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM pragma_table_info('usuarios') WHERE name = 'telefono'",
        )
        .fetch_optional(&pool)
        .await
        .unwrap();
        assert!(telefono.is_some());
    }

    #[tokio::test]
    async fn migrations_are_rerunnable() {
        let pool = test_pool().await;
        run_migrations(&pool).await.unwrap();
    }
}
