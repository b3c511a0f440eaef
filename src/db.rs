//! Database module
//!
//! Schema bootstrap and verification.

use sqlx::{Executor, PgPool};

/// Tables the stores read and write
const REQUIRED_TABLES: &[&str] = &["customers", "transactions"];

const INIT_SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Apply the bundled schema
///
/// Every statement is `IF NOT EXISTS`, so running it against an existing
/// database is a no-op.
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(INIT_SCHEMA).await?;
    tracing::info!("Database schema applied");

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for &table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
