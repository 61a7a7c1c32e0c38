use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index on an open pool. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One whole curated document per (entity, main category)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS category_documents (
            entity_id TEXT NOT NULL,
            main_category TEXT NOT NULL,
            body_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (entity_id, main_category)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            entity_id TEXT NOT NULL,
            fetched_at INTEGER NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            processed_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS facts (
            source_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            PRIMARY KEY (source_id, position),
            FOREIGN KEY (source_id) REFERENCES sources(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sources_entity ON sources(entity_id, processed)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sources_fetch_order ON sources(fetched_at DESC, id DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
