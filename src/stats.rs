//! Database statistics overview.
//!
//! Summarizes what has been curated: entity, event, and point counts, and
//! how many imported sources are still waiting. Used by `tlc stats`.

use anyhow::Result;
use sqlx::Row;

use timeline_curator_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Per-entity breakdown.
struct EntityStats {
    entity: String,
    documents: usize,
    events: usize,
    points: usize,
    pending_sources: i64,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_sources: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources")
        .fetch_one(&pool)
        .await?;
    let pending_sources: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sources WHERE processed = 0")
            .fetch_one(&pool)
            .await?;
    let total_facts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facts")
        .fetch_one(&pool)
        .await?;

    let pending_rows = sqlx::query(
        "SELECT entity_id, COUNT(*) AS pending FROM sources WHERE processed = 0 GROUP BY entity_id",
    )
    .fetch_all(&pool)
    .await?;

    let store = SqliteStore::new(pool);
    let mut entity_stats = Vec::new();
    for entity in store.list_entities().await? {
        let docs = store.list_documents(&entity).await?;
        let pending = pending_rows
            .iter()
            .find(|row| row.get::<String, _>("entity_id") == entity)
            .map(|row| row.get::<i64, _>("pending"))
            .unwrap_or(0);
        entity_stats.push(EntityStats {
            documents: docs.len(),
            events: docs.iter().map(|d| d.event_count()).sum(),
            points: docs.iter().map(|d| d.point_count()).sum(),
            pending_sources: pending,
            entity,
        });
    }
    store.pool().close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Timeline Curator: Database Stats");
    println!("=================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Entities:    {}", entity_stats.len());
    println!(
        "  Events:      {}",
        entity_stats.iter().map(|s| s.events).sum::<usize>()
    );
    println!(
        "  Points:      {}",
        entity_stats.iter().map(|s| s.points).sum::<usize>()
    );
    println!(
        "  Sources:     {} ({} pending)",
        total_sources, pending_sources
    );
    println!("  Facts:       {}", total_facts);

    if !entity_stats.is_empty() {
        println!();
        println!("  By entity:");
        println!(
            "  {:<24} {:>6} {:>8} {:>8} {:>8}",
            "ENTITY", "DOCS", "EVENTS", "POINTS", "PENDING"
        );
        println!("  {}", "-".repeat(60));
        for s in &entity_stats {
            println!(
                "  {:<24} {:>6} {:>8} {:>8} {:>8}",
                s.entity, s.documents, s.events, s.points, s.pending_sources
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
