//! Source import.
//!
//! Loads sources and their dated facts from the extractor's JSON hand-off
//! file into the store:
//!
//! ```json
//! [
//!   {
//!     "id": "S1",
//!     "entity": "alice",
//!     "fetched_at": 1709251200,
//!     "facts": [{ "date": "2024-03-01", "description": "Group wins Best New Artist" }]
//!   }
//! ]
//! ```
//!
//! `fetched_at` (Unix seconds) is optional and defaults to the import time.
//! A source id that already exists is left untouched, including its
//! `processed` flag.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use timeline_curator_core::models::{DatedFact, Source};
use timeline_curator_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Deserialize)]
struct ImportedSource {
    id: String,
    entity: String,
    #[serde(default)]
    fetched_at: Option<i64>,
    #[serde(default)]
    facts: Vec<DatedFact>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub inserted: usize,
    pub existing: usize,
    pub facts: usize,
}

/// Parse an import file body into sources stamped with `now` where the
/// file gives no `fetched_at`.
pub fn parse_sources(content: &str, now: i64) -> Result<Vec<Source>> {
    let imported: Vec<ImportedSource> =
        serde_json::from_str(content).context("Failed to parse import file")?;

    let mut sources = Vec::with_capacity(imported.len());
    for item in imported {
        if item.id.trim().is_empty() {
            bail!("import entry with empty id");
        }
        if item.entity.trim().is_empty() {
            bail!("source {} has an empty entity", item.id);
        }
        sources.push(Source {
            id: item.id,
            entity_id: item.entity,
            fetched_at: item.fetched_at.unwrap_or(now),
            facts: item.facts,
            processed: false,
        });
    }
    Ok(sources)
}

pub async fn import_sources(store: &dyn Store, sources: &[Source]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    for source in sources {
        if store.insert_source(source).await? {
            stats.inserted += 1;
            stats.facts += source.facts.len();
        } else {
            stats.existing += 1;
            tracing::debug!(source_id = %source.id, "source already imported");
        }
    }
    Ok(stats)
}

/// `tlc import <file.json>`.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let sources = parse_sources(&content, chrono::Utc::now().timestamp())?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let stats = import_sources(&store, &sources).await?;
    store.pool().close().await;

    println!("import {}", path.display());
    println!("  sources inserted: {}", stats.inserted);
    println!("  sources already present: {}", stats.existing);
    println!("  facts: {}", stats.facts);
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_curator_core::store::memory::InMemoryStore;

    const SAMPLE: &str = r#"[
        {"id": "S1", "entity": "alice", "fetched_at": 100,
         "facts": [{"date": "2024-03-01", "description": "Group wins Best New Artist"}]},
        {"id": "S2", "entity": "alice",
         "facts": [{"date": "2023", "description": "Debut"},
                   {"date": "2023-05", "description": "Tour"}]}
    ]"#;

    #[test]
    fn test_parse_defaults_fetched_at() {
        let sources = parse_sources(SAMPLE, 999).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].fetched_at, 100);
        assert_eq!(sources[1].fetched_at, 999);
        assert_eq!(sources[1].facts[1].description, "Tour");
        assert!(!sources[1].processed);
    }

    #[test]
    fn test_parse_rejects_blank_entity() {
        assert!(parse_sources(r#"[{"id": "S1", "entity": " ", "facts": []}]"#, 0).is_err());
        assert!(parse_sources("{}", 0).is_err());
    }

    #[tokio::test]
    async fn test_reimport_is_ignored() {
        let store = InMemoryStore::new();
        let sources = parse_sources(SAMPLE, 0).unwrap();
        let first = import_sources(&store, &sources).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.facts, 3);
        store.mark_processed("S1").await.unwrap();

        let second = import_sources(&store, &sources).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.existing, 2);
        assert!(store.source("S1").unwrap().unwrap().processed);
    }
}
