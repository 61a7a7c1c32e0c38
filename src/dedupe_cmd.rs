//! Duplicate maintenance pass over curated events.
//!
//! Walks every category document of an entity and runs the duplicate
//! resolver on each event in turn. A document is written back only when at
//! least one of its events changed, and never in a dry run. The entity lock
//! is held for the whole pass; a [`Curator`](crate::curate::Curator) built
//! with the same [`EntityLocks`] registry waits for it, and it waits for
//! the curator.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use timeline_curator_core::dedup::{deduplicate_event, DedupStats};
use timeline_curator_core::oracle::DuplicateOracle;
use timeline_curator_core::store::Store;

use crate::config::Config;
use crate::locks::EntityLocks;
use crate::progress::{CurationProgressEvent, CurationProgressReporter, ProgressMode};
use crate::sqlite_store::SqliteStore;
use crate::{db, llm};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupeReport {
    pub entity: String,
    pub events_changed: usize,
    pub documents_written: usize,
    pub stats: DedupStats,
}

/// Deduplicate every event of one entity.
pub async fn dedupe_entity(
    store: &dyn Store,
    oracle: &dyn DuplicateOracle,
    locks: &EntityLocks,
    entity: &str,
    threshold: f64,
    dry_run: bool,
) -> Result<DedupeReport> {
    let _guard = locks.lock(entity).await?;
    let mut report = DedupeReport {
        entity: entity.to_string(),
        ..DedupeReport::default()
    };

    for mut doc in store.list_documents(entity).await? {
        let mut changed = false;
        for (subcategory, events) in doc.subcategories.iter_mut() {
            for event in events.iter_mut() {
                let stats = deduplicate_event(event, oracle, threshold).await;
                if stats.merged > 0 {
                    changed = true;
                    report.events_changed += 1;
                    tracing::info!(
                        entity,
                        main_category = %doc.main_category,
                        subcategory = %subcategory,
                        event = %event.event_title,
                        merged = stats.merged,
                        "deduplicated event"
                    );
                }
                report.stats.add(stats);
            }
        }

        if changed && !dry_run {
            store.put_document(&doc).await?;
            report.documents_written += 1;
        }
    }

    Ok(report)
}

/// Deduplicate several entities concurrently; failures are per entity.
pub async fn dedupe_many(
    store: Arc<dyn Store>,
    oracle: Arc<dyn DuplicateOracle>,
    locks: &EntityLocks,
    entities: Vec<String>,
    threshold: f64,
    dry_run: bool,
    concurrency: usize,
) -> Vec<(String, Result<DedupeReport>)> {
    let store = store.as_ref();
    let oracle = oracle.as_ref();
    let mut results: Vec<(String, Result<DedupeReport>)> = stream::iter(entities)
        .map(|entity| async move {
            let result = dedupe_entity(store, oracle, locks, &entity, threshold, dry_run).await;
            (entity, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

/// `tlc dedupe <entity|all> [--dry-run]`.
pub async fn run_dedupe(
    config: &Config,
    target: &str,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let oracle = llm::create_oracle(&config.oracle)?;
    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));

    let entities = if target == "all" {
        store.list_entities().await?
    } else {
        vec![target.to_string()]
    };

    let reporter = progress.reporter();
    let locks = EntityLocks::new();
    let results = dedupe_many(
        store,
        oracle,
        &locks,
        entities,
        config.curation.duplicate_threshold,
        dry_run,
        config.curation.entity_concurrency,
    )
    .await;

    let mut failed = 0;
    for (entity, result) in &results {
        println!("dedupe {}", entity);
        match result {
            Ok(r) => {
                println!("  comparisons: {}", r.stats.comparisons);
                println!("  points merged: {}", r.stats.merged);
                println!("  events changed: {}", r.events_changed);
                println!("  oracle failures: {}", r.stats.oracle_failures);
                if dry_run {
                    println!("  (dry run, nothing written)");
                }
                report_done(reporter.as_ref(), entity, r);
            }
            Err(e) => {
                failed += 1;
                println!("  error: {:#}", e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} entities failed", failed, results.len());
    }
    println!("ok");
    Ok(())
}

fn report_done(reporter: &dyn CurationProgressReporter, entity: &str, report: &DedupeReport) {
    reporter.report(CurationProgressEvent::EntityFinished {
        entity: entity.to_string(),
        merged: report.stats.merged as u64,
        skipped: 0,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use timeline_curator_core::models::{CategoryDocument, Event, TimelinePoint};
    use timeline_curator_core::oracle::DuplicateVerdict;
    use timeline_curator_core::store::memory::InMemoryStore;

    struct Always(f64);

    #[async_trait]
    impl DuplicateOracle for Always {
        async fn compare(&self, _: &str, _: &str, _: &str, _: &str) -> Result<DuplicateVerdict> {
            Ok(DuplicateVerdict {
                is_duplicate: true,
                confidence: self.0,
                merged_description: None,
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl DuplicateOracle for Broken {
        async fn compare(&self, _: &str, _: &str, _: &str, _: &str) -> Result<DuplicateVerdict> {
            bail!("down")
        }
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut doc = CategoryDocument::empty("e1", "Creative Works");
        let mut event = Event {
            event_title: "Best New Artist".to_string(),
            event_summary: "Won".to_string(),
            timeline_points: vec![
                TimelinePoint::new("2024-03-01", "Wins Best New Artist", "S2"),
                TimelinePoint::new("2024-03-01", "Group wins Best New Artist award", "S1"),
            ],
            event_years: vec![],
        };
        event.refresh_years();
        doc.events_mut("Awards & Honors").push(event);
        store.put_document(&doc).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_merges_and_writes_back() {
        let store = seeded().await;
        let report = dedupe_entity(&store, &Always(0.9), &EntityLocks::new(), "e1", 0.75, false)
            .await
            .unwrap();
        assert_eq!(report.documents_written, 1);
        let doc = store.get_document("e1", "Creative Works").await.unwrap();
        let points = &doc.events("Awards & Honors")[0].timeline_points;
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].source_ids, vec!["S1", "S2"]);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = seeded().await;
        let before = store.get_document("e1", "Creative Works").await.unwrap();
        let report = dedupe_entity(&store, &Always(0.9), &EntityLocks::new(), "e1", 0.75, true)
            .await
            .unwrap();
        assert_eq!(report.stats.merged, 1);
        assert_eq!(report.documents_written, 0);
        assert_eq!(store.get_document("e1", "Creative Works").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_oracle_failure_leaves_document_untouched() {
        let store = seeded().await;
        let report = dedupe_entity(&store, &Broken, &EntityLocks::new(), "e1", 0.75, false)
            .await
            .unwrap();
        assert_eq!(report.stats.oracle_failures, 1);
        assert_eq!(report.documents_written, 0);
    }
}
