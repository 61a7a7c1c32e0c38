//! Curated timeline retrieval.
//!
//! Reads an entity's category documents and renders them as JSON in the
//! stored shape (`subcategory → [event]`). Used by `tlc show`.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use timeline_curator_core::models::{CategoryDocument, Event};
use timeline_curator_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// An entity's timeline keyed by main category.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineResponse {
    pub entity: String,
    pub categories: BTreeMap<String, BTreeMap<String, Vec<Event>>>,
}

/// Collect an entity's documents, optionally limited to one main category.
pub async fn get_timeline(
    store: &dyn Store,
    entity: &str,
    category: Option<&str>,
) -> Result<TimelineResponse> {
    let docs: Vec<CategoryDocument> = match category {
        Some(main) => vec![store.get_document(entity, main).await?],
        None => store.list_documents(entity).await?,
    };

    Ok(TimelineResponse {
        entity: entity.to_string(),
        categories: docs
            .into_iter()
            .map(|doc| (doc.main_category, doc.subcategories))
            .collect(),
    })
}

/// `tlc show <entity> [--category <main>]`.
pub async fn run_show(config: &Config, entity: &str, category: Option<&str>) -> Result<()> {
    if let Some(main) = category {
        let taxonomy = config.taxonomy()?;
        if taxonomy.subcategories(main).is_none() {
            bail!("unknown main category: {}", main);
        }
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let timeline = get_timeline(&store, entity, category).await?;
    store.pool().close().await;

    println!("{}", serde_json::to_string_pretty(&timeline)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_curator_core::models::TimelinePoint;
    use timeline_curator_core::store::memory::InMemoryStore;

    #[tokio::test]
    async fn test_timeline_shape() {
        let store = InMemoryStore::new();
        let mut doc = CategoryDocument::empty("alice", "Creative Works");
        doc.events_mut("Awards & Honors").push(Event::from(
            timeline_curator_core::models::CandidateEvent {
                event_title: "Best New Artist".to_string(),
                event_summary: "Won".to_string(),
                timeline_points: vec![TimelinePoint::new("2024-03-01", "Won", "S1")],
            },
        ));
        store.put_document(&doc).await.unwrap();

        let all = get_timeline(&store, "alice", None).await.unwrap();
        let json = serde_json::to_value(&all).unwrap();
        let event = &json["categories"]["Creative Works"]["Awards & Honors"][0];
        assert_eq!(event["event_years"][0], 2024);
        assert_eq!(event["timeline_points"][0]["sourceIds"][0], "S1");

        let one = get_timeline(&store, "alice", Some("Personal Life")).await.unwrap();
        assert!(one.categories["Personal Life"].is_empty());
    }
}
