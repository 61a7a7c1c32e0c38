//! Storage abstraction for Timeline Curator.
//!
//! The [`Store`] trait is the persistence gateway: one whole
//! [`CategoryDocument`] per (entity, main category), plus the flat source
//! collection whose `processed` flag the completion tracker flips.
//!
//! No field-level updates are offered. Every merge reads a whole document
//! and writes a whole document back, so callers must guarantee a single
//! writer per entity (see `EntityLocks` in the `timeline-curator` crate).

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CategoryDocument, Source};

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_document`](Store::get_document) | Read one category document (empty if absent) |
/// | [`put_document`](Store::put_document) | Overwrite one category document |
/// | [`list_documents`](Store::list_documents) | Every category document of an entity |
/// | [`list_entities`](Store::list_entities) | Every entity with documents or sources |
/// | [`insert_source`](Store::insert_source) | Add a source with its facts, unless the id exists |
/// | [`sources`](Store::sources) | An entity's sources, in fetch order |
/// | [`mark_processed`](Store::mark_processed) | Flip a source's `processed` flag |
/// | [`pending_entities`](Store::pending_entities) | Entities with unprocessed sources |
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the document for (entity, main category). A missing document is
    /// returned as an empty one, never as an error.
    async fn get_document(&self, entity_id: &str, main_category: &str)
        -> Result<CategoryDocument>;

    /// Overwrite the whole document.
    async fn put_document(&self, doc: &CategoryDocument) -> Result<()>;

    /// All documents for an entity, ordered by main category.
    async fn list_documents(&self, entity_id: &str) -> Result<Vec<CategoryDocument>>;

    /// All entity ids known to the store, sorted.
    async fn list_entities(&self) -> Result<Vec<String>>;

    /// Insert a source and its facts. Returns `false` and leaves the stored
    /// source untouched when the id already exists.
    async fn insert_source(&self, source: &Source) -> Result<bool>;

    /// An entity's sources in fetch order: newest `fetched_at` first, then
    /// source id descending. Processed sources are included only when
    /// `include_processed` is set.
    async fn sources(&self, entity_id: &str, include_processed: bool) -> Result<Vec<Source>>;

    /// Mark a source processed. Idempotent.
    async fn mark_processed(&self, source_id: &str) -> Result<()>;

    /// Entity ids with at least one unprocessed source, sorted.
    async fn pending_entities(&self) -> Result<Vec<String>>;
}

/// Sort sources into fetch order.
pub fn sort_fetch_order(sources: &mut [Source]) {
    sources.sort_by(|a, b| {
        b.fetched_at
            .cmp(&a.fetched_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
