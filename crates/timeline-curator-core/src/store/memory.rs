//! In-memory [`Store`] implementation for tests and dry runs.
//!
//! Uses `BTreeMap`s behind `std::sync::RwLock`. Documents are cloned in and
//! out, so callers get the same whole-document semantics as with SQLite.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{CategoryDocument, Source};

use super::{sort_fetch_order, Store};

/// In-memory store.
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<(String, String), CategoryDocument>>,
    sources: RwLock<BTreeMap<String, Source>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            sources: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up a single source by id.
    pub fn source(&self, source_id: &str) -> Result<Option<Source>> {
        Ok(read(&self.sources)?.get(source_id).cloned())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_document(
        &self,
        entity_id: &str,
        main_category: &str,
    ) -> Result<CategoryDocument> {
        let docs = read(&self.docs)?;
        Ok(docs
            .get(&(entity_id.to_string(), main_category.to_string()))
            .cloned()
            .unwrap_or_else(|| CategoryDocument::empty(entity_id, main_category)))
    }

    async fn put_document(&self, doc: &CategoryDocument) -> Result<()> {
        let mut docs = write(&self.docs)?;
        docs.insert(
            (doc.entity_id.clone(), doc.main_category.clone()),
            doc.clone(),
        );
        Ok(())
    }

    async fn list_documents(&self, entity_id: &str) -> Result<Vec<CategoryDocument>> {
        let docs = read(&self.docs)?;
        Ok(docs
            .iter()
            .filter(|((entity, _), _)| entity == entity_id)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let mut entities: BTreeSet<String> = read(&self.docs)?
            .keys()
            .map(|(entity, _)| entity.clone())
            .collect();
        entities.extend(read(&self.sources)?.values().map(|s| s.entity_id.clone()));
        Ok(entities.into_iter().collect())
    }

    async fn insert_source(&self, source: &Source) -> Result<bool> {
        let mut sources = write(&self.sources)?;
        if sources.contains_key(&source.id) {
            return Ok(false);
        }
        sources.insert(source.id.clone(), source.clone());
        Ok(true)
    }

    async fn sources(&self, entity_id: &str, include_processed: bool) -> Result<Vec<Source>> {
        let mut found: Vec<Source> = read(&self.sources)?
            .values()
            .filter(|s| s.entity_id == entity_id && (include_processed || !s.processed))
            .cloned()
            .collect();
        sort_fetch_order(&mut found);
        Ok(found)
    }

    async fn mark_processed(&self, source_id: &str) -> Result<()> {
        let mut sources = write(&self.sources)?;
        match sources.get_mut(source_id) {
            Some(source) => {
                source.processed = true;
                Ok(())
            }
            None => Err(anyhow!("unknown source: {}", source_id)),
        }
    }

    async fn pending_entities(&self) -> Result<Vec<String>> {
        let entities: BTreeSet<String> = read(&self.sources)?
            .values()
            .filter(|s| !s.processed)
            .map(|s| s.entity_id.clone())
            .collect();
        Ok(entities.into_iter().collect())
    }
}
