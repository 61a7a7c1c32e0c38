//! SQLite-backed [`Store`] implementation.
//!
//! Category documents are stored whole: the subcategory map is serialized
//! to `body_json` and replaced on every write. Sources live in `sources`,
//! their facts in `facts` keyed by position so the original order survives.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use timeline_curator_core::models::{CategoryDocument, DatedFact, Event, Source};
use timeline_curator_core::store::{sort_fetch_order, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_facts(&self, source_id: &str) -> Result<Vec<DatedFact>> {
        let rows = sqlx::query(
            "SELECT date, description FROM facts WHERE source_id = ? ORDER BY position ASC",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DatedFact {
                date: row.get("date"),
                description: row.get("description"),
            })
            .collect())
    }
}

fn decode_document(
    entity_id: &str,
    main_category: &str,
    body_json: &str,
) -> Result<CategoryDocument> {
    let subcategories: BTreeMap<String, Vec<Event>> = serde_json::from_str(body_json)
        .with_context(|| {
            format!(
                "corrupt document body for {} / {}",
                entity_id, main_category
            )
        })?;
    Ok(CategoryDocument {
        entity_id: entity_id.to_string(),
        main_category: main_category.to_string(),
        subcategories,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_document(
        &self,
        entity_id: &str,
        main_category: &str,
    ) -> Result<CategoryDocument> {
        let row = sqlx::query(
            "SELECT body_json FROM category_documents WHERE entity_id = ? AND main_category = ?",
        )
        .bind(entity_id)
        .bind(main_category)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body_json");
                decode_document(entity_id, main_category, &body)
            }
            None => Ok(CategoryDocument::empty(entity_id, main_category)),
        }
    }

    async fn put_document(&self, doc: &CategoryDocument) -> Result<()> {
        let body = serde_json::to_string(&doc.subcategories)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO category_documents (entity_id, main_category, body_json, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(entity_id, main_category) DO UPDATE SET
                body_json = excluded.body_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&doc.entity_id)
        .bind(&doc.main_category)
        .bind(&body)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_documents(&self, entity_id: &str) -> Result<Vec<CategoryDocument>> {
        let rows = sqlx::query(
            "SELECT main_category, body_json FROM category_documents \
             WHERE entity_id = ? ORDER BY main_category ASC",
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let main: String = row.get("main_category");
                let body: String = row.get("body_json");
                decode_document(entity_id, &main, &body)
            })
            .collect()
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let entities: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT entity_id FROM category_documents
            UNION
            SELECT entity_id FROM sources
            ORDER BY entity_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entities)
    }

    async fn insert_source(&self, source: &Source) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO sources (id, entity_id, fetched_at, processed) VALUES (?, ?, ?, 0) \
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&source.id)
        .bind(&source.entity_id)
        .bind(source.fetched_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for (position, fact) in source.facts.iter().enumerate() {
            sqlx::query(
                "INSERT INTO facts (source_id, position, date, description) VALUES (?, ?, ?, ?)",
            )
            .bind(&source.id)
            .bind(position as i64)
            .bind(&fact.date)
            .bind(&fact.description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn sources(&self, entity_id: &str, include_processed: bool) -> Result<Vec<Source>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entity_id, fetched_at, processed FROM sources
            WHERE entity_id = ? AND (? OR processed = 0)
            ORDER BY fetched_at DESC, id DESC
            "#,
        )
        .bind(entity_id)
        .bind(include_processed)
        .fetch_all(&self.pool)
        .await?;

        let mut sources = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let processed: i64 = row.get("processed");
            let facts = self.load_facts(&id).await?;
            sources.push(Source {
                id,
                entity_id: row.get("entity_id"),
                fetched_at: row.get("fetched_at"),
                facts,
                processed: processed != 0,
            });
        }
        // SQLite orders TEXT by bytes; keep the same tie-break as the trait.
        sort_fetch_order(&mut sources);
        Ok(sources)
    }

    async fn mark_processed(&self, source_id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE sources SET processed = 1, processed_at = COALESCE(processed_at, ?) \
             WHERE id = ?",
        )
        .bind(now)
        .bind(source_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("unknown source: {}", source_id);
        }
        Ok(())
    }

    async fn pending_entities(&self) -> Result<Vec<String>> {
        let entities: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT entity_id FROM sources WHERE processed = 0 ORDER BY entity_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entities)
    }
}
