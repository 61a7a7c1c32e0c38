//! The curation pipeline and source completion tracker.
//!
//! For one entity, sources are taken in fetch order and each of their facts
//! goes through normalize → classify → decide → apply, strictly in order,
//! because every merge decision must see the effect of the previous one.
//! A source is marked processed only after all of its facts reached a
//! terminal [`FactOutcome`]. A persistence failure aborts the entity's pass
//! with that source still unprocessed, so the next run retries it.
//!
//! Entities are independent and [`Curator::curate_all`] runs them
//! concurrently, bounded by `curation.entity_concurrency`. Within an entity
//! the [`EntityLocks`] registry guarantees a single writer; pass the same
//! registry to the dedupe pass with [`Curator::with_locks`] so the two never
//! interleave on one entity.
//!
//! # Dry runs
//!
//! With `dry_run` set, documents are loaded once per pass and decisions are
//! applied to that staged copy, so later facts still see earlier results.
//! Nothing is written and no source is marked.

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use timeline_curator_core::merge::{apply_decision, AppliedAs};
use timeline_curator_core::models::{CategoryDocument, Fact};
use timeline_curator_core::normalize::candidate_from_fact;
use timeline_curator_core::oracle::{ClassificationOracle, MergeOracle};
use timeline_curator_core::store::Store;
use timeline_curator_core::taxonomy::Taxonomy;

use crate::classify::{classify_candidate, ClassifyOutcome};
use crate::config::{Config, CurationConfig};
use crate::decide::{decide_merge, DecideOutcome, RetryPolicy};
use crate::locks::EntityLocks;
use crate::progress::{CurationProgressEvent, CurationProgressReporter, NoProgress, ProgressMode};
use crate::sqlite_store::SqliteStore;
use crate::{db, llm};

/// Why a fact was skipped. Every skip is terminal for that fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Blank title or summary; no oracle was called.
    InvalidCandidate,
    /// The classification was outside the taxonomy.
    Rejected,
    /// The classification oracle failed.
    ClassificationFailed,
    /// The merge oracle failed or answered malformed on every attempt.
    MergeRetriesExhausted,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InvalidCandidate => "invalid_candidate",
            SkipReason::Rejected => "rejected",
            SkipReason::ClassificationFailed => "classification_failed",
            SkipReason::MergeRetriesExhausted => "merge_retries_exhausted",
        }
    }
}

/// Terminal outcome of one fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactOutcome {
    Merged(AppliedAs),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CurateOptions {
    pub dry_run: bool,
    /// Reprocess sources already marked processed.
    pub force: bool,
}

/// Counters for one entity pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    pub entity: String,
    pub sources_processed: usize,
    pub facts: usize,
    pub created: usize,
    pub updated: usize,
    pub extended: usize,
    pub fallback_created: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl EntityReport {
    fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: FactOutcome) {
        self.facts += 1;
        match outcome {
            FactOutcome::Merged(AppliedAs::Created) => self.created += 1,
            FactOutcome::Merged(AppliedAs::Updated) => self.updated += 1,
            FactOutcome::Merged(AppliedAs::Extended) => self.extended += 1,
            FactOutcome::Merged(AppliedAs::FallbackCreated) => self.fallback_created += 1,
            FactOutcome::Skipped(reason) => *self.skipped.entry(reason).or_insert(0) += 1,
        }
    }

    pub fn merged(&self) -> usize {
        self.created + self.updated + self.extended + self.fallback_created
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Per-entity results of a batch run. Failures never stop other entities.
#[derive(Debug, Default)]
pub struct RunReport {
    pub entities: Vec<(String, Result<EntityReport>)>,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.entities.iter().filter(|(_, r)| r.is_err()).count()
    }
}

/// The curation engine, constructed once per run.
pub struct Curator {
    store: Arc<dyn Store>,
    classifier: Arc<dyn ClassificationOracle>,
    merger: Arc<dyn MergeOracle>,
    taxonomy: Arc<Taxonomy>,
    settings: CurationConfig,
    locks: EntityLocks,
    progress: Arc<dyn CurationProgressReporter>,
}

impl Curator {
    pub fn new(
        store: Arc<dyn Store>,
        classifier: Arc<dyn ClassificationOracle>,
        merger: Arc<dyn MergeOracle>,
        taxonomy: Taxonomy,
        settings: CurationConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            merger,
            taxonomy: Arc::new(taxonomy),
            settings,
            locks: EntityLocks::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Use a lock registry shared with other writers of the same store.
    pub fn with_locks(mut self, locks: EntityLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn CurationProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Curate every entity with pending sources (every known entity with
    /// `force`), several entities at a time.
    pub async fn curate_all(&self, options: CurateOptions) -> Result<RunReport> {
        let entities = if options.force {
            self.store.list_entities().await?
        } else {
            self.store.pending_entities().await?
        };
        tracing::info!(entities = entities.len(), "curating entities");

        let mut results: Vec<(String, Result<EntityReport>)> = stream::iter(entities)
            .map(|entity| async move {
                let result = self.curate_entity(&entity, options).await;
                if let Err(e) = &result {
                    tracing::error!(entity = %entity, error = %e, "entity pass failed");
                }
                (entity, result)
            })
            .buffer_unordered(self.settings.entity_concurrency.max(1))
            .collect()
            .await;

        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(RunReport { entities: results })
    }

    /// Curate one entity's sources in fetch order.
    pub async fn curate_entity(
        &self,
        entity: &str,
        options: CurateOptions,
    ) -> Result<EntityReport> {
        let _guard = self.locks.lock(entity).await?;

        let sources = self.store.sources(entity, options.force).await?;
        let total = sources.len() as u64;
        self.progress.report(CurationProgressEvent::EntityStarted {
            entity: entity.to_string(),
            sources: total,
        });
        tracing::info!(entity, sources = total, dry_run = options.dry_run, "curating entity");

        let mut report = EntityReport::new(entity);
        let mut staged: BTreeMap<String, CategoryDocument> = BTreeMap::new();

        for (n, source) in sources.iter().enumerate() {
            for fact in source.facts() {
                let outcome = self.curate_fact(entity, &fact, &mut staged, options).await?;
                report.record(outcome);
            }

            if !options.dry_run {
                self.store.mark_processed(&source.id).await?;
            }
            report.sources_processed += 1;
            tracing::debug!(entity, source_id = %source.id, "source complete");
            self.progress.report(CurationProgressEvent::SourceDone {
                entity: entity.to_string(),
                source_id: source.id.clone(),
                n: n as u64 + 1,
                total,
            });
        }

        self.progress.report(CurationProgressEvent::EntityFinished {
            entity: entity.to_string(),
            merged: report.merged() as u64,
            skipped: report.skipped_total() as u64,
        });
        Ok(report)
    }

    /// Take one fact to a terminal outcome. Errors only on persistence failure.
    async fn curate_fact(
        &self,
        entity: &str,
        fact: &Fact,
        staged: &mut BTreeMap<String, CategoryDocument>,
        options: CurateOptions,
    ) -> Result<FactOutcome> {
        let candidate = candidate_from_fact(fact, self.settings.title_max_chars);
        if !candidate.is_valid() {
            tracing::warn!(entity, source_id = %fact.source_id, "skipping blank fact");
            return Ok(FactOutcome::Skipped(SkipReason::InvalidCandidate));
        }

        let classification =
            match classify_candidate(self.classifier.as_ref(), &candidate, &self.taxonomy).await {
                ClassifyOutcome::Accepted(c) => c,
                ClassifyOutcome::Rejected {
                    main_category,
                    subcategory,
                } => {
                    tracing::warn!(
                        entity,
                        source_id = %fact.source_id,
                        main_category = %main_category,
                        subcategory = %subcategory,
                        "classification rejected"
                    );
                    return Ok(FactOutcome::Skipped(SkipReason::Rejected));
                }
                ClassifyOutcome::Failed(e) => {
                    tracing::warn!(
                        entity,
                        source_id = %fact.source_id,
                        error = %e,
                        "classification failed"
                    );
                    return Ok(FactOutcome::Skipped(SkipReason::ClassificationFailed));
                }
            };

        let main = classification.main_category.as_str();
        let sub = classification.subcategory.as_str();
        if !staged.contains_key(main) {
            let doc = self.store.get_document(entity, main).await?;
            staged.insert(main.to_string(), doc);
        }
        let doc = staged
            .get_mut(main)
            .ok_or_else(|| anyhow!("document for {} not staged", main))?;

        let outcome = decide_merge(
            self.merger.as_ref(),
            sub,
            doc.events(sub),
            &candidate,
            &self.settings.window_budget(),
            self.settings.candidate_summary_budget,
            RetryPolicy::from_config(&self.settings),
        )
        .await;

        let decision = match outcome {
            DecideOutcome::Decided { decision, attempts } => {
                if attempts > 1 {
                    tracing::debug!(entity, attempts, "merge decided after retries");
                }
                decision
            }
            DecideOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                tracing::warn!(
                    entity,
                    source_id = %fact.source_id,
                    subcategory = sub,
                    attempts,
                    error = %last_error,
                    "merge retries exhausted, skipping fact"
                );
                return Ok(FactOutcome::Skipped(SkipReason::MergeRetriesExhausted));
            }
        };

        let applied = apply_decision(decision, doc.events_mut(sub));
        tracing::info!(
            entity,
            source_id = %fact.source_id,
            main_category = main,
            subcategory = sub,
            applied_as = ?applied.applied_as,
            "fact merged"
        );

        if !options.dry_run {
            self.store.put_document(doc).await?;
        }

        Ok(FactOutcome::Merged(applied.applied_as))
    }
}

/// `tlc curate <entity|all> [--dry-run] [--force]`.
///
/// Prints one block per entity and fails when any entity failed.
pub async fn run_curate(
    config: &Config,
    target: &str,
    options: CurateOptions,
    progress: ProgressMode,
) -> Result<()> {
    let oracle = llm::create_oracle(&config.oracle)?;
    let taxonomy = config.taxonomy()?;
    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));

    let curator = Curator::new(
        store,
        oracle.clone(),
        oracle,
        taxonomy,
        config.curation.clone(),
    )
    .with_progress(Arc::from(progress.reporter()));

    let report = if target == "all" {
        curator.curate_all(options).await?
    } else {
        let result = curator.curate_entity(target, options).await;
        RunReport {
            entities: vec![(target.to_string(), result)],
        }
    };

    for (entity, result) in &report.entities {
        println!("curate {}", entity);
        match result {
            Ok(r) => print_entity_report(r, options.dry_run),
            Err(e) => println!("  error: {:#}", e),
        }
    }

    if report.failed() > 0 {
        anyhow::bail!(
            "{} of {} entities failed",
            report.failed(),
            report.entities.len()
        );
    }
    println!("ok");
    Ok(())
}

fn print_entity_report(r: &EntityReport, dry_run: bool) {
    println!("  sources: {}", r.sources_processed);
    println!("  facts: {}", r.facts);
    println!("  created: {}", r.created + r.fallback_created);
    println!("  updated: {}", r.updated + r.extended);
    for (reason, count) in &r.skipped {
        println!("  skipped ({}): {}", reason.as_str(), count);
    }
    if dry_run {
        println!("  (dry run, nothing written)");
    }
}
