//! Duplicate resolution within a single event.
//!
//! Points are compared pairwise, left to right, and only when their `date`
//! strings are identical; different dates never reach the oracle. A pair is
//! merged when the oracle calls it a duplicate with confidence above the
//! threshold. The merged point unions both source-id sets (sorted) and
//! keeps the longer description, or the oracle's `merged_description` when
//! that is longer still.
//!
//! This is a greedy single pass: once a point has been folded into an
//! earlier one it is never compared again. Chains where A≈B and B≈C but
//! A≉C are only caught as far as each later point still scores against the
//! growing base point. Running the pass twice is a no-op when nothing
//! scores above the threshold.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{Event, TimelinePoint};
use crate::oracle::DuplicateOracle;

/// Default confidence a verdict must exceed to merge two points.
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.75;

/// Counters from one resolver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    /// Oracle calls made.
    pub comparisons: usize,
    /// Points folded into an earlier point.
    pub merged: usize,
    /// Oracle calls that failed and were treated as "not a duplicate".
    pub oracle_failures: usize,
}

impl DedupStats {
    pub fn add(&mut self, other: DedupStats) {
        self.comparisons += other.comparisons;
        self.merged += other.merged;
        self.oracle_failures += other.oracle_failures;
    }
}

/// Merge duplicate points, preserving the order of surviving points.
pub async fn deduplicate_points(
    points: &[TimelinePoint],
    oracle: &dyn DuplicateOracle,
    threshold: f64,
) -> (Vec<TimelinePoint>, DedupStats) {
    let mut stats = DedupStats::default();
    let mut consumed = vec![false; points.len()];
    let mut result = Vec::with_capacity(points.len());

    for i in 0..points.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;

        let mut base = points[i].clone();
        let mut source_ids: BTreeSet<String> = base.source_ids.iter().cloned().collect();
        let mut merged_any = false;

        for j in (i + 1)..points.len() {
            if consumed[j] || points[j].date != base.date {
                continue;
            }

            stats.comparisons += 1;
            let verdict = match oracle
                .compare(
                    &base.description,
                    &points[j].description,
                    &base.date,
                    &points[j].date,
                )
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    stats.oracle_failures += 1;
                    tracing::warn!(date = %base.date, error = %e, "duplicate comparison failed");
                    continue;
                }
            };

            if !(verdict.is_duplicate && verdict.confidence > threshold) {
                continue;
            }

            consumed[j] = true;
            merged_any = true;
            stats.merged += 1;
            source_ids.extend(points[j].source_ids.iter().cloned());

            if points[j].description.chars().count() > base.description.chars().count() {
                base.description = points[j].description.clone();
            }
            if let Some(merged) = verdict.merged_description {
                if merged.chars().count() > base.description.chars().count() {
                    base.description = merged;
                }
            }
            tracing::debug!(
                date = %base.date,
                confidence = verdict.confidence,
                "merged duplicate timeline point"
            );
        }

        if merged_any {
            base.source_ids = source_ids.into_iter().collect();
        }
        result.push(base);
    }

    (result, stats)
}

/// Run [`deduplicate_points`] over one event and refresh its year index.
pub async fn deduplicate_event(
    event: &mut Event,
    oracle: &dyn DuplicateOracle,
    threshold: f64,
) -> DedupStats {
    let (points, stats) = deduplicate_points(&event.timeline_points, oracle, threshold).await;
    if stats.merged > 0 {
        event.timeline_points = points;
        event.refresh_years();
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::DuplicateVerdict;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores every pair with a fixed confidence and counts calls.
    struct FixedOracle {
        confidence: f64,
        merged_description: Option<String>,
        calls: AtomicUsize,
    }

    impl FixedOracle {
        fn new(confidence: f64) -> Self {
            Self {
                confidence,
                merged_description: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DuplicateOracle for FixedOracle {
        async fn compare(&self, _: &str, _: &str, _: &str, _: &str) -> Result<DuplicateVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DuplicateVerdict {
                is_duplicate: true,
                confidence: self.confidence,
                merged_description: self.merged_description.clone(),
            })
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl DuplicateOracle for FailingOracle {
        async fn compare(&self, _: &str, _: &str, _: &str, _: &str) -> Result<DuplicateVerdict> {
            bail!("oracle unavailable")
        }
    }

    fn point(date: &str, desc: &str, ids: &[&str]) -> TimelinePoint {
        TimelinePoint {
            date: date.to_string(),
            description: desc.to_string(),
            source_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_high_confidence_merges_and_unions_sources() {
        let oracle = FixedOracle::new(0.9);
        let points = vec![
            point("2024-03-01", "Wins award", &["S2"]),
            point("2024-03-01", "Group wins Best New Artist", &["S1"]),
        ];
        let (out, stats) = deduplicate_points(&points, &oracle, DEFAULT_DUPLICATE_THRESHOLD).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_ids, vec!["S1", "S2"]);
        assert_eq!(out[0].description, "Group wins Best New Artist");
        assert_eq!(stats.merged, 1);
    }

    #[tokio::test]
    async fn test_low_confidence_stays_separate() {
        let oracle = FixedOracle::new(0.5);
        let points = vec![
            point("2024-03-01", "a", &["S1"]),
            point("2024-03-01", "b", &["S2"]),
        ];
        let (out, stats) = deduplicate_points(&points, &oracle, DEFAULT_DUPLICATE_THRESHOLD).await;
        assert_eq!(out, points);
        assert_eq!(stats.comparisons, 1);
        assert_eq!(stats.merged, 0);
    }

    #[tokio::test]
    async fn test_threshold_is_exclusive() {
        let oracle = FixedOracle::new(0.75);
        let points = vec![point("2024", "a", &["S1"]), point("2024", "b", &["S2"])];
        let (out, _) = deduplicate_points(&points, &oracle, 0.75).await;
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_different_dates_never_compared() {
        let oracle = FixedOracle::new(1.0);
        let points = vec![
            point("2024-03-01", "a", &["S1"]),
            point("2024-03-02", "a", &["S2"]),
            point("2024-03", "a", &["S3"]),
        ];
        let (out, stats) = deduplicate_points(&points, &oracle, 0.75).await;
        assert_eq!(out.len(), 3);
        assert_eq!(stats.comparisons, 0);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consumed_points_not_recompared() {
        let oracle = FixedOracle::new(0.95);
        let points = vec![
            point("2022", "a", &["S1"]),
            point("2022", "bb", &["S2"]),
            point("2022", "ccc", &["S3"]),
        ];
        let (out, stats) = deduplicate_points(&points, &oracle, 0.75).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_ids, vec!["S1", "S2", "S3"]);
        assert_eq!(out[0].description, "ccc");
        // base vs 1, base vs 2; the consumed index 1 is never a base
        assert_eq!(stats.comparisons, 2);
    }

    #[tokio::test]
    async fn test_longer_merged_description_wins() {
        let mut oracle = FixedOracle::new(0.9);
        oracle.merged_description = Some("A much longer combined description".to_string());
        let points = vec![point("2024", "short", &["S1"]), point("2024", "shorter!", &["S2"])];
        let (out, _) = deduplicate_points(&points, &oracle, 0.75).await;
        assert_eq!(out[0].description, "A much longer combined description");
    }

    #[tokio::test]
    async fn test_shorter_merged_description_ignored() {
        let mut oracle = FixedOracle::new(0.9);
        oracle.merged_description = Some("x".to_string());
        let points = vec![point("2024", "short", &["S1"]), point("2024", "longest one", &["S2"])];
        let (out, _) = deduplicate_points(&points, &oracle, 0.75).await;
        assert_eq!(out[0].description, "longest one");
    }

    #[tokio::test]
    async fn test_oracle_failure_keeps_points() {
        let points = vec![point("2024", "a", &["S1"]), point("2024", "b", &["S2"])];
        let (out, stats) = deduplicate_points(&points, &FailingOracle, 0.75).await;
        assert_eq!(out, points);
        assert_eq!(stats.oracle_failures, 1);
    }

    #[tokio::test]
    async fn test_second_pass_is_noop() {
        let oracle = FixedOracle::new(0.9);
        let mut event = Event {
            event_title: "Award".to_string(),
            event_summary: String::new(),
            timeline_points: vec![
                point("2024-03-01", "a", &["S1"]),
                point("2024-03-01", "ab", &["S2"]),
                point("2023", "c", &["S3"]),
            ],
            event_years: vec![],
        };
        let first = deduplicate_event(&mut event, &oracle, 0.75).await;
        assert_eq!(first.merged, 1);
        assert_eq!(event.event_years, vec![2024, 2023]);
        let snapshot = event.clone();
        let second = deduplicate_event(&mut event, &oracle, 0.75).await;
        assert_eq!(second.merged, 0);
        assert_eq!(second.comparisons, 0);
        assert_eq!(event, snapshot);
    }
}
