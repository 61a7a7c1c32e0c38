//! Merge decision adapter.
//!
//! Builds the recency-biased context window, truncates the candidate, and
//! asks the merge oracle for a verdict. Oracle errors and malformed answers
//! are retried with a fixed delay; once the attempts run out the caller
//! skips the candidate.
//!
//! The window only limits what the oracle *sees*. The returned
//! `UPDATE_EXISTING` target is resolved by the merge applier against the
//! full event list.

use std::time::Duration;

use timeline_curator_core::merge::MergeDecision;
use timeline_curator_core::models::{CandidateEvent, Event};
use timeline_curator_core::oracle::{MergeOracle, MergeRequest};
use timeline_curator_core::window::{build_context_window, truncate_candidate, WindowBudget};

use crate::config::CurationConfig;

/// Fixed-delay retry policy for merge decisions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CurationConfig) -> Self {
        Self {
            max_retries: config.merge_max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

#[derive(Debug)]
pub enum DecideOutcome {
    Decided {
        decision: MergeDecision,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        last_error: String,
    },
}

/// Ask the merge oracle what to do with `candidate` given `existing`.
pub async fn decide_merge(
    oracle: &dyn MergeOracle,
    subcategory: &str,
    existing: &[Event],
    candidate: &CandidateEvent,
    budget: &WindowBudget,
    candidate_summary_budget: usize,
    policy: RetryPolicy,
) -> DecideOutcome {
    let window = build_context_window(existing, budget);
    if window.omitted > 0 {
        tracing::debug!(
            subcategory,
            shown = window.events.len(),
            omitted = window.omitted,
            chars = window.chars_used,
            "context window truncated"
        );
    }

    let candidate = truncate_candidate(candidate, candidate_summary_budget);
    let request = MergeRequest {
        subcategory,
        existing_events: window.events,
        candidate: &candidate,
    };

    let mut last_error = String::from("no attempt made");

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            tokio::time::sleep(policy.delay).await;
        }

        match oracle.decide(&request).await {
            Ok(response) => match response.into_decision() {
                Some(decision) => {
                    return DecideOutcome::Decided {
                        decision,
                        attempts: attempt + 1,
                    }
                }
                None => {
                    last_error = "malformed merge response".to_string();
                    tracing::warn!(subcategory, attempt = attempt + 1, "malformed merge response");
                }
            },
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(
                    subcategory,
                    attempt = attempt + 1,
                    error = %e,
                    "merge oracle failed"
                );
            }
        }
    }

    DecideOutcome::Exhausted {
        attempts: policy.max_retries + 1,
        last_error,
    }
}
