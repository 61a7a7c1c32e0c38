//! Context window construction for merge decisions.
//!
//! The merge oracle only ever sees a bounded, recency-biased slice of a
//! subcategory's events. Events are visited newest first (by latest point
//! date, then by list position, later positions counting as newer) and
//! added while both the event-count and serialized-character budgets hold.
//! The first event that does not fit ends the window, so the window is
//! always a contiguous run of the most recent events.
//!
//! Events left out of the window are never touched in storage, and
//! `UPDATE_EXISTING` targets are still resolved against the full list.

use std::cmp::Reverse;

use crate::models::{CandidateEvent, Event};
use crate::normalize::truncate_chars;

/// Default serialized-character budget for the existing-event context.
pub const DEFAULT_CONTEXT_CHAR_BUDGET: usize = 8_000;
/// Default character budget for the candidate's own summary.
pub const DEFAULT_CANDIDATE_SUMMARY_BUDGET: usize = 2_000;
/// Default cap on the number of events in one window.
pub const DEFAULT_MAX_CONTEXT_EVENTS: usize = 50;

/// Limits applied when building a [`ContextWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBudget {
    pub max_chars: usize,
    pub max_events: usize,
}

impl Default for WindowBudget {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CONTEXT_CHAR_BUDGET,
            max_events: DEFAULT_MAX_CONTEXT_EVENTS,
        }
    }
}

/// The subset of existing events shown to the merge oracle.
#[derive(Debug, Clone)]
pub struct ContextWindow<'a> {
    /// Selected events, most recent first.
    pub events: Vec<&'a Event>,
    /// Serialized characters used by `events`.
    pub chars_used: usize,
    /// Events left out of the window.
    pub omitted: usize,
}

/// Select the most recent events that fit within `budget`.
pub fn build_context_window<'a>(events: &'a [Event], budget: &WindowBudget) -> ContextWindow<'a> {
    let mut order: Vec<usize> = (0..events.len()).collect();
    order.sort_by_key(|&i| Reverse((events[i].latest_point_date(), i)));

    let mut selected = Vec::new();
    let mut chars_used = 0usize;

    for i in order {
        if selected.len() >= budget.max_events {
            break;
        }
        let size = serialized_chars(&events[i]);
        if chars_used.saturating_add(size) > budget.max_chars {
            break;
        }
        chars_used += size;
        selected.push(&events[i]);
    }

    ContextWindow {
        omitted: events.len() - selected.len(),
        events: selected,
        chars_used,
    }
}

/// Size of an event as the oracle would receive it.
pub fn serialized_chars(event: &Event) -> usize {
    serde_json::to_string(event)
        .map(|s| s.chars().count())
        .unwrap_or(usize::MAX)
}

/// Copy of `candidate` with its summary hard-truncated to `max_chars`.
pub fn truncate_candidate(candidate: &CandidateEvent, max_chars: usize) -> CandidateEvent {
    let mut truncated = candidate.clone();
    if truncated.event_summary.chars().count() > max_chars {
        truncated.event_summary = truncate_chars(&truncated.event_summary, max_chars);
    }
    truncated
}
