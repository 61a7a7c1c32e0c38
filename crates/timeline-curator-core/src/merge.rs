//! Applying merge verdicts to a subcategory's event list.
//!
//! | Verdict | Target found | Effect |
//! |---------|--------------|--------|
//! | `CreateNew` | title not in list | append |
//! | `CreateNew` | title already in list | extend that event with the new points |
//! | `UpdateExisting` | yes | replace the slot in place (full replace) |
//! | `UpdateExisting` | no | fall back to `CreateNew` |
//!
//! Titles stay unique within a list, and every touched event has its
//! `event_years` recomputed. A replacement never loses source ids: any id
//! the old event carried that the replacement dropped is carried over.

use serde::Serialize;

use crate::models::{Event, TimelinePoint};

/// A well-formed verdict from the merge oracle.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeDecision {
    CreateNew { event: Event },
    UpdateExisting { target_title: String, event: Event },
}

/// How a decision ended up being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedAs {
    /// A new event was appended.
    Created,
    /// An existing event slot was replaced.
    Updated,
    /// `CreateNew` named an existing title; its points were folded in.
    Extended,
    /// `UpdateExisting` named a title that does not exist; appended instead.
    FallbackCreated,
}

/// Result of [`apply_decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub applied_as: AppliedAs,
    /// Position of the affected event in the list after application.
    pub index: usize,
}

/// Apply `decision` to `events` in place.
pub fn apply_decision(decision: MergeDecision, events: &mut Vec<Event>) -> MergeOutcome {
    match decision {
        MergeDecision::CreateNew { event } => insert_new(event, events),
        MergeDecision::UpdateExisting {
            target_title,
            mut event,
        } => match events.iter().position(|e| e.event_title == target_title) {
            Some(index) => {
                carry_dropped_sources(&events[index], &mut event);
                event.refresh_years();
                events[index] = event;
                let index = fold_duplicate_titles(events, index);
                MergeOutcome {
                    applied_as: AppliedAs::Updated,
                    index,
                }
            }
            None => {
                tracing::warn!(
                    target_title = %target_title,
                    "merge target not found, creating new event instead"
                );
                let outcome = insert_new(event, events);
                MergeOutcome {
                    applied_as: if outcome.applied_as == AppliedAs::Created {
                        AppliedAs::FallbackCreated
                    } else {
                        outcome.applied_as
                    },
                    index: outcome.index,
                }
            }
        },
    }
}

fn insert_new(mut event: Event, events: &mut Vec<Event>) -> MergeOutcome {
    event.refresh_years();
    match events
        .iter()
        .position(|e| e.event_title == event.event_title)
    {
        Some(index) => {
            extend_event(&mut events[index], event);
            MergeOutcome {
                applied_as: AppliedAs::Extended,
                index,
            }
        }
        None => {
            events.push(event);
            MergeOutcome {
                applied_as: AppliedAs::Created,
                index: events.len() - 1,
            }
        }
    }
}

/// Fold `incoming`'s points into `existing`.
///
/// A point with the same date and description as an existing one only
/// contributes its source ids; anything else is appended.
pub fn extend_event(existing: &mut Event, incoming: Event) {
    if existing.event_summary.trim().is_empty() {
        existing.event_summary = incoming.event_summary;
    }
    for point in incoming.timeline_points {
        merge_point(&mut existing.timeline_points, point);
    }
    existing.refresh_years();
}

fn merge_point(points: &mut Vec<TimelinePoint>, incoming: TimelinePoint) {
    match points
        .iter_mut()
        .find(|p| p.date == incoming.date && p.description == incoming.description)
    {
        Some(point) => {
            for id in incoming.source_ids {
                if !point.source_ids.contains(&id) {
                    point.source_ids.push(id);
                }
            }
        }
        None => points.push(incoming),
    }
}

/// Re-attach source ids present in `previous` but missing from
/// `replacement`. An id goes to the replacement's first point with the same
/// date; if no point shares the date, the old point is kept with the missing
/// ids.
fn carry_dropped_sources(previous: &Event, replacement: &mut Event) {
    for old in &previous.timeline_points {
        let missing: Vec<String> = old
            .source_ids
            .iter()
            .filter(|id| {
                !replacement
                    .timeline_points
                    .iter()
                    .any(|p| p.source_ids.contains(id))
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            continue;
        }

        tracing::warn!(
            event_title = %previous.event_title,
            date = %old.date,
            dropped = missing.len(),
            "replacement dropped source ids, carrying them over"
        );
        match replacement
            .timeline_points
            .iter_mut()
            .find(|p| p.date == old.date)
        {
            Some(point) => point.source_ids.extend(missing),
            None => replacement.timeline_points.push(TimelinePoint {
                date: old.date.clone(),
                description: old.description.clone(),
                source_ids: missing,
            }),
        }
    }
}

/// After a replace, another slot may now carry the same title. Fold it into
/// the replaced slot so titles stay unique. Returns the replaced slot's
/// final index.
fn fold_duplicate_titles(events: &mut Vec<Event>, index: usize) -> usize {
    let title = events[index].event_title.clone();
    let mut index = index;
    loop {
        let found = events
            .iter()
            .enumerate()
            .position(|(i, e)| i != index && e.event_title == title);
        let Some(dup) = found else {
            break;
        };
        tracing::warn!(title = %title, "replacement produced a duplicate title, folding events");
        let other = events.remove(dup);
        if dup < index {
            index -= 1;
        }
        extend_event(&mut events[index], other);
    }
    index
}
