//! Core data models used throughout Timeline Curator.
//!
//! Facts arrive from the upstream extractor attached to a [`Source`]. Each
//! fact becomes a transient [`CandidateEvent`], which is classified and then
//! merged into the curated [`Event`] lists held by a [`CategoryDocument`].
//!
//! The serialized field names (`event_title`, `timeline_points`,
//! `sourceIds`, ...) are the persisted document format and the shape the
//! oracles read and write, so they must not be renamed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::years;

/// An atomic, dated statement extracted from one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub source_id: String,
    pub date: String,
    pub description: String,
}

/// A dated fact as stored on its [`Source`], before it is attributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedFact {
    pub date: String,
    pub description: String,
}

/// A source document and the facts the extractor pulled out of it.
///
/// `processed` is flipped to `true` exactly once, after every fact has
/// reached a terminal outcome, and is never flipped back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub entity_id: String,
    /// Unix timestamp of when the source was fetched. Drives fetch order.
    #[serde(default)]
    pub fetched_at: i64,
    #[serde(default)]
    pub facts: Vec<DatedFact>,
    #[serde(default)]
    pub processed: bool,
}

impl Source {
    /// The source's facts in the order they appear in its fact map.
    pub fn facts(&self) -> Vec<Fact> {
        self.facts
            .iter()
            .map(|f| Fact {
                source_id: self.id.clone(),
                date: f.date.clone(),
                description: f.description.clone(),
            })
            .collect()
    }
}

/// One dated occurrence contributing to an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: String,
    pub description: String,
    /// Sources that reported this point. Set semantics: never contains
    /// the same id twice.
    #[serde(rename = "sourceIds", default)]
    pub source_ids: Vec<String>,
}

impl TimelinePoint {
    pub fn new(date: impl Into<String>, description: impl Into<String>, source_id: &str) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            source_ids: vec![source_id.to_string()],
        }
    }

    /// Drop repeated source ids, keeping first-seen order.
    pub fn normalize_source_ids(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.source_ids.retain(|id| seen.insert(id.clone()));
    }
}

/// The single-fact, pre-classification representation of a [`Fact`].
///
/// Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub event_title: String,
    pub event_summary: String,
    pub timeline_points: Vec<TimelinePoint>,
}

impl CandidateEvent {
    /// A candidate must carry a title and a summary before any oracle sees it.
    pub fn is_valid(&self) -> bool {
        !self.event_title.trim().is_empty() && !self.event_summary.trim().is_empty()
    }

    /// Source ids referenced by this candidate's points.
    pub fn source_ids(&self) -> Vec<&str> {
        self.timeline_points
            .iter()
            .flat_map(|p| p.source_ids.iter().map(String::as_str))
            .collect()
    }
}

/// A curated, possibly multi-source, named timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_title: String,
    #[serde(default)]
    pub event_summary: String,
    #[serde(default)]
    pub timeline_points: Vec<TimelinePoint>,
    /// Derived from `timeline_points`; see [`Event::refresh_years`].
    #[serde(default)]
    pub event_years: Vec<i32>,
}

impl Event {
    /// Recompute `event_years` and normalize every point's source ids.
    ///
    /// Called after every mutation; `event_years` is never edited directly.
    pub fn refresh_years(&mut self) {
        for point in &mut self.timeline_points {
            point.normalize_source_ids();
        }
        self.event_years = years::event_years(&self.timeline_points);
    }

    /// The most recent parseable point date, if any.
    pub fn latest_point_date(&self) -> Option<years::PointDate> {
        self.timeline_points
            .iter()
            .filter_map(|p| years::parse_point_date(&p.date))
            .max()
    }
}

impl From<CandidateEvent> for Event {
    fn from(candidate: CandidateEvent) -> Self {
        let mut event = Event {
            event_title: candidate.event_title,
            event_summary: candidate.event_summary,
            timeline_points: candidate.timeline_points,
            event_years: Vec::new(),
        };
        event.refresh_years();
        event
    }
}

/// The persisted unit for one (entity, main category) pair.
///
/// This is the unit of read-modify-write: every merge reads the whole
/// document and writes the whole document back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDocument {
    pub entity_id: String,
    pub main_category: String,
    #[serde(default)]
    pub subcategories: BTreeMap<String, Vec<Event>>,
}

impl CategoryDocument {
    pub fn empty(entity_id: &str, main_category: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            main_category: main_category.to_string(),
            subcategories: BTreeMap::new(),
        }
    }

    pub fn events(&self, subcategory: &str) -> &[Event] {
        self.subcategories
            .get(subcategory)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn events_mut(&mut self, subcategory: &str) -> &mut Vec<Event> {
        self.subcategories
            .entry(subcategory.to_string())
            .or_default()
    }

    pub fn event_count(&self) -> usize {
        self.subcategories.values().map(Vec::len).sum()
    }

    pub fn point_count(&self) -> usize {
        self.subcategories
            .values()
            .flatten()
            .map(|e| e.timeline_points.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_camel_case_source_ids() {
        let point = TimelinePoint::new("2024-03-01", "Wins award", "S1");
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["sourceIds"], serde_json::json!(["S1"]));
        assert!(json.get("source_ids").is_none());
    }

    #[test]
    fn test_refresh_years_dedupes_source_ids() {
        let mut event = Event {
            event_title: "Tour".to_string(),
            event_summary: "World tour".to_string(),
            timeline_points: vec![TimelinePoint {
                date: "2023-07-01".to_string(),
                description: "Opening night".to_string(),
                source_ids: vec!["S2".into(), "S1".into(), "S2".into()],
            }],
            event_years: vec![1999],
        };
        event.refresh_years();
        assert_eq!(event.timeline_points[0].source_ids, vec!["S2", "S1"]);
        assert_eq!(event.event_years, vec![2023]);
    }

    #[test]
    fn test_source_facts_keep_order() {
        let source = Source {
            id: "S9".to_string(),
            entity_id: "artist-1".to_string(),
            fetched_at: 0,
            facts: vec![
                DatedFact {
                    date: "2024-01-02".into(),
                    description: "second".into(),
                },
                DatedFact {
                    date: "2023-05-05".into(),
                    description: "first".into(),
                },
            ],
            processed: false,
        };
        let facts = source.facts();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].description, "second");
        assert!(facts.iter().all(|f| f.source_id == "S9"));
    }

    #[test]
    fn test_event_missing_optional_fields_deserializes() {
        let event: Event = serde_json::from_str(r#"{"event_title":"Debut"}"#).unwrap();
        assert!(event.timeline_points.is_empty());
        assert!(event.event_years.is_empty());
    }
}
