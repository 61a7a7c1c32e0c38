//! Contracts for the external text-reasoning services.
//!
//! The curation engine never interprets natural language itself. It calls
//! three oracles through these traits and only decides *what* context they
//! receive and *how* their structured answers are applied:
//!
//! | Trait | Question |
//! |-------|----------|
//! | [`ClassificationOracle`] | which (main, sub) category does this candidate belong to? |
//! | [`MergeOracle`] | does this candidate start a new event or update an existing one? |
//! | [`DuplicateOracle`] | are these two same-date points the same occurrence? |
//!
//! Implementations may fail with any error; callers decide whether to
//! retry. Responses are deserialized loosely (everything optional) so that
//! the engine, not serde, decides what a malformed answer means.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::merge::MergeDecision;
use crate::models::{CandidateEvent, Event};
use crate::taxonomy::Taxonomy;

/// Raw answer from the classification oracle. Not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    #[serde(default)]
    pub main_category: String,
    #[serde(default)]
    pub subcategory: String,
}

/// Everything the merge oracle is shown for one decision.
#[derive(Debug, Clone, Serialize)]
pub struct MergeRequest<'a> {
    pub subcategory: &'a str,
    /// The windowed context, most recent first.
    pub existing_events: Vec<&'a Event>,
    pub candidate: &'a CandidateEvent,
}

/// Raw answer from the merge oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeResponse {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub target_event_title: Option<String>,
    #[serde(default)]
    pub event: Option<Event>,
}

impl MergeResponse {
    /// Interpret the response.
    ///
    /// Returns `None` for a malformed response: missing `action` or
    /// `event`, an unknown action, an event without a title, or a point
    /// with no source ids. Callers treat that the same as a transient
    /// failure.
    ///
    /// `UPDATE_EXISTING` without a target title degrades to `CreateNew`.
    pub fn into_decision(self) -> Option<MergeDecision> {
        let action = self.action?;
        let mut event = self.event?;
        if event.event_title.trim().is_empty() {
            return None;
        }
        for point in &mut event.timeline_points {
            point.source_ids.retain(|id| !id.trim().is_empty());
        }
        if event.timeline_points.iter().any(|p| p.source_ids.is_empty()) {
            return None;
        }

        match action.trim().to_ascii_uppercase().as_str() {
            "CREATE_NEW" => Some(MergeDecision::CreateNew { event }),
            "UPDATE_EXISTING" => match self.target_event_title {
                Some(target_title) if !target_title.trim().is_empty() => {
                    Some(MergeDecision::UpdateExisting {
                        target_title,
                        event,
                    })
                }
                _ => {
                    tracing::warn!(
                        "UPDATE_EXISTING without a target title, treating as CREATE_NEW"
                    );
                    Some(MergeDecision::CreateNew { event })
                }
            },
            _ => None,
        }
    }
}

/// Answer from the duplicate-equivalence oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub merged_description: Option<String>,
}

#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn classify(
        &self,
        candidate: &CandidateEvent,
        taxonomy: &Taxonomy,
    ) -> Result<ClassificationResponse>;
}

#[async_trait]
pub trait MergeOracle: Send + Sync {
    async fn decide(&self, request: &MergeRequest<'_>) -> Result<MergeResponse>;
}

#[async_trait]
pub trait DuplicateOracle: Send + Sync {
    async fn compare(
        &self,
        description_a: &str,
        description_b: &str,
        date_a: &str,
        date_b: &str,
    ) -> Result<DuplicateVerdict>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Option<MergeDecision> {
        serde_json::from_value::<MergeResponse>(value)
            .unwrap()
            .into_decision()
    }

    #[test]
    fn test_create_new() {
        let d = parse(json!({
            "action": "CREATE_NEW",
            "event": {"event_title": "Debut", "event_summary": "s", "timeline_points": []}
        }));
        assert!(matches!(d, Some(MergeDecision::CreateNew { .. })));
    }

    #[test]
    fn test_update_existing_lowercase_action() {
        let d = parse(json!({
            "action": "update_existing",
            "target_event_title": "Debut",
            "event": {"event_title": "Debut"}
        }));
        match d {
            Some(MergeDecision::UpdateExisting { target_title, .. }) => {
                assert_eq!(target_title, "Debut")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_action_or_event_is_malformed() {
        assert!(parse(json!({"event": {"event_title": "x"}})).is_none());
        assert!(parse(json!({"action": "CREATE_NEW"})).is_none());
        assert!(parse(json!({})).is_none());
    }

    #[test]
    fn test_unknown_action_is_malformed() {
        assert!(parse(json!({"action": "DELETE", "event": {"event_title": "x"}})).is_none());
    }

    #[test]
    fn test_untitled_event_is_malformed() {
        assert!(parse(json!({"action": "CREATE_NEW", "event": {"event_title": " "}})).is_none());
    }

    #[test]
    fn test_point_without_sources_is_malformed() {
        let point = json!({"date": "2024-03-01", "description": "wins"});
        assert!(parse(json!({
            "action": "CREATE_NEW",
            "event": {"event_title": "Award", "timeline_points": [point]}
        }))
        .is_none());
        assert!(parse(json!({
            "action": "UPDATE_EXISTING",
            "target_event_title": "Award",
            "event": {
                "event_title": "Award",
                "timeline_points": [
                    {"date": "2024-03-01", "description": "wins", "sourceIds": ["S1"]},
                    {"date": "2024-03-02", "description": "speech", "sourceIds": [" "]}
                ]
            }
        }))
        .is_none());
    }

    #[test]
    fn test_blank_source_ids_are_dropped() {
        let d = parse(json!({
            "action": "CREATE_NEW",
            "event": {
                "event_title": "Award",
                "timeline_points": [
                    {"date": "2024-03-01", "description": "wins", "sourceIds": ["", "S1"]}
                ]
            }
        }));
        match d {
            Some(MergeDecision::CreateNew { event }) => {
                assert_eq!(event.timeline_points[0].source_ids, vec!["S1"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_update_without_target_degrades_to_create() {
        let d = parse(json!({"action": "UPDATE_EXISTING", "event": {"event_title": "x"}}));
        assert!(matches!(d, Some(MergeDecision::CreateNew { .. })));
    }

    #[test]
    fn test_duplicate_verdict_optional_merge_text() {
        let v: DuplicateVerdict =
            serde_json::from_value(json!({"is_duplicate": true, "confidence": 0.9})).unwrap();
        assert!(v.is_duplicate);
        assert!(v.merged_description.is_none());
    }
}
