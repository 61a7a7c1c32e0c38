//! Prompt text for the three oracle questions.
//!
//! Each builder returns a `(system, user)` pair. The user message always
//! carries its payload as pretty JSON so the model sees the same shapes the
//! engine stores. Answers are requested as a single JSON object.

use anyhow::Result;
use serde_json::json;

use timeline_curator_core::models::CandidateEvent;
use timeline_curator_core::oracle::MergeRequest;
use timeline_curator_core::taxonomy::Taxonomy;

pub const CLASSIFY_SYSTEM: &str = "You sort events from a public figure's life into a fixed \
taxonomy. Choose exactly one main category and one of its subcategories. Use the names \
exactly as given. Reply with a JSON object: \
{\"main_category\": string, \"subcategory\": string}.";

pub const MERGE_SYSTEM: &str = "You maintain a timeline of events within one subcategory. \
Given the existing events (most recent first) and a candidate event, decide whether the \
candidate describes a new event or continues an existing one. Reply with a JSON object: \
{\"action\": \"CREATE_NEW\" | \"UPDATE_EXISTING\", \"target_event_title\": string | null, \
\"event\": {\"event_title\": string, \"event_summary\": string, \"timeline_points\": \
[{\"date\": string, \"description\": string, \"sourceIds\": [string]}]}}. \
For UPDATE_EXISTING, target_event_title must be the exact title of an existing event and \
event must be the complete updated event including all earlier timeline points and their \
sourceIds. Never drop a sourceId.";

pub const DUPLICATE_SYSTEM: &str = "You decide whether two timeline entries dated the same day \
describe the same real-world occurrence. Reply with a JSON object: \
{\"is_duplicate\": bool, \"confidence\": number between 0 and 1, \
\"merged_description\": string | null}. Provide merged_description only when is_duplicate \
is true; it should combine the details of both entries.";

pub fn classify_messages(
    candidate: &CandidateEvent,
    taxonomy: &Taxonomy,
) -> Result<(String, String)> {
    let payload = json!({
        "taxonomy": taxonomy.to_json(),
        "candidate": {
            "event_title": candidate.event_title,
            "event_summary": candidate.event_summary,
            "dates": candidate
                .timeline_points
                .iter()
                .map(|p| p.date.as_str())
                .collect::<Vec<_>>(),
        },
    });
    Ok((
        CLASSIFY_SYSTEM.to_string(),
        serde_json::to_string_pretty(&payload)?,
    ))
}

pub fn merge_messages(request: &MergeRequest<'_>) -> Result<(String, String)> {
    Ok((
        MERGE_SYSTEM.to_string(),
        serde_json::to_string_pretty(request)?,
    ))
}

pub fn duplicate_messages(
    description_a: &str,
    description_b: &str,
    date_a: &str,
    date_b: &str,
) -> Result<(String, String)> {
    let payload = json!({
        "entry_a": { "date": date_a, "description": description_a },
        "entry_b": { "date": date_b, "description": description_b },
    });
    Ok((
        DUPLICATE_SYSTEM.to_string(),
        serde_json::to_string_pretty(&payload)?,
    ))
}
