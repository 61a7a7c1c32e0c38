//! Fact normalization: one [`Fact`] in, one single-point
//! [`CandidateEvent`] out.

use crate::models::{CandidateEvent, Fact, TimelinePoint};

/// Default cap on the characters of a derived candidate title.
pub const DEFAULT_TITLE_MAX_CHARS: usize = 80;

/// Turn a fact into a candidate event.
///
/// The title is the fact's first sentence, cut at a word boundary to at
/// most `title_max_chars` characters. The summary and the single point's
/// description are the full fact text. A blank description yields an
/// invalid candidate (see [`CandidateEvent::is_valid`]), which the pipeline
/// skips without calling any oracle.
pub fn candidate_from_fact(fact: &Fact, title_max_chars: usize) -> CandidateEvent {
    let description = fact.description.trim();
    CandidateEvent {
        event_title: derive_title(description, title_max_chars),
        event_summary: description.to_string(),
        timeline_points: vec![TimelinePoint::new(
            fact.date.trim(),
            description,
            &fact.source_id,
        )],
    }
}

fn derive_title(description: &str, max_chars: usize) -> String {
    let first_sentence = description
        .split_terminator(['.', '!', '?', '\n'])
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("");

    if first_sentence.chars().count() <= max_chars {
        return first_sentence.to_string();
    }

    let cut: String = first_sentence.chars().take(max_chars).collect();
    match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => cut[..idx].trim_end().to_string(),
        _ => cut,
    }
}

/// Hard-truncate a string to at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
