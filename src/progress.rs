//! Curation progress reporting.
//!
//! Reports observable progress during `tlc curate` and `tlc dedupe` so
//! users see which entity is being worked on and how many sources are left.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum CurationProgressEvent {
    /// An entity pass started with `sources` sources to work through.
    EntityStarted { entity: String, sources: u64 },
    /// `n` of `total` sources for this entity reached a terminal state.
    SourceDone {
        entity: String,
        source_id: String,
        n: u64,
        total: u64,
    },
    /// An entity pass finished.
    EntityFinished {
        entity: String,
        merged: u64,
        skipped: u64,
    },
}

/// Reports curation progress. Implementations write to stderr (human or JSON).
pub trait CurationProgressReporter: Send + Sync {
    fn report(&self, event: CurationProgressEvent);
}

/// Human-friendly progress on stderr: "curate alice  12 / 40 sources".
pub struct StderrProgress;

impl CurationProgressReporter for StderrProgress {
    fn report(&self, event: CurationProgressEvent) {
        let line = match &event {
            CurationProgressEvent::EntityStarted { entity, sources } => {
                format!("curate {}  {} sources pending\n", entity, format_number(*sources))
            }
            CurationProgressEvent::SourceDone { entity, n, total, .. } => {
                format!(
                    "curate {}  {} / {} sources\n",
                    entity,
                    format_number(*n),
                    format_number(*total)
                )
            }
            CurationProgressEvent::EntityFinished {
                entity,
                merged,
                skipped,
            } => format!(
                "curate {}  done  merged {}, skipped {}\n",
                entity,
                format_number(*merged),
                format_number(*skipped)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl CurationProgressReporter for JsonProgress {
    fn report(&self, event: CurationProgressEvent) {
        let obj = match &event {
            CurationProgressEvent::EntityStarted { entity, sources } => serde_json::json!({
                "event": "progress",
                "entity": entity,
                "phase": "started",
                "total": sources
            }),
            CurationProgressEvent::SourceDone {
                entity,
                source_id,
                n,
                total,
            } => serde_json::json!({
                "event": "progress",
                "entity": entity,
                "phase": "source_done",
                "source_id": source_id,
                "n": n,
                "total": total
            }),
            CurationProgressEvent::EntityFinished {
                entity,
                merged,
                skipped,
            } => serde_json::json!({
                "event": "progress",
                "entity": entity,
                "phase": "finished",
                "merged": merged,
                "skipped": skipped
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl CurationProgressReporter for NoProgress {
    fn report(&self, _event: CurationProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut groups = Vec::new();
    let mut end = digits.len();
    while end > 3 {
        groups.push(&digits[end - 3..end]);
        end -= 3;
    }
    groups.push(&digits[..end]);
    groups.reverse();
    groups.join(",")
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" | "none" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn CurationProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("none"), Some(ProgressMode::Off));
        assert_eq!(ProgressMode::parse("loud"), None);
    }
}
