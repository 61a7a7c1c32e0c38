//! Year index derivation for events.
//!
//! Point dates are free-form strings from the extractor. Three shapes are
//! understood: `YYYY-MM-DD`, `YYYY-MM`, and `YYYY`. Anything else is
//! skipped with a warning; an unparseable date never fails a merge.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::models::TimelinePoint;

/// A parsed point date at whatever precision the source gave.
///
/// Orders chronologically; a coarser date sorts before a finer one in the
/// same period (`2023` < `2023-01` < `2023-01-01`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// Parse a point date as `YYYY-MM-DD`, `YYYY-MM`, or `YYYY`.
pub fn parse_point_date(raw: &str) -> Option<PointDate> {
    let s = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(PointDate {
            year: date.year(),
            month: Some(date.month()),
            day: Some(date.day()),
        });
    }

    if let Some((year, month)) = s.split_once('-') {
        if year.len() == 4 && month.len() == 2 {
            let year = parse_year(year)?;
            let month: u32 = month.parse().ok()?;
            if (1..=12).contains(&month) {
                return Some(PointDate {
                    year,
                    month: Some(month),
                    day: None,
                });
            }
        }
        return None;
    }

    parse_year(s).map(|year| PointDate {
        year,
        month: None,
        day: None,
    })
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Distinct years of the given points, sorted descending.
pub fn event_years(points: &[TimelinePoint]) -> Vec<i32> {
    let mut years = BTreeSet::new();
    for point in points {
        match parse_point_date(&point.date) {
            Some(date) => {
                years.insert(date.year);
            }
            None => {
                tracing::warn!(date = %point.date, "skipping unparseable timeline point date");
            }
        }
    }
    years.into_iter().rev().collect()
}
