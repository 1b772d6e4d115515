//! Raw candidate pairs and the normalizer that turns them into observations.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::observation::Observation;

/// A score as it appeared in a source document, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreCandidate {
    /// Textual score (prose match, CSV cell, JSON string).
    Text(String),
    /// JSON integer.
    Integer(i64),
    /// JSON float.
    Float(f64),
}

impl ScoreCandidate {
    /// Coerce to a finite `f64`, one rule per representation.
    pub fn coerce(&self) -> Result<f64, Rejection> {
        let value = match self {
            Self::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(Rejection::MissingScore);
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| Rejection::InvalidScore(raw.clone()))?
            }
            Self::Integer(value) => *value as f64,
            Self::Float(value) => *value,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(Rejection::NonFiniteScore)
        }
    }
}

impl From<&str> for ScoreCandidate {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScoreCandidate {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScoreCandidate {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ScoreCandidate {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// An untyped (date, score) pair as found by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPair {
    pub date: Option<String>,
    pub score: Option<ScoreCandidate>,
}

impl RawPair {
    pub fn new(date: Option<String>, score: Option<ScoreCandidate>) -> Self {
        Self { date, score }
    }

    pub fn normalize(&self) -> Result<Observation, Rejection> {
        normalize(self.date.as_deref(), self.score.as_ref())
    }
}

/// Why a candidate pair did not become an observation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("date is missing")]
    MissingDate,
    #[error("score is missing")]
    MissingScore,
    #[error("not an ISO-8601 date: {0:?}")]
    InvalidDate(String),
    #[error("not a number: {0:?}")]
    InvalidScore(String),
    #[error("score is not finite")]
    NonFiniteScore,
}

/// Validate a raw (date, score) candidate pair.
///
/// Absent or empty candidates, unparseable dates, and scores that do not
/// coerce to a finite number are rejected. Pure; never panics.
pub fn normalize(
    date: Option<&str>,
    score: Option<&ScoreCandidate>,
) -> Result<Observation, Rejection> {
    let date = match date {
        Some(d) if !d.is_empty() => d,
        _ => return Err(Rejection::MissingDate),
    };
    let score = score.ok_or(Rejection::MissingScore)?;

    let timestamp = parse_timestamp(date).ok_or_else(|| Rejection::InvalidDate(date.into()))?;
    let score = score.coerce()?;

    Ok(Observation { timestamp, score })
}

/// Parse an ISO-8601 calendar date with an optional time component.
///
/// Accepts `YYYY-MM-DD`, optionally followed by `T` or a space and a time
/// in extended (`HH:MM:SS`) or basic (`HHMMSS`) form, truncated to hours or
/// minutes if wanted, with optional fractional seconds. A trailing `Z` or
/// numeric offset (`±HH`, `±HHMM`, `±HH:MM`) is converted to UTC.
/// Date-only input yields midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() < 10 || !raw.is_char_boundary(10) {
        return None;
    }
    let (date_part, rest) = raw.split_at(10);
    if !is_iso_date_shape(date_part) {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    if date.year() < 1 {
        return None;
    }

    if rest.is_empty() {
        return date.and_hms_opt(0, 0, 0);
    }

    let time_part = rest
        .strip_prefix('T')
        .or_else(|| rest.strip_prefix('t'))
        .or_else(|| rest.strip_prefix(' '))?;
    let (clock, offset_secs) = split_offset(time_part)?;
    let time = parse_clock(clock)?;

    date.and_time(time)
        .checked_sub_signed(chrono::Duration::seconds(i64::from(offset_secs)))
}

fn is_iso_date_shape(s: &str) -> bool {
    s.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// `HH`, `HH:MM`, `HH:MM:SS` or the basic `HHMM`/`HHMMSS` forms. Seconds
/// may carry a fraction after `.` or `,`.
fn parse_clock(clock: &str) -> Option<NaiveTime> {
    let (main, fraction) = match clock.find(['.', ',']) {
        Some(idx) => (&clock[..idx], Some(&clock[idx + 1..])),
        None => (clock, None),
    };

    let fields: Vec<&str> = if main.contains(':') {
        main.split(':').collect()
    } else {
        (0..main.len())
            .step_by(2)
            .map(|i| main.get(i..i + 2))
            .collect::<Option<_>>()?
    };
    let well_formed = !fields.is_empty()
        && fields.len() <= 3
        && fields
            .iter()
            .all(|f| f.len() == 2 && f.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return None;
    }

    let field = |i: usize| fields.get(i).map_or(Some(0), |f| f.parse::<u32>().ok());
    let nanos = match fraction {
        None => 0,
        Some(digits) if fields.len() == 3 => parse_fraction(digits)?,
        Some(_) => return None,
    };
    NaiveTime::from_hms_nano_opt(field(0)?, field(1)?, field(2)?, nanos)
}

/// Fractional seconds as nanoseconds; digits past the ninth are dropped.
fn parse_fraction(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let kept = &digits[..digits.len().min(9)];
    let scale = 10u32.pow(9 - kept.len() as u32);
    Some(kept.parse::<u32>().ok()? * scale)
}

/// Split a trailing UTC designator or numeric offset from a time string.
fn split_offset(time: &str) -> Option<(&str, i32)> {
    if let Some(clock) = time.strip_suffix('Z').or_else(|| time.strip_suffix('z')) {
        return Some((clock, 0));
    }
    match time.rfind(['+', '-']) {
        Some(idx) => {
            let (clock, offset) = time.split_at(idx);
            Some((clock, parse_offset(offset)?))
        }
        None => Some((time, 0)),
    }
}

/// `±HH`, `±HHMM`, `±HH:MM` or the same with seconds.
fn parse_offset(offset: &str) -> Option<i32> {
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    if !matches!(digits.len(), 2 | 4 | 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let part = |i: usize| digits.get(i..i + 2).map_or(Some(0), |d| d.parse::<i32>().ok());
    let (hours, minutes, seconds) = (part(0)?, part(2)?, part(4)?);
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60 + seconds))
}
