//! Validated observations and the time-ordered series built from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A validated (timestamp, score) pair.
///
/// Offset-qualified timestamps are converted to UTC before being stored,
/// so every observation in a run compares on the same clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    /// Always finite.
    pub score: f64,
}

impl Observation {
    /// Calendar date of the observation.
    pub fn date(&self) -> chrono::NaiveDate {
        self.timestamp.date()
    }
}

/// Observations sorted ascending by timestamp.
///
/// Ties keep the order in which they were encountered, and observations
/// sharing a timestamp are all retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    /// Stable-sort `observations` by timestamp.
    pub fn from_unsorted(mut observations: Vec<Observation>) -> Self {
        // `sort_by_key` is stable, which preserves encounter order on ties.
        observations.sort_by_key(|o| o.timestamp);
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.observations.iter().map(|o| o.timestamp).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.score).collect()
    }

    /// The series if it has anything to chart, `None` otherwise.
    ///
    /// Chart consumers treat `None` as "skip the chart", never as a failure.
    pub fn non_empty(&self) -> Option<&Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

impl IntoIterator for Series {
    type Item = Observation;
    type IntoIter = std::vec::IntoIter<Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(y: i32, m: u32, d: u32, score: f64) -> Observation {
        Observation {
            timestamp: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            score,
        }
    }

    #[test]
    fn sorts_ascending() {
        let series = Series::from_unsorted(vec![
            obs(2025, 3, 1, 0.3),
            obs(2025, 1, 1, 0.1),
            obs(2025, 2, 1, 0.2),
        ]);
        assert_eq!(series.scores(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn ties_keep_encounter_order_and_are_not_deduplicated() {
        let series = Series::from_unsorted(vec![
            obs(2025, 1, 2, 0.9),
            obs(2025, 1, 1, 0.5),
            obs(2025, 1, 1, 0.7),
            obs(2025, 1, 1, 0.5),
        ]);
        assert_eq!(series.len(), 4);
        assert_eq!(series.scores(), vec![0.5, 0.7, 0.5, 0.9]);
    }

    #[test]
    fn empty_series_has_no_chart_data() {
        let series = Series::default();
        assert!(series.non_empty().is_none());

        let series = Series::from_unsorted(vec![obs(2025, 1, 1, 0.1)]);
        assert!(series.non_empty().is_some());
    }

    #[test]
    fn serializes_as_point_list() {
        let series = Series::from_unsorted(vec![obs(2025, 1, 3, 0.8)]);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"[{"timestamp":"2025-01-03T00:00:00","score":0.8}]"#);
    }
}
