//! Tabular extractor: delimited rows with a `date` and a `score` column.

use super::{Diagnostic, Extraction, PointExtractor};
use crate::normalize::{RawPair, ScoreCandidate};

const DATE_COLUMN: &str = "date";
const SCORE_COLUMN: &str = "score";

/// Reads comma-separated content whose header names the columns.
///
/// Column names are matched exactly as upstream producers write them.
/// Rows whose field count differs from the header are skipped; a bad row
/// never stops later rows from being read.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularExtractor;

impl PointExtractor for TabularExtractor {
    fn extract(&self, content: &str) -> Extraction {
        let mut out = Extraction::default();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = match reader.headers() {
            Ok(headers) if !headers.is_empty() => headers.clone(),
            Ok(_) => {
                out.note(Diagnostic::MissingHeader);
                return out;
            }
            Err(e) => {
                out.note(Diagnostic::MalformedRow {
                    line: 1,
                    message: e.to_string(),
                });
                return out;
            }
        };

        // Later duplicates win, matching dict-style row access.
        let date_idx = last_column(&headers, DATE_COLUMN);
        let score_idx = last_column(&headers, SCORE_COLUMN);
        let (date_idx, score_idx) = match (date_idx, score_idx) {
            (Some(d), Some(s)) => (d, s),
            (None, _) => {
                out.note(Diagnostic::MissingColumn(DATE_COLUMN));
                return out;
            }
            (_, None) => {
                out.note(Diagnostic::MissingColumn(SCORE_COLUMN));
                return out;
            }
        };

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    out.note(Diagnostic::MalformedRow {
                        line,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if record.len() != headers.len() {
                out.note(Diagnostic::RowLength {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    expected: headers.len(),
                    found: record.len(),
                });
                continue;
            }

            out.pairs.push(RawPair::new(
                record.get(date_idx).map(str::to_string),
                record
                    .get(score_idx)
                    .map(|s| ScoreCandidate::Text(s.to_string())),
            ));
        }

        out
    }

    fn name(&self) -> &str {
        "tabular"
    }
}

fn last_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| *h == name)
        .map(|(i, _)| i)
        .last()
}
