//! Structured extractor: JSON objects carrying `date` and `score` fields.

use serde_json::Value;

use super::{Diagnostic, Extraction, PointExtractor};
use crate::normalize::{RawPair, ScoreCandidate};

/// Reads a JSON object, or an array of objects, for `date`/`score` fields.
///
/// Parsing is strict RFC 8259: a document containing `NaN` or `Infinity`
/// literals is invalid as a whole, so none of its elements are read.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredExtractor;

impl PointExtractor for StructuredExtractor {
    fn extract(&self, content: &str) -> Extraction {
        let mut out = Extraction::default();

        let value: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                out.note(Diagnostic::InvalidSyntax(e.to_string()));
                return out;
            }
        };

        let items = match value {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            other => {
                out.note(Diagnostic::UnsupportedTopLevel(json_type(&other)));
                return out;
            }
        };

        for (index, item) in items.iter().enumerate() {
            let Value::Object(map) = item else {
                out.note(Diagnostic::NonObjectElement { index });
                continue;
            };

            out.pairs.push(RawPair::new(
                map.get("date").and_then(date_candidate),
                map.get("score").and_then(score_candidate),
            ));
        }

        out
    }

    fn name(&self) -> &str {
        "structured"
    }
}

/// Only JSON strings can carry an ISO date.
fn date_candidate(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn score_candidate(value: &Value) -> Option<ScoreCandidate> {
    match value {
        Value::String(s) => Some(ScoreCandidate::Text(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(ScoreCandidate::Integer(i)),
            None => n.as_f64().map(ScoreCandidate::Float),
        },
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
