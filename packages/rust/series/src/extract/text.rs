//! Free-text extractor: inline `YYYY-MM-DD ... score: 0.42` mentions in prose.

use std::sync::LazyLock;

use regex::Regex;
use trendbrief_shared::{ExtractionConfig, Result, TrendbriefError};

use super::{Extraction, PointExtractor};
use crate::normalize::{RawPair, ScoreCandidate};

/// Characters allowed between the date and `score` unless configured otherwise.
const DEFAULT_GAP_CHARS: usize = 20;

static DEFAULT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&pattern_for_gap(DEFAULT_GAP_CHARS)).expect("valid regex")
});

/// Build the scan pattern for a given gap.
///
/// The gap is lazy and cannot cross a line break, so each date pairs with
/// the nearest following `score` on the same line.
fn pattern_for_gap(gap: usize) -> String {
    format!(
        r"(?i)([0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}).{{0,{gap}}}?score[:=]\s*(-?[0-9]+(?:\.[0-9]+)?)"
    )
}

/// Scans unstructured prose for dated score mentions.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    pattern: Regex,
    gap_chars: usize,
}

impl TextExtractor {
    /// Extractor allowing at most `gap_chars` characters between date and `score`.
    pub fn with_gap(gap_chars: usize) -> Result<Self> {
        let pattern = Regex::new(&pattern_for_gap(gap_chars)).map_err(|e| {
            TrendbriefError::config(format!("text window of {gap_chars} chars: {e}"))
        })?;
        Ok(Self { pattern, gap_chars })
    }

    /// Extractor honoring the configured window and window mode.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Self::with_gap(config.gap_chars())
    }

    pub fn gap_chars(&self) -> usize {
        self.gap_chars
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
            gap_chars: DEFAULT_GAP_CHARS,
        }
    }
}

impl PointExtractor for TextExtractor {
    fn extract(&self, content: &str) -> Extraction {
        let pairs = self
            .pattern
            .captures_iter(content)
            .map(|caps| {
                RawPair::new(
                    Some(caps[1].to_string()),
                    Some(ScoreCandidate::Text(caps[2].to_string())),
                )
            })
            .collect();

        Extraction {
            pairs,
            diagnostics: Vec::new(),
        }
    }

    fn name(&self) -> &str {
        "text"
    }
}
