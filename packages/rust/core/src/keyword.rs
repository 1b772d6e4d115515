//! Whole-word keyword detection in incoming mail.

use regex::{Regex, RegexBuilder};

use trendbrief_shared::{IncomingEmail, Result, TrendbriefError};

/// Matches a keyword as a whole word, case-insensitively.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keyword: String,
    pattern: Regex,
}

impl KeywordMatcher {
    pub fn new(keyword: &str) -> Result<Self> {
        if keyword.trim().is_empty() {
            return Err(TrendbriefError::config("keyword must not be empty"));
        }
        let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(keyword)))
            .case_insensitive(true)
            .build()
            .map_err(|e| TrendbriefError::config(format!("invalid keyword {keyword:?}: {e}")))?;

        Ok(Self {
            keyword: keyword.to_string(),
            pattern,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Whether the keyword occurs in the subject or body.
    pub fn matches(&self, email: &IncomingEmail) -> bool {
        self.pattern
            .is_match(&format!("{}\n{}", email.subject, email.body))
    }
}
