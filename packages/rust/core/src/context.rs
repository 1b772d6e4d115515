//! Context digest: a bounded textual view of the research documents for the LLM.

use tracing::debug;

use trendbrief_shared::Document;

/// Per-document character budget used when none is configured.
pub const DEFAULT_CHAR_BUDGET: usize = 2500;

/// One document's contribution to the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub name: String,
    /// The first `char_budget` characters of the document.
    pub snippet: String,
}

/// Truncated, labelled document snippets in the order they were received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextDigest {
    pub entries: Vec<DigestEntry>,
}

impl ContextDigest {
    /// Render as `### File: <name>` blocks separated by a blank line.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("### File: {}\n{}", e.name, e.snippet))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for ContextDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Builds a [`ContextDigest`]. Independent of the series pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    char_budget: usize,
}

impl ContextAssembler {
    pub fn new(char_budget: usize) -> Self {
        Self { char_budget }
    }

    pub fn build(&self, documents: &[Document]) -> ContextDigest {
        let entries: Vec<DigestEntry> = documents
            .iter()
            .map(|doc| DigestEntry {
                name: doc.name.clone(),
                snippet: truncate_chars(&doc.content, self.char_budget).to_string(),
            })
            .collect();

        debug!(
            documents = entries.len(),
            budget = self.char_budget,
            "context digest assembled"
        );
        ContextDigest { entries }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_CHAR_BUDGET)
    }
}

/// The first `max_chars` Unicode scalar values of `s`, with no word-boundary awareness.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    let byte_end = s
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..byte_end]
}
