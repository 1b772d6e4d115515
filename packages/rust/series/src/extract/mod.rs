//! Per-encoding extractors that pull raw date/score pairs out of documents.
//!
//! Extractors never fail. A document they cannot read yields no pairs and
//! a [`Diagnostic`] explaining why.

mod structured;
mod tabular;
mod text;

pub use structured::StructuredExtractor;
pub use tabular::TabularExtractor;
pub use text::TextExtractor;

use crate::normalize::RawPair;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Something worth reporting about a document that produced fewer pairs
/// than its size suggests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    /// Structured content did not parse.
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Structured content parsed to something other than an object or array.
    #[error("top-level {0} is not an object or array")]
    UnsupportedTopLevel(&'static str),

    /// An array element was not an object.
    #[error("element {index} is not an object")]
    NonObjectElement { index: usize },

    /// Tabular content had no header row.
    #[error("missing header row")]
    MissingHeader,

    /// Tabular header lacked a required column.
    #[error("missing column {0:?}")]
    MissingColumn(&'static str),

    /// A data row had a different number of fields than the header.
    #[error("line {line}: expected {expected} fields, found {found}")]
    RowLength {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A data row could not be read at all.
    #[error("line {line}: {message}")]
    MalformedRow { line: u64, message: String },
}

/// Output of a single extractor run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Candidate pairs in document order.
    pub pairs: Vec<RawPair>,
    /// Document-level and row-level notes.
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    fn note(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "extraction diagnostic");
        self.diagnostics.push(diagnostic);
    }
}

/// Pulls raw date/score pairs out of document content in one encoding.
pub trait PointExtractor: Send + Sync {
    /// Scan `content` and return every candidate pair in document order.
    fn extract(&self, content: &str) -> Extraction;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}
