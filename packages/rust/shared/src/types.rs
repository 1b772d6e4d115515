//! Core domain types shared across trendbrief crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File extensions a research source is allowed to hand to the pipeline.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".txt", ".md", ".json", ".csv"];

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one workflow execution (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Content format of a document, inferred once from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Free prose (`.txt`, `.md`, and anything unrecognized).
    Text,
    /// Delimited rows with a header (`.csv`).
    Tabular,
    /// JSON object or array (`.json`).
    Structured,
}

impl Encoding {
    /// Resolve the encoding from a file name's suffix, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Self::Structured
        } else if lower.ends_with(".csv") {
            Self::Tabular
        } else {
            Self::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Tabular => "tabular",
            Self::Structured => "structured",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrieved research document. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name, used for encoding dispatch and as a display label.
    pub name: String,
    /// Full text content.
    pub content: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Encoding inferred from the document name.
    pub fn encoding(&self) -> Encoding {
        Encoding::from_name(&self.name)
    }
}

/// Whether a file name carries one of the [`ALLOWED_EXTENSIONS`].
pub fn is_allowed_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// ---------------------------------------------------------------------------
// Mail
// ---------------------------------------------------------------------------

/// A message pulled from the monitored mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingEmail {
    /// Mailbox-specific unique identifier.
    pub uid: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, rename = "from")]
    pub from_email: String,
    #[serde(default)]
    pub body: String,
}

impl IncomingEmail {
    /// Render the message the way it is quoted to the language model.
    pub fn as_trigger_text(&self) -> String {
        format!(
            "Subject: {}\nFrom: {}\n\n{}",
            self.subject, self.from_email, self.body
        )
    }
}

/// A briefing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}
