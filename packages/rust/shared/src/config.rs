//! Application configuration for trendbrief.
//!
//! User config lives at `~/.trendbrief/trendbrief.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendbriefError};
use crate::types::Recipient;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "trendbrief.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".trendbrief";

/// Width of an ISO `YYYY-MM-DD` date token.
const DATE_TOKEN_CHARS: usize = 10;

/// Upper bound for the free-text window; larger values are a config error.
pub const MAX_TEXT_WINDOW_CHARS: usize = 1000;

// ---------------------------------------------------------------------------
// Config structs (matching trendbrief.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Keyword that triggers a briefing when found in an incoming message.
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// Seconds to wait between mailbox polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Score extraction and context digest settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Where research documents come from.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Language model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Outgoing notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Incoming mailbox settings.
    #[serde(default)]
    pub mailbox: MailboxConfig,

    /// Briefing subscribers.
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            poll_interval_seconds: default_poll_interval(),
            extraction: ExtractionConfig::default(),
            research: ResearchConfig::default(),
            llm: LlmConfig::default(),
            notify: NotifyConfig::default(),
            mailbox: MailboxConfig::default(),
            recipients: Vec::new(),
        }
    }
}

fn default_keyword() -> String {
    "investment".into()
}
fn default_poll_interval() -> u64 {
    30
}

/// How the free-text window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Count only the characters strictly between the date and `score`.
    #[default]
    Gap,
    /// Count the date token itself against the window.
    IncludingDate,
}

/// `[extraction]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum distance between a date and the `score` keyword in prose.
    #[serde(default = "default_text_window")]
    pub text_window_chars: usize,

    /// How `text_window_chars` is measured.
    #[serde(default)]
    pub window_mode: WindowMode,

    /// Per-document character budget for the LLM context digest.
    #[serde(default = "default_context_budget")]
    pub context_char_budget: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            text_window_chars: default_text_window(),
            window_mode: WindowMode::default(),
            context_char_budget: default_context_budget(),
        }
    }
}

impl ExtractionConfig {
    /// Number of characters allowed between the end of the date token and `score`.
    pub fn gap_chars(&self) -> usize {
        match self.window_mode {
            WindowMode::Gap => self.text_window_chars,
            WindowMode::IncludingDate => self.text_window_chars.saturating_sub(DATE_TOKEN_CHARS),
        }
    }

    /// Reject settings the extractors cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.text_window_chars > MAX_TEXT_WINDOW_CHARS {
            return Err(TrendbriefError::config(format!(
                "extraction.text_window_chars = {} exceeds the maximum of {MAX_TEXT_WINDOW_CHARS}",
                self.text_window_chars
            )));
        }
        Ok(())
    }
}

fn default_text_window() -> usize {
    20
}
fn default_context_budget() -> usize {
    2500
}

/// Which research source implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchSourceKind {
    /// Files in a local directory.
    #[default]
    Local,
    /// A OneDrive folder via Microsoft Graph.
    Graph,
}

/// `[research]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub source: ResearchSourceKind,

    /// Directory scanned by the local source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<String>,

    /// Graph API root.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// OneDrive drive identifier.
    #[serde(default)]
    pub drive_id: String,

    /// Folder path inside the drive.
    #[serde(default)]
    pub folder_path: String,

    /// Name of the env var holding the Graph bearer token (never store the token itself).
    #[serde(default = "default_graph_token_env")]
    pub access_token_env: String,

    /// Maximum number of folder entries examined per run.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// HTTP timeout in seconds.
    #[serde(default = "default_research_timeout")]
    pub timeout_secs: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            source: ResearchSourceKind::default(),
            local_dir: None,
            graph_base_url: default_graph_base_url(),
            drive_id: String::new(),
            folder_path: String::new(),
            access_token_env: default_graph_token_env(),
            max_files: default_max_files(),
            timeout_secs: default_research_timeout(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".into()
}
fn default_graph_token_env() -> String {
    "TRENDBRIEF_GRAPH_TOKEN".into()
}
fn default_max_files() -> usize {
    25
}
fn default_research_timeout() -> u64 {
    30
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API root (the `/responses` endpoint is appended).
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_llm_timeout() -> u64 {
    120
}

/// `[notify]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Prefix prepended to every outgoing subject.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Directory where outgoing messages are written.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: String,

    /// Directory where chart data is written.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            subject_prefix: default_subject_prefix(),
            outbox_dir: default_outbox_dir(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

fn default_subject_prefix() -> String {
    "[Investment Alert]".into()
}
fn default_outbox_dir() -> String {
    "outbox".into()
}
fn default_artifacts_dir() -> String {
    "artifacts".into()
}

/// `[mailbox]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Directory of spooled `*.json` messages.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: String,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            spool_dir: default_spool_dir(),
        }
    }
}

fn default_spool_dir() -> String {
    "spool".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.trendbrief/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TrendbriefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.trendbrief/trendbrief.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TrendbriefError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TrendbriefError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.extraction.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TrendbriefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TrendbriefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TrendbriefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the LLM API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(TrendbriefError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("poll_interval_seconds"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.poll_interval_seconds, 30);
        assert_eq!(parsed.extraction.text_window_chars, 20);
        assert_eq!(parsed.extraction.context_char_budget, 2500);
        assert_eq!(parsed.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn config_with_recipients_and_graph() {
        let toml_str = r#"
keyword = "BERT"

[research]
source = "graph"
drive_id = "drive-1"
folder_path = "Research/BERT"

[extraction]
window_mode = "including_date"

[[recipients]]
name = "Ops"
email = "ops@example.com"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.keyword, "BERT");
        assert_eq!(config.research.source, ResearchSourceKind::Graph);
        assert_eq!(config.research.max_files, 25);
        assert_eq!(config.extraction.window_mode, WindowMode::IncludingDate);
        assert_eq!(config.recipients.len(), 1);
        assert_eq!(config.recipients[0].email, "ops@example.com");
    }

    #[test]
    fn gap_chars_by_mode() {
        let mut extraction = ExtractionConfig::default();
        assert_eq!(extraction.gap_chars(), 20);

        extraction.window_mode = WindowMode::IncludingDate;
        assert_eq!(extraction.gap_chars(), 10);

        extraction.text_window_chars = 4;
        assert_eq!(extraction.gap_chars(), 0);
    }

    #[test]
    fn oversized_window_rejected() {
        let extraction = ExtractionConfig {
            text_window_chars: MAX_TEXT_WINDOW_CHARS + 1,
            ..ExtractionConfig::default()
        };
        let err = extraction.validate().unwrap_err();
        assert!(err.to_string().contains("text_window_chars"));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "TB_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
