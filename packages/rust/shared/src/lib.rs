//! Shared types, error model, and configuration for trendbrief.
//!
//! This crate is the foundation depended on by all other trendbrief crates.
//! It provides:
//! - [`TrendbriefError`], the unified error type
//! - Domain types ([`Document`], [`Encoding`], [`IncomingEmail`], [`Recipient`], [`RunId`])
//! - Configuration ([`AppConfig`], [`ExtractionConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractionConfig, LlmConfig, MailboxConfig, NotifyConfig, ResearchConfig,
    ResearchSourceKind, WindowMode, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_api_key,
};
pub use error::{Result, TrendbriefError};
pub use types::{
    ALLOWED_EXTENSIONS, Document, Encoding, IncomingEmail, Recipient, RunId, is_allowed_name,
};
