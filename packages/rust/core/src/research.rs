//! Research document retrieval.
//!
//! A [`ResearchSource`] hands the workflow a fully materialized document
//! set. Two sources ship: a local directory and a OneDrive folder read
//! through Microsoft Graph.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use trendbrief_shared::{Document, ResearchConfig, Result, TrendbriefError, is_allowed_name};

/// User-Agent string for research requests.
const USER_AGENT: &str = concat!("trendbrief/", env!("CARGO_PKG_VERSION"));

/// Supplies the documents for one workflow run.
pub trait ResearchSource: Send + Sync {
    fn fetch_documents(&self) -> impl Future<Output = Result<Vec<Document>>> + Send;
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

/// Reads research files from a directory.
///
/// Entries are examined in name order, at most `max_files` of them; only
/// regular files with an allowed extension are read.
#[derive(Debug, Clone)]
pub struct LocalResearchSource {
    dir: PathBuf,
    max_files: usize,
}

impl LocalResearchSource {
    pub fn new(dir: impl Into<PathBuf>, max_files: usize) -> Self {
        Self {
            dir: dir.into(),
            max_files,
        }
    }
}

impl ResearchSource for LocalResearchSource {
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    async fn fetch_documents(&self) -> Result<Vec<Document>> {
        let mut reader = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| TrendbriefError::io(&self.dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| TrendbriefError::io(&self.dir, e))?
        {
            entries.push(entry);
        }
        entries.sort_by_key(|e| e.file_name());

        let mut documents = Vec::new();
        for entry in entries.into_iter().take(self.max_files) {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file || !is_allowed_name(&name) {
                debug!(%name, "skipping entry");
                continue;
            }

            let path = entry.path();
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| TrendbriefError::io(&path, e))?;
            documents.push(Document::new(name, String::from_utf8_lossy(&bytes)));
        }

        info!(documents = documents.len(), "research documents loaded");
        Ok(documents)
    }
}

// ---------------------------------------------------------------------------
// Microsoft Graph (OneDrive)
// ---------------------------------------------------------------------------

/// Folder listing returned by Graph.
#[derive(Debug, Deserialize)]
struct DriveListing {
    #[serde(default)]
    value: Vec<DriveItem>,
}

#[derive(Debug, Deserialize)]
struct DriveItem {
    #[serde(default)]
    name: Option<String>,
    /// Present only for files; folders carry a `folder` facet instead.
    #[serde(default)]
    file: Option<serde_json::Value>,
    #[serde(default, rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

/// Reads research files from a OneDrive folder.
#[derive(Debug, Clone)]
pub struct GraphResearchSource {
    client: Client,
    listing_url: Url,
    access_token: String,
    max_files: usize,
}

impl GraphResearchSource {
    pub fn new(
        base_url: &str,
        drive_id: &str,
        folder_path: &str,
        access_token: impl Into<String>,
        max_files: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let listing = format!(
            "{}/drives/{drive_id}/root:/{}:/children",
            base_url.trim_end_matches('/'),
            folder_path.trim_matches('/')
        );
        let listing_url = Url::parse(&listing).map_err(|e| {
            TrendbriefError::config(format!("invalid Graph listing URL '{listing}': {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TrendbriefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            listing_url,
            access_token: access_token.into(),
            max_files,
        })
    }

    /// Build from config, reading the bearer token from the configured env var.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let var_name = &config.access_token_env;
        let token = match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => val,
            _ => {
                return Err(TrendbriefError::config(format!(
                    "Graph access token not found. Set the {var_name} environment variable."
                )));
            }
        };
        if config.drive_id.is_empty() {
            return Err(TrendbriefError::config("research.drive_id is required for the graph source"));
        }

        Self::new(
            &config.graph_base_url,
            &config.drive_id,
            &config.folder_path,
            token,
            config.max_files,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn list_folder(&self) -> Result<Vec<DriveItem>> {
        let response = self
            .client
            .get(self.listing_url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| TrendbriefError::Network(format!("{}: {e}", self.listing_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendbriefError::Network(format!(
                "{}: HTTP {status}",
                self.listing_url
            )));
        }

        let listing: DriveListing = response.json().await.map_err(|e| {
            TrendbriefError::parse(format!("invalid folder listing from Graph: {e}"))
        })?;
        Ok(listing.value)
    }

    async fn download(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TrendbriefError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendbriefError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| TrendbriefError::Network(format!("{url}: failed to read body: {e}")))
    }
}

impl ResearchSource for GraphResearchSource {
    #[instrument(skip_all, fields(url = %self.listing_url))]
    async fn fetch_documents(&self) -> Result<Vec<Document>> {
        let items = self.list_folder().await?;
        debug!(items = items.len(), "folder listed");

        let mut documents = Vec::new();
        for item in items.into_iter().take(self.max_files) {
            if item.file.is_none() {
                continue;
            }
            let name = item.name.unwrap_or_else(|| "unknown".to_string());
            if !is_allowed_name(&name) {
                continue;
            }
            let Some(download_url) = item.download_url else {
                debug!(%name, "no download URL, skipping");
                continue;
            };

            match self.download(&download_url).await {
                Ok(content) => documents.push(Document::new(name, content)),
                Err(e) => warn!(%name, error = %e, "download failed, skipping file"),
            }
        }

        info!(documents = documents.len(), "research documents fetched");
        Ok(documents)
    }
}
