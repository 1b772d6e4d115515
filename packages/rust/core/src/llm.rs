//! LLM synthesis of a briefing from the trigger mail and research digest.
//!
//! The model is asked for a JSON object with `summary`, `key_points` and
//! `formatted_email`. [`OpenAiSynthesizer`] talks to the OpenAI Responses
//! API; anything else implementing [`Synthesizer`] can stand in for it.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use trendbrief_shared::{LlmConfig, Result, TrendbriefError};

/// Structured briefing returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    pub summary: String,
    pub key_points: Vec<String>,
    /// Business-style mail body (Overview, Context, Action Items).
    pub formatted_email: String,
}

/// Produces a [`Synthesis`] for one trigger.
pub trait Synthesizer: Send + Sync {
    fn synthesize(
        &self,
        keyword: &str,
        trigger: &str,
        context: &str,
    ) -> impl Future<Output = Result<Synthesis>> + Send;
}

/// The briefing prompt sent to the model.
pub fn build_prompt(keyword: &str, trigger: &str, context: &str) -> String {
    format!(
        "You are an investment intelligence assistant.\n\
         \n\
         Task:\n\
         1) Read NEW UPDATE and CONTEXT.\n\
         2) Produce a concise synthesis for investment {keyword}.\n\
         3) Return JSON with keys:\n   \
            - summary (string)\n   \
            - key_points (array of strings)\n   \
            - formatted_email (string, business style; sections: Overview, Context, Action Items)\n\
         \n\
         NEW UPDATE:\n\
         {trigger}\n\
         \n\
         CONTEXT:\n\
         {context}\n"
    )
}

/// Parse the model's text output into a [`Synthesis`].
///
/// Accepts the JSON object bare or wrapped in a Markdown code fence.
pub fn parse_synthesis(text: &str) -> Result<Synthesis> {
    let body = strip_code_fence(text);
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        TrendbriefError::Llm(format!("unusable model output: {e} (got: {preview})"))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

// ---------------------------------------------------------------------------
// OpenAI Responses API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    /// Convenience field some deployments return directly.
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesReply {
    fn text(self) -> Option<String> {
        if let Some(text) = self.output_text.filter(|t| !t.is_empty()) {
            return Some(text);
        }
        let joined: String = self
            .output
            .into_iter()
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect();
        (!joined.is_empty()).then_some(joined)
    }
}

/// [`Synthesizer`] backed by `POST {base_url}/responses`.
#[derive(Debug, Clone)]
pub struct OpenAiSynthesizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiSynthesizer {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrendbriefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/responses", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from config, reading the key from the configured env var.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let var_name = &config.api_key_env;
        let api_key = match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => val,
            _ => {
                return Err(TrendbriefError::config(format!(
                    "LLM API key not found. Set the {var_name} environment variable."
                )));
            }
        };
        Self::new(
            &config.base_url,
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Synthesizer for OpenAiSynthesizer {
    #[instrument(skip_all, fields(model = %self.model, keyword = %keyword))]
    async fn synthesize(&self, keyword: &str, trigger: &str, context: &str) -> Result<Synthesis> {
        let prompt = build_prompt(keyword, trigger, context);
        debug!(prompt_chars = prompt.chars().count(), "sending synthesis request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ResponsesRequest {
                model: &self.model,
                input: &prompt,
            })
            .send()
            .await
            .map_err(|e| TrendbriefError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(TrendbriefError::Llm(format!("HTTP {status}: {preview}")));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .map_err(|e| TrendbriefError::Llm(format!("invalid response body: {e}")))?;
        let text = reply
            .text()
            .ok_or_else(|| TrendbriefError::Llm("response carried no output text".into()))?;

        let synthesis = parse_synthesis(&text)?;
        info!(key_points = synthesis.key_points.len(), "synthesis received");
        Ok(synthesis)
    }
}
