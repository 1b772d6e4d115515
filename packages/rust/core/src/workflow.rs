//! Briefing workflow: one trigger mail in, one briefing out.
//!
//! 1. Fetch research documents
//! 2. Assemble the context digest
//! 3. Synthesize the briefing with the LLM
//! 4. Build the trend series
//! 5. Render the chart (only for a non-empty series)

use std::path::PathBuf;

use tracing::{info, instrument};

use trendbrief_series::{Series, SeriesBuilder};
use trendbrief_shared::{ExtractionConfig, IncomingEmail, Result, RunId};

use crate::chart::ChartSink;
use crate::context::ContextAssembler;
use crate::llm::Synthesizer;
use crate::research::ResearchSource;

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    pub run_id: RunId,
    /// `"{keyword} update detected: {trigger subject}"`.
    pub subject: String,
    /// The model's formatted email.
    pub body: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub series: Series,
    /// Chart artifact, absent when the series was empty.
    pub chart_path: Option<PathBuf>,
}

/// Progress callback for workflow runs.
pub trait WorkflowProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl WorkflowProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
}

/// Wires a research source, a synthesizer and a chart sink together.
pub struct BriefingWorkflow<R, S, C> {
    source: R,
    synthesizer: S,
    chart: C,
    assembler: ContextAssembler,
    builder: SeriesBuilder,
}

impl<R, S, C> BriefingWorkflow<R, S, C>
where
    R: ResearchSource,
    S: Synthesizer,
    C: ChartSink,
{
    /// Fails only when the extraction settings are invalid.
    pub fn new(source: R, synthesizer: S, chart: C, extraction: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            source,
            synthesizer,
            chart,
            assembler: ContextAssembler::new(extraction.context_char_budget),
            builder: SeriesBuilder::new(extraction)?,
        })
    }

    pub async fn run(&self, keyword: &str, email: &IncomingEmail) -> Result<WorkflowOutput> {
        self.run_with_progress(keyword, email, &SilentProgress).await
    }

    #[instrument(skip_all, fields(keyword = %keyword, uid = %email.uid))]
    pub async fn run_with_progress(
        &self,
        keyword: &str,
        email: &IncomingEmail,
        progress: &dyn WorkflowProgress,
    ) -> Result<WorkflowOutput> {
        let run_id = RunId::new();
        info!(%run_id, "starting briefing run");

        progress.phase("Fetching research documents");
        let documents = self.source.fetch_documents().await?;

        progress.phase("Assembling context");
        let digest = self.assembler.build(&documents);

        progress.phase("Synthesizing briefing");
        let synthesis = self
            .synthesizer
            .synthesize(keyword, &email.as_trigger_text(), &digest.render())
            .await?;

        progress.phase("Building trend series");
        let (series, report) = self.builder.build_with_report(&documents);

        let chart_path = match series.non_empty() {
            Some(series) => {
                progress.phase("Rendering chart");
                self.chart.render(keyword, series)?
            }
            None => None,
        };

        info!(
            %run_id,
            documents = documents.len(),
            observations = series.len(),
            rejected = report.total_rejected(),
            chart = chart_path.is_some(),
            "briefing run complete"
        );

        Ok(WorkflowOutput {
            run_id,
            subject: format!("{keyword} update detected: {}", email.subject),
            body: synthesis.formatted_email,
            summary: synthesis.summary,
            key_points: synthesis.key_points,
            series,
            chart_path,
        })
    }
}
