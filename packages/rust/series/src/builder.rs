//! Series builder: documents in, one time-ordered series out.

use tracing::{debug, instrument};

use trendbrief_shared::{Document, Encoding, ExtractionConfig, Result};

use crate::extract::{
    Diagnostic, PointExtractor, StructuredExtractor, TabularExtractor, TextExtractor,
};
use crate::normalize::Rejection;
use crate::observation::{Observation, Series};

/// What happened to one document during a build.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub name: String,
    pub encoding: Encoding,
    /// Candidate pairs the extractor found.
    pub candidates: usize,
    /// Candidates that became observations.
    pub kept: usize,
    /// Why the remaining candidates were dropped.
    pub rejections: Vec<Rejection>,
    /// Extractor notes about the document itself.
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-document outcome of [`SeriesBuilder::build_with_report`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub documents: Vec<DocumentReport>,
}

impl BuildReport {
    pub fn total_candidates(&self) -> usize {
        self.documents.iter().map(|d| d.candidates).sum()
    }

    pub fn total_kept(&self) -> usize {
        self.documents.iter().map(|d| d.kept).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.documents.iter().map(|d| d.rejections.len()).sum()
    }
}

/// Dispatches documents to extractors and merges the results.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuilder {
    text: TextExtractor,
    tabular: TabularExtractor,
    structured: StructuredExtractor,
}

impl SeriesBuilder {
    /// Builder using the configured free-text window.
    ///
    /// Fails only when the configuration itself is invalid.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            text: TextExtractor::from_config(config)?,
            tabular: TabularExtractor,
            structured: StructuredExtractor,
        })
    }

    /// Build the series for `documents`. Never fails; an empty series is a
    /// normal outcome.
    pub fn build(&self, documents: &[Document]) -> Series {
        self.build_with_report(documents).0
    }

    /// Build the series and report what each document contributed.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn build_with_report(&self, documents: &[Document]) -> (Series, BuildReport) {
        let mut accumulated: Vec<Observation> = Vec::new();
        let mut report = BuildReport::default();

        for document in documents {
            let encoding = document.encoding();
            let extractor = self.extractor_for(encoding);
            let extraction = extractor.extract(&document.content);

            let mut doc_report = DocumentReport {
                name: document.name.clone(),
                encoding,
                candidates: extraction.pairs.len(),
                kept: 0,
                rejections: Vec::new(),
                diagnostics: extraction.diagnostics,
            };

            for pair in &extraction.pairs {
                match pair.normalize() {
                    Ok(observation) => {
                        accumulated.push(observation);
                        doc_report.kept += 1;
                    }
                    Err(reason) => {
                        debug!(document = %document.name, %reason, "dropped candidate");
                        doc_report.rejections.push(reason);
                    }
                }
            }

            debug!(
                document = %document.name,
                extractor = extractor.name(),
                candidates = doc_report.candidates,
                kept = doc_report.kept,
                "document scanned"
            );
            report.documents.push(doc_report);
        }

        let series = Series::from_unsorted(accumulated);
        debug!(
            observations = series.len(),
            rejected = report.total_rejected(),
            "series built"
        );
        (series, report)
    }

    fn extractor_for(&self, encoding: Encoding) -> &dyn PointExtractor {
        match encoding {
            Encoding::Text => &self.text,
            Encoding::Tabular => &self.tabular,
            Encoding::Structured => &self.structured,
        }
    }
}

/// Build a series with the default extraction settings.
pub fn build_series(documents: &[Document]) -> Series {
    SeriesBuilder::default().build(documents)
}
