//! Trend chart output.
//!
//! Rendering pixels is left to an external tool: [`JsonChartSink`] writes the
//! plot data (title, axis labels, points) next to the other run artifacts.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument};

use trendbrief_series::Series;
use trendbrief_shared::{Result, TrendbriefError};

/// Turns a series into a chart artifact.
pub trait ChartSink: Send + Sync {
    /// Write the chart for `series`; `Ok(None)` when there is nothing to plot.
    fn render(&self, keyword: &str, series: &Series) -> Result<Option<PathBuf>>;
}

/// Serialized chart description.
#[derive(Debug, Serialize)]
struct ChartData<'a> {
    keyword: &'a str,
    title: String,
    x_label: &'static str,
    y_label: &'static str,
    points: Vec<ChartPoint>,
}

#[derive(Debug, Serialize)]
struct ChartPoint {
    date: String,
    score: f64,
}

/// Writes `<dir>/<keyword>_trend.json`.
#[derive(Debug, Clone)]
pub struct JsonChartSink {
    dir: PathBuf,
}

impl JsonChartSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ChartSink for JsonChartSink {
    #[instrument(skip_all, fields(keyword = %keyword, points = series.len()))]
    fn render(&self, keyword: &str, series: &Series) -> Result<Option<PathBuf>> {
        if series.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| TrendbriefError::io(&self.dir, e))?;

        let data = ChartData {
            keyword,
            title: format!("{keyword} historical opinion trend"),
            x_label: "Date",
            y_label: "Score",
            points: series
                .iter()
                .map(|o| ChartPoint {
                    date: o.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    score: o.score,
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&data).map_err(|e| {
            TrendbriefError::validation(format!("chart serialization failed: {e}"))
        })?;

        let filename = format!("{}_trend.json", file_stem_for(keyword));
        let target = self.dir.join(&filename);
        let temp = self.dir.join(format!(".{filename}.tmp"));

        std::fs::write(&temp, json).map_err(|e| TrendbriefError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| TrendbriefError::io(&target, e))?;

        debug!(path = %target.display(), "wrote chart data");
        Ok(Some(target))
    }
}

/// Keyword made safe for use as a file name.
fn file_stem_for(keyword: &str) -> String {
    let stem: String = keyword
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "keyword".into() } else { stem }
}
