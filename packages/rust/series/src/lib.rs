//! Scored-data-point extraction for trendbrief.
//!
//! Research documents arrive in three encodings (free text, CSV, JSON).
//! Each is scanned by the matching [`extract`] implementation for raw
//! date/score pairs, every pair goes through [`normalize`], and the
//! [`SeriesBuilder`] merges the survivors into one time-ordered [`Series`].
//!
//! Nothing in this crate performs I/O, and no input can make
//! [`SeriesBuilder::build`] fail: bad documents and bad pairs only reduce
//! the number of observations.

pub mod builder;
pub mod extract;
pub mod normalize;
pub mod observation;

pub use builder::{BuildReport, DocumentReport, SeriesBuilder, build_series};
pub use extract::{
    Diagnostic, Extraction, PointExtractor, StructuredExtractor, TabularExtractor, TextExtractor,
};
pub use normalize::{RawPair, Rejection, ScoreCandidate, normalize, parse_timestamp};
pub use observation::{Observation, Series};
