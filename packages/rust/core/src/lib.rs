//! Workflow orchestration for trendbrief.
//!
//! This crate wires the extraction engine to its collaborators: research
//! sources, the language model, the chart sink, the notifier, and the
//! mailbox, and runs the polling loop that ties them together.

pub mod chart;
pub mod context;
pub mod keyword;
pub mod llm;
pub mod mailbox;
pub mod monitor;
pub mod notify;
pub mod research;
pub mod workflow;
