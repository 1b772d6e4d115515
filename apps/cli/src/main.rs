//! trendbrief CLI: keyword-triggered investment briefings.
//!
//! Extracts a dated score series from research notes, assembles an LLM
//! context digest, and turns keyword-matching mail into briefings.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
