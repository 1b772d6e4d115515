//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{info, warn};

use trendbrief_core::chart::JsonChartSink;
use trendbrief_core::context::ContextAssembler;
use trendbrief_core::llm::OpenAiSynthesizer;
use trendbrief_core::mailbox::SpoolMailbox;
use trendbrief_core::monitor::{MonitorSettings, run_monitor};
use trendbrief_core::notify::{Notifier, OutboxNotifier};
use trendbrief_core::research::{GraphResearchSource, LocalResearchSource, ResearchSource};
use trendbrief_core::workflow::{BriefingWorkflow, WorkflowProgress};
use trendbrief_series::SeriesBuilder;
use trendbrief_shared::{
    AppConfig, Document, IncomingEmail, ResearchSourceKind, init_config, load_config,
    load_config_from, validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// trendbrief: keyword-triggered investment briefings with a research trend line.
#[derive(Parser)]
#[command(
    name = "trendbrief",
    version,
    about = "Watch a mailbox for a keyword and brief subscribers with research context and a score trend.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.trendbrief/trendbrief.toml).
    #[arg(long, global = true, env = "TRENDBRIEF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract the score series from a directory of research files.
    Series {
        /// Research directory.
        #[arg(long)]
        dir: PathBuf,

        /// Print the series as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the LLM context digest for a directory of research files.
    Digest {
        /// Research directory.
        #[arg(long)]
        dir: PathBuf,
    },

    /// Run the briefing workflow once for a saved trigger message.
    Brief {
        /// Research directory.
        #[arg(long)]
        dir: PathBuf,

        /// Trigger message as JSON (`uid`, `subject`, `from`, `body`).
        #[arg(long)]
        email: PathBuf,

        /// Keyword override (defaults to the configured keyword).
        #[arg(short, long)]
        keyword: Option<String>,

        /// Deliver to the configured recipients instead of printing.
        #[arg(long)]
        send: bool,
    },

    /// Poll the spool mailbox and brief on every keyword hit.
    Watch {
        /// Run a single poll and exit.
        #[arg(long)]
        once: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "trendbrief=info",
        1 => "trendbrief=debug",
        _ => "trendbrief=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Series { dir, json } => cmd_series(config_path, &dir, json).await,
        Command::Digest { dir } => cmd_digest(config_path, &dir).await,
        Command::Brief {
            dir,
            email,
            keyword,
            send,
        } => cmd_brief(config_path, &dir, &email, keyword.as_deref(), send).await,
        Command::Watch { once } => cmd_watch(config_path, once).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn local_documents(config: &AppConfig, dir: &Path) -> Result<Vec<Document>> {
    let documents = LocalResearchSource::new(dir, config.research.max_files)
        .fetch_documents()
        .await?;
    Ok(documents)
}

// ---------------------------------------------------------------------------
// series / digest
// ---------------------------------------------------------------------------

async fn cmd_series(config_path: Option<&Path>, dir: &Path, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let documents = local_documents(&config, dir).await?;

    let builder = SeriesBuilder::new(&config.extraction)?;
    let (series, report) = builder.build_with_report(&documents);

    info!(
        documents = report.documents.len(),
        candidates = report.total_candidates(),
        kept = report.total_kept(),
        "series extracted"
    );
    for doc in &report.documents {
        for diagnostic in &doc.diagnostics {
            warn!(document = %doc.name, %diagnostic, "document issue");
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    if series.is_empty() {
        println!("No scored observations found in {}", dir.display());
        return Ok(());
    }

    println!();
    println!("  {:<20} {:>10}", "Timestamp", "Score");
    for observation in &series {
        println!(
            "  {:<20} {:>10}",
            observation.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            observation.score
        );
    }
    println!();
    println!(
        "  {} observation(s) from {} document(s), {} rejected",
        series.len(),
        report.documents.len(),
        report.total_rejected()
    );
    println!();

    Ok(())
}

async fn cmd_digest(config_path: Option<&Path>, dir: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let documents = local_documents(&config, dir).await?;

    let digest = ContextAssembler::new(config.extraction.context_char_budget).build(&documents);
    println!("{digest}");
    Ok(())
}

// ---------------------------------------------------------------------------
// brief
// ---------------------------------------------------------------------------

async fn cmd_brief(
    config_path: Option<&Path>,
    dir: &Path,
    email_path: &Path,
    keyword: Option<&str>,
    send: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    validate_api_key(&config)?;

    let raw = std::fs::read_to_string(email_path)
        .wrap_err_with(|| format!("cannot read {}", email_path.display()))?;
    let email: IncomingEmail = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("invalid trigger message {}", email_path.display()))?;
    let keyword = keyword.unwrap_or(config.keyword.as_str());

    let workflow = BriefingWorkflow::new(
        LocalResearchSource::new(dir, config.research.max_files),
        OpenAiSynthesizer::from_config(&config.llm)?,
        JsonChartSink::new(&config.notify.artifacts_dir),
        &config.extraction,
    )?;

    info!(keyword, uid = %email.uid, "running briefing");

    let progress = CliProgress::new();
    let result = workflow.run_with_progress(keyword, &email, &progress).await;
    progress.finish();
    let output = result?;

    if send {
        OutboxNotifier::new(&config.notify.outbox_dir, &config.notify.subject_prefix)
            .send(
                &config.recipients,
                &output.subject,
                &output.body,
                output.chart_path.as_deref(),
            )
            .await?;
        println!("Briefing {} written to {}", output.run_id, config.notify.outbox_dir);
        return Ok(());
    }

    println!();
    println!("  Subject: {}", output.subject);
    println!("  Run:     {}", output.run_id);
    println!("  Points:  {}", output.series.len());
    if let Some(path) = &output.chart_path {
        println!("  Chart:   {}", path.display());
    }
    println!();
    println!("{}", output.body);

    Ok(())
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

async fn cmd_watch(config_path: Option<&Path>, once: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    validate_api_key(&config)?;

    match config.research.source {
        ResearchSourceKind::Local => {
            let dir = config
                .research
                .local_dir
                .as_deref()
                .ok_or_else(|| eyre!("research.local_dir is required for the local source"))?;
            let source = LocalResearchSource::new(dir, config.research.max_files);
            watch_with(&config, source, once).await
        }
        ResearchSourceKind::Graph => {
            let source = GraphResearchSource::from_config(&config.research)?;
            watch_with(&config, source, once).await
        }
    }
}

async fn watch_with<R: ResearchSource>(config: &AppConfig, source: R, once: bool) -> Result<()> {
    let workflow = BriefingWorkflow::new(
        source,
        OpenAiSynthesizer::from_config(&config.llm)?,
        JsonChartSink::new(&config.notify.artifacts_dir),
        &config.extraction,
    )?;
    let mailbox = SpoolMailbox::new(&config.mailbox.spool_dir);
    let notifier = OutboxNotifier::new(&config.notify.outbox_dir, &config.notify.subject_prefix);

    let mut settings = MonitorSettings::from_config(config);
    if once {
        settings.max_polls = Some(1);
    }
    if settings.recipients.is_empty() {
        warn!("no recipients configured, briefings will fail to send");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            let _ = shutdown_tx.send(true);
        }
    });

    let stats = run_monitor(&settings, &mailbox, &workflow, &notifier, shutdown_rx).await?;

    println!();
    println!("  Polls:     {}", stats.polls);
    println!("  Processed: {}", stats.processed);
    println!("  Briefings: {}", stats.briefings);
    println!("  Failures:  {}", stats.failures);
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl WorkflowProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
