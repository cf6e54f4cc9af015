//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aiinsight_core::{LAST_COLLECTION_KEY, PipelineCoordinator, PipelineRunReport, ProgressReporter};
use aiinsight_shared::{AppConfig, init_config, load_config, load_config_at};
use aiinsight_storage::Storage;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// AI Insight: track AI models, repositories and papers.
#[derive(Parser)]
#[command(
    name = "aiinsight",
    version,
    about = "Collect AI ecosystem feeds, analyze trends, and write reports.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.aiinsight/aiinsight.toml.
    #[arg(long, global = true, env = "AI_INSIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Run collect, analyze and report, then print a JSON summary.
    Run,

    /// Run the collect stage only.
    Collect,

    /// Show stored run history.
    History {
        /// Memory key to read.
        #[arg(long, default_value = LAST_COLLECTION_KEY)]
        key: String,

        /// Maximum number of entries, newest first.
        #[arg(long, default_value = "10")]
        limit: usize,
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
        0 => "aiinsight=info",
        1 => "aiinsight=debug",
        _ => "aiinsight=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    match cli.command {
        Command::Run => cmd_run(&resolve_config(cli.config.as_deref())?).await,
        Command::Collect => cmd_collect(&resolve_config(cli.config.as_deref())?).await,
        Command::History { key, limit } => {
            cmd_history(&resolve_config(cli.config.as_deref())?, &key, limit).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_at(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    config.ensure_directories()?;
    let memory = open_memory(config).await?;
    let progress = Arc::new(CliProgress::new()?);

    let mut coordinator = build_coordinator(config, memory.as_ref(), progress.clone())?;
    info!(
        environment = %config.general.environment,
        collectors = coordinator.collector_statuses().len(),
        "running full pipeline"
    );

    let report = coordinator.run_full_pipeline_and_cleanup().await;
    prune_memory(config, memory.as_deref()).await;

    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}

async fn cmd_collect(config: &AppConfig) -> Result<()> {
    config.ensure_directories()?;
    let memory = open_memory(config).await?;
    let progress = Arc::new(CliProgress::new()?);

    let mut coordinator = build_coordinator(config, memory.as_ref(), progress.clone())?;
    let output = coordinator.run_collection_job_and_cleanup().await;
    progress.finish();
    prune_memory(config, memory.as_deref()).await;

    println!();
    println!("  Collection finished");
    for (slot, count) in output.data.counts() {
        println!("  {slot:<10} {count}");
    }
    for (name, status) in coordinator.collector_statuses() {
        println!("  Status:    {name} {status}");
    }
    for error in &output.errors {
        println!("  Error:     {error}");
    }
    println!("  Time:      {:.1}s", output.duration_ms as f64 / 1000.0);
    println!();

    Ok(())
}

fn build_coordinator(
    config: &AppConfig,
    memory: Option<&Arc<Storage>>,
    progress: Arc<CliProgress>,
) -> Result<PipelineCoordinator> {
    let mut builder = aiinsight_adapters::default_builder(config).progress(progress);
    if let Some(storage) = memory {
        builder = builder.memory(storage.clone());
    }
    Ok(builder.build()?)
}

/// Open the memory database when `[memory]` is enabled.
async fn open_memory(config: &AppConfig) -> Result<Option<Arc<Storage>>> {
    if !config.memory.enabled {
        return Ok(None);
    }
    let storage = Storage::open(&config.memory.db_path).await?;
    Ok(Some(Arc::new(storage)))
}

async fn prune_memory(config: &AppConfig, memory: Option<&Storage>) {
    let Some(storage) = memory else {
        return;
    };
    if let Err(e) = storage
        .prune(config.memory.retention_days, config.memory.max_memory_items)
        .await
    {
        warn!(error = %e, "memory pruning failed");
    }
}

async fn cmd_history(config: &AppConfig, key: &str, limit: usize) -> Result<()> {
    let db_path = &config.memory.db_path;
    if !db_path.exists() {
        return Err(eyre!(
            "no memory database at '{}'; run `aiinsight run` first",
            db_path.display()
        ));
    }

    let storage = Storage::open_readonly(db_path).await?;
    let entries = storage.history(key, limit).await?;
    if entries.is_empty() {
        println!("No entries for '{key}'.");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&entries)?);
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
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .map_err(|e| eyre!("invalid spinner template: {e}"))?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _report: &PipelineRunReport) {
        self.finish();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
