//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use enricher_client::ProfileClient;
use enricher_core::pipeline::{EnrichRunConfig, ProgressReporter, RowOutcome};
use enricher_shared::{
    AppConfig, RunSummary, SourceRecord, WriteFailurePolicy, init_config, load_config,
    load_config_from, resolve_api_key,
};
use enricher_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// company-enricher: enrich company rows from a profile lookup API.
#[derive(Parser)]
#[command(
    name = "company-enricher",
    version,
    about = "Enrich company records with profile data and store them in a sink table.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.company-enricher/enricher.toml).
    #[arg(long, global = true, env = "ENRICHER_CONFIG")]
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
    /// Enrich every company in the source table in one transaction.
    Run {
        /// Database file (overrides `database.path`).
        #[arg(long)]
        db: Option<PathBuf>,

        /// What to do when an insert fails: abort (roll back) or skip.
        #[arg(long)]
        on_write_error: Option<WriteFailurePolicy>,
    },

    /// Print the stored enrichment for one company as JSON.
    Show {
        /// Company identifier.
        company_id: i64,

        /// Database file (overrides `database.path`).
        #[arg(long)]
        db: Option<PathBuf>,
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
        0 => "enricher=info,company_enricher=info",
        1 => "enricher=debug,company_enricher=debug",
        _ => "enricher=trace,company_enricher=trace",
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
    match cli.command {
        Command::Run { db, on_write_error } => {
            cmd_run(resolve_config(&cli.config)?, db, on_write_error).await
        }
        Command::Show { company_id, db } => {
            cmd_show(resolve_config(&cli.config)?, company_id, db).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&resolve_config(&cli.config)?).await,
        },
    }
}

/// Load `--config` if given, else the default config file (or defaults).
fn resolve_config(path: &Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    mut config: AppConfig,
    db: Option<PathBuf>,
    on_write_error: Option<WriteFailurePolicy>,
) -> Result<()> {
    if let Some(path) = db {
        config.database.path = path;
    }
    if let Some(policy) = on_write_error {
        config.run.on_write_error = policy;
    }
    config.database.validate()?;

    // Fail on a missing key before touching the database
    let api_key = resolve_api_key(&config.api)?;
    let client = ProfileClient::new(&config.api, &api_key)?;

    let run_config = EnrichRunConfig {
        database: config.database.clone(),
        on_write_error: config.run.on_write_error,
    };

    info!(
        db = %run_config.database.path.display(),
        source = %run_config.database.source_table,
        sink = %run_config.database.sink_table,
        on_write_error = %run_config.on_write_error,
        "enriching companies"
    );

    let reporter = CliProgress::new();
    let result = enricher_core::pipeline::run_enrichment(&run_config, &client, &reporter).await;
    reporter.spinner.finish_and_clear();
    let summary = result.map_err(|e| eyre!("enrichment run failed, nothing committed: {e}"))?;

    // Print summary
    println!();
    println!("  Enriched data committed.");
    println!("  Run:        {}", summary.run_id);
    println!("  Companies:  {}", summary.fetched);
    println!("  Written:    {}", summary.written);
    println!("  No data:    {}", summary.skipped_no_data);
    println!("  Transport:  {}", summary.skipped_transport);
    println!("  Decode:     {}", summary.skipped_decode);
    println!("  Write skip: {}", summary.skipped_write);
    if let Some(elapsed) = summary.elapsed() {
        println!(
            "  Time:       {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }
    println!();

    Ok(())
}

async fn cmd_show(mut config: AppConfig, company_id: i64, db: Option<PathBuf>) -> Result<()> {
    if let Some(path) = db {
        config.database.path = path;
    }

    let storage = Storage::open(&config.database).await?;
    let found = storage.get_enriched(company_id).await;
    storage.close();

    let record = found?.ok_or_else(|| {
        eyre!(
            "no enriched data for company {company_id} in {}",
            config.database.sink_table
        )
    })?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn row_done(&self, source: &SourceRecord, outcome: RowOutcome, current: usize, total: usize) {
        let status = match outcome {
            RowOutcome::Written => "written".to_string(),
            RowOutcome::Skipped(reason) => format!("skipped ({reason})"),
        };
        self.spinner
            .set_message(format!("[{current}/{total}] company {} {status}", source.id));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
