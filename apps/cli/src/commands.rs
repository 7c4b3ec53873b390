//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use scriptorium_linker::{LinkerOptions, link_posts};
use scriptorium_liturgy::{ImportReport, Importer, ProgressReporter};
use scriptorium_shared::{AppConfig, LiturgyEntry, init_config, load_config, load_config_from};
use scriptorium_storage::Storage;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// scriptorium: keep the blog's generated content in shape.
#[derive(Parser)]
#[command(
    name = "scriptorium",
    version,
    about = "Content automation for the blog: related posts and liturgy import.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./scriptorium.toml, then ~/.scriptorium/scriptorium.toml).
    #[arg(long, global = true, env = "SCRIPTORIUM_CONFIG")]
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
    /// Recompute `relatedPosts` for every blog post.
    Link {
        /// Blog post root (overrides `linker.content_dir`).
        #[arg(long)]
        content_dir: Option<PathBuf>,

        /// Report related posts without rewriting any file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Import the Liturgy of the Hours EPUB into the record sink.
    #[command(name = "import-liturgy")]
    ImportLiturgy {
        /// EPUB path (overrides `liturgy.epub_path`).
        #[arg(long)]
        epub: Option<PathBuf>,

        /// Database path or URL (overrides `sink.database`).
        #[arg(long)]
        database: Option<String>,

        /// Extract and report without touching the sink.
        #[arg(long)]
        dry_run: bool,
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
    /// Initialize the user config file with defaults.
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
        0 => "scriptorium=info",
        1 => "scriptorium=debug",
        _ => "scriptorium=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Link {
            content_dir,
            dry_run,
        } => cmd_link(&config, content_dir, dry_run),
        Command::ImportLiturgy {
            epub,
            database,
            dry_run,
        } => cmd_import_liturgy(config, epub, database, dry_run).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_link(config: &AppConfig, content_dir: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let mut options = LinkerOptions::from(&config.linker);
    if let Some(dir) = content_dir {
        options.content_dir = dir;
    }
    options.dry_run = dry_run;

    let report = link_posts(&options)?;

    println!();
    for post in &report.updated {
        println!("  {}:", post.title.as_deref().unwrap_or("Untitled"));
        println!("  >>> {} related articles found.", post.related.len());
    }
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    println!();
    println!(
        "  {} {} posts, skipped {}.",
        if dry_run { "Checked" } else { "Updated" },
        report.updated.len(),
        report.skipped.len()
    );
    println!();

    Ok(())
}

async fn cmd_import_liturgy(
    mut config: AppConfig,
    epub: Option<PathBuf>,
    database: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let start = Instant::now();
    if let Some(path) = epub {
        config.liturgy.epub_path = path;
    }
    if let Some(database) = database {
        config.sink.database = database;
    }

    // Fail on missing credentials before doing any work.
    if !dry_run {
        config.sink.auth_token()?;
    }

    info!(epub = %config.liturgy.epub_path.display(), dry_run, "importing liturgy");

    let importer = Importer::new(config.liturgy.seasons.clone());
    let reporter = CliProgress::new();
    let report = importer.import_file(&config.liturgy.epub_path, Utc::now(), &reporter)?;

    let inserted = if dry_run {
        0
    } else {
        let storage = Storage::connect(&config.sink).await?;
        storage.replace_entries(&report.entries).await?
    };

    println!();
    println!("  Liturgy import {}", if dry_run { "checked (dry run)" } else { "complete!" });
    println!("  Entries:  {}", report.entries.len());
    println!("  Skipped:  {}", report.warnings.len());
    for warning in &report.warnings {
        println!(
            "    [{}] {} ({}): {}",
            warning.season,
            warning.title.as_deref().unwrap_or("-"),
            warning.reference,
            warning.kind
        );
    }
    if !dry_run {
        println!("  Inserted: {inserted}");
        println!("  Sink:     {}", config.sink.database);
    }
    println!("  Time:     {:.1}s", start.elapsed().as_secs_f64());
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(format!("Reading {name} index"));
    }

    fn entry_resolved(&self, entry: &LiturgyEntry) {
        self.spinner.set_message(format!(
            "[{}] {} ({} files)",
            entry.order,
            entry.title,
            entry.source_files.len()
        ));
    }

    fn done(&self, _report: &ImportReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
