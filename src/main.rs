//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest file harvester.

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sumi_harvest::config::{
    clamp_depth, load_config_with_hash, parse_file_types, validate, validate_seed_url, Config,
    DEFAULT_FILE_TYPES,
};
use sumi_harvest::crawler::{build_http_client, CrawlEngine, ShutdownHandle, StopReason};
use sumi_harvest::download::default_download_dir;
use sumi_harvest::output::{default_report_name, print_download_summary, print_summary, write_report};
use sumi_harvest::url::extract_domain;
use sumi_harvest::{Downloader, NormalizedUrl};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sumi-Harvest: a polite single-site file harvester
///
/// Sumi-Harvest crawls one website from a seed page, respecting robots.txt and
/// a request rate limit, and collects links to files of the chosen types. The
/// result is saved as a list or downloaded.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A polite single-site file harvester", long_about = None)]
struct Cli {
    /// Page to start from; prompted for when omitted
    #[arg(value_name = "URL")]
    seed: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Comma-separated file extensions to collect (e.g. "pdf,zip")
    #[arg(short, long, value_name = "EXTS")]
    types: Option<String>,

    /// Maximum link depth from the seed page (at most 5)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Maximum number of pages to check
    #[arg(long)]
    max_pages: Option<usize>,

    /// Do not consult robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Probe discovered files with HEAD and check their Content-Type
    #[arg(long)]
    verify_content_type: bool,

    /// Download the files found (default directory: downloads_<domain>)
    #[arg(long, value_name = "DIR", num_args = 0..=1, conflicts_with = "report")]
    download: Option<Option<PathBuf>>,

    /// Save the list of files found (default: found_files_<domain>_<timestamp>.txt)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    report: Option<Option<PathBuf>>,

    /// Also write log output to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate settings and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

/// What to do with the files found
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// Save the list, optionally to a given path
    Report(Option<PathBuf>),
    /// Download into a directory, optionally a given one
    Download(Option<PathBuf>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let (seed, action) = match cli.seed.clone() {
        Some(seed) => {
            apply_cli_overrides(&cli, &mut config);
            (seed, cli_action(&cli))
        }
        None => prompt_for_settings(&mut config, &cli)?,
    };

    validate(&config).context("Invalid settings")?;

    // A bad seed ends the run before any request goes out
    let seed_url = validate_seed_url(&seed)?;
    let seed = NormalizedUrl::parse(seed_url.as_str())?;

    if cli.dry_run {
        handle_dry_run(&config, &seed, &action);
        return Ok(());
    }

    handle_harvest(config, seed, action).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file, the same events also go to that file, without colors.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    Ok(())
}

fn apply_cli_overrides(cli: &Cli, config: &mut Config) {
    if let Some(types) = &cli.types {
        config.file_types = parse_file_types(types);
    }
    if let Some(depth) = cli.depth {
        config.crawler.max_depth = clamp_depth(depth);
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if cli.ignore_robots {
        config.crawler.respect_robots = false;
    }
    if cli.verify_content_type {
        config.crawler.verify_content_type = true;
    }
}

fn cli_action(cli: &Cli) -> Action {
    match &cli.download {
        Some(dir) => Action::Download(dir.clone()),
        None => Action::Report(cli.report.clone().flatten()),
    }
}

/// Asks for the seed and the main crawl settings interactively
///
/// Flags given on the command line are applied first and become the defaults
/// offered by the prompts.
fn prompt_for_settings(config: &mut Config, cli: &Cli) -> anyhow::Result<(String, Action)> {
    apply_cli_overrides(cli, config);
    let theme = ColorfulTheme::default();

    let seed: String = Input::with_theme(&theme)
        .with_prompt("Website URL (including http:// or https://)")
        .interact_text()?;

    let default_types = config
        .file_types
        .iter()
        .map(|t| t.trim_start_matches('.'))
        .collect::<Vec<_>>()
        .join(",");
    let types: String = Input::with_theme(&theme)
        .with_prompt(format!(
            "File types to find (default set: {})",
            DEFAULT_FILE_TYPES.join(",")
        ))
        .default(default_types)
        .interact_text()?;
    config.file_types = parse_file_types(&types);

    let depth: u32 = Input::with_theme(&theme)
        .with_prompt("Maximum search depth (0-5)")
        .default(config.crawler.max_depth)
        .interact_text()?;
    config.crawler.max_depth = clamp_depth(depth);

    config.crawler.respect_robots = Confirm::with_theme(&theme)
        .with_prompt("Respect robots.txt?")
        .default(config.crawler.respect_robots)
        .interact()?;

    let choice = Select::with_theme(&theme)
        .with_prompt("What should happen with the files found?")
        .items(&["Save file list", "Download files"])
        .default(if cli.download.is_some() { 1 } else { 0 })
        .interact()?;

    let action = match choice {
        1 => Action::Download(cli.download.clone().flatten()),
        _ => Action::Report(cli.report.clone().flatten()),
    };

    Ok((seed, action))
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, seed: &NormalizedUrl, action: &Action) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Seed: {}", seed);
    println!("File types: {}", config.file_types.join(", "));

    println!("\nCrawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max queue size: {}", config.crawler.max_queue_size);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!(
        "  Verify content type: {}",
        config.crawler.verify_content_type
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    match action {
        Action::Report(path) => println!(
            "\nResult: save file list{}",
            path.as_ref()
                .map(|p| format!(" to {}", p.display()))
                .unwrap_or_default()
        ),
        Action::Download(dir) => {
            println!("\nResult: download files");
            println!("  Workers: {}", config.download.workers);
            println!("  Max file size: {} bytes", config.download.max_file_size);
            if let Some(dir) = dir {
                println!("  Directory: {}", dir.display());
            }
        }
    }

    println!("\n✓ Settings are valid");
}

/// Runs the crawl, then saves or downloads what it found
async fn handle_harvest(config: Config, seed: NormalizedUrl, action: Action) -> anyhow::Result<()> {
    let domain = extract_domain(seed.as_url()).unwrap_or_else(|| "site".to_string());

    let client = build_http_client(&config.user_agent).context("Failed to build HTTP client")?;
    let mut engine = CrawlEngine::with_client(seed, &config, client.clone()).await;

    // The same handle stops the crawl and the downloads
    let shutdown = engine.shutdown_handle();
    tokio::spawn(watch_interrupts(shutdown.clone()));

    let result = engine.run().await;

    print_summary(&result, &config.file_types);

    if result.files.is_empty() {
        println!("No files found to process.");
        return Ok(());
    }

    let action = match action {
        Action::Download(_) if result.stop_reason == StopReason::Interrupted => {
            tracing::warn!("Crawl was interrupted, saving the file list instead of downloading");
            Action::Report(None)
        }
        other => other,
    };

    match action {
        Action::Report(path) => {
            let path = path.unwrap_or_else(|| default_report_name(&domain, Local::now()));
            write_report(&path, &result.files, &config.file_types)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("File list saved to: {}", path.display());
        }
        Action::Download(dir) => {
            let dir = dir.unwrap_or_else(|| default_download_dir(&domain));
            let downloader = Downloader::new(&dir, config.download.clone(), client)
                .await
                .with_context(|| format!("Failed to prepare {}", dir.display()))?
                .with_shutdown(shutdown);
            let report = downloader.download_all(result.files.iter().cloned()).await;
            print_download_summary(&report);
        }
    }

    Ok(())
}

/// First Ctrl-C stops new work and keeps partial results; a second one exits
async fn watch_interrupts(shutdown: ShutdownHandle) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::warn!("Interrupt received, finishing in-flight requests (press Ctrl-C again to quit)");
    shutdown.trigger();

    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::error!("Second interrupt received, exiting");
        std::process::exit(130);
    }
}
