//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark engagement extractor.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tidemark::config::{load_config_with_hash, Config};
use tidemark::output::{
    generate_markdown_summary, generate_summary, load_statistics, print_report, print_statistics,
    write_reports,
};
use tidemark::platform::target_url;
use tidemark::session::{CheckpointGate, Coordinator, GuestGate, ScrapeReport, SessionGate};
use tidemark::storage::{RunStatus, SqliteStorage, Storage};
use tidemark::{SnapshotFactory, TargetState};
use tracing_subscriber::EnvFilter;

/// Tidemark: engagement extraction for social profiles and posts
///
/// Tidemark reads profile headers and item lists from captured or live
/// pages, scrolls lazy-loaded lists to the end, and reports engagement
/// statistics per target.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "Resilient engagement extraction for social pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run without a session and fall back to public endpoints
    #[arg(long)]
    guest: bool,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Validate config and show the targets without scraping
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show stored per-target averages, ranked by engagement rate, and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate the markdown summary of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.guest {
        config.engine.guest_mode = true;
    }
    if cli.headless {
        config.engine.headless = true;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else if config.engine.guest_mode {
        handle_run(config, &config_hash, GuestGate).await?;
    } else {
        handle_run(config, &config_hash, CheckpointGate::new()).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Opens the configured database
fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Handles the --dry-run mode: shows the validated settings and targets
fn handle_dry_run(config: &Config) {
    println!("=== Tidemark Dry Run ===\n");

    println!("Engine:");
    println!("  Max items: {}", config.engine.max_items);
    println!("  Max scroll attempts: {}", config.engine.max_scroll_attempts);
    println!("  Stability threshold: {}", config.engine.stability_threshold);
    println!("  Field budget: {}ms", config.engine.field_budget);
    println!("  Guest mode: {}", config.engine.guest_mode);
    println!("  Headless: {}", config.engine.headless);
    println!("  Post details: {}", config.engine.post_details);

    println!("\nRate limit:");
    println!("  Minimum interval: {}ms", config.rate_limit.minimum_interval);
    println!("  Max requests per origin: {}", config.rate_limit.max_requests_per_origin);
    println!("  Max concurrent pages: {}", config.rate_limit.max_concurrent_pages);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);
    if let Some(dir) = &config.output.json_dir {
        println!("  JSON reports: {}", dir);
    }

    println!("\nTargets ({}):", config.targets.len());
    for target in &config.targets {
        println!(
            "  - {} ({}, {} snapshots, {} post captures)",
            target.label(),
            target.kind,
            target.snapshots.len(),
            target.post_snapshots.len()
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows per-target averages across runs
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let averages = load_statistics(&storage)?;
    print_statistics(&averages);

    Ok(())
}

/// Handles the --export-summary mode: writes the markdown summary of the latest run
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = open_database(config)?;
    let summary = generate_summary(&storage, None)?;
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);
    Ok(())
}

/// Handles the main batch: scrape, persist, and report
async fn handle_run<G>(config: Config, config_hash: &str, gate: G) -> anyhow::Result<()>
where
    G: SessionGate + 'static,
{
    tracing::info!(
        "Targets: {}, guest mode: {}",
        config.targets.len(),
        config.engine.guest_mode
    );

    let mut storage = open_database(&config)?;
    let run_id = storage.create_run(config_hash)?;
    let output = config.output.clone();
    let targets = config.targets.clone();

    let coordinator = match Coordinator::new(config, SnapshotFactory::new(), gate) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            storage.finish_run(run_id, RunStatus::Failed)?;
            return Err(e).context("Failed to set up the batch");
        }
    };
    let reports = match coordinator.run().await {
        Ok(reports) => reports,
        Err(e) => {
            tracing::error!("Run {} aborted: {}", run_id, e);
            for target in &targets {
                let url = target_url(target).map(|url| url.to_string()).unwrap_or_default();
                let skipped = ScrapeReport::new(target.label(), target.platform, target.kind, url)
                    .fail(TargetState::Skipped, &e);
                storage.save_report(run_id, &skipped)?;
            }
            storage.finish_run(run_id, RunStatus::Aborted)?;
            return Err(e).context(format!("Run {} aborted", run_id));
        }
    };

    for report in &reports {
        storage.save_report(run_id, report)?;
        print_report(report);
    }
    storage.finish_run(run_id, RunStatus::Completed)?;

    if let Some(dir) = &output.json_dir {
        let written = write_reports(Path::new(dir), &reports)
            .with_context(|| format!("Failed to write JSON reports to {}", dir))?;
        tracing::info!("Wrote {} JSON reports to {}", written.len(), dir);
    }

    let summary = generate_summary(&storage, Some(run_id))?;
    generate_markdown_summary(&summary, Path::new(&output.summary_path))?;
    tracing::info!("Summary written to {}", output.summary_path);

    Ok(())
}
