//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest media harvester.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use sumi_harvest::config::{load_config, validate, Config, RendererKind};
use sumi_harvest::output::{print_dedup_report, print_summary};
use sumi_harvest::url::{extract_domain, parse_seed_url};
use sumi_harvest::{run_dedup, Harvester};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a media harvester for rendered websites
///
/// Sumi-Harvest renders a site from a seed URL, follows its links to a
/// bounded depth, downloads the images and videos it references from the
/// site and its asset hosts, and removes duplicate copies afterwards.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A media harvester for rendered websites", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    harvest: HarvestArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove duplicate media from an existing directory
    Dedup(DedupArgs),
}

#[derive(Args, Debug)]
struct LogArgs {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct HarvestArgs {
    /// Seed URL to harvest from (https:// is assumed if no scheme is given)
    #[arg(value_name = "URL", required = true)]
    url: Option<String>,

    /// How many link hops to follow from the seed page
    #[arg(short, long)]
    depth: Option<u32>,

    /// Output directory [default: ./<seed host>]
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of concurrent downloads
    #[arg(short, long)]
    concurrency: Option<u32>,

    /// Drop images narrower than this many pixels
    #[arg(long, value_name = "PX")]
    min_width: Option<u32>,

    /// Drop images shorter than this many pixels
    #[arg(long, value_name = "PX")]
    min_height: Option<u32>,

    /// Shorthand for --min-width and --min-height
    #[arg(long, value_name = "PX", conflicts_with_all = ["min_width", "min_height"])]
    min_dim: Option<u32>,

    /// Keep downloads whose bytes match an earlier download
    #[arg(long)]
    allow_duplicates: bool,

    /// Skip visual-similarity deduplication
    #[arg(long)]
    no_visual_dedup: bool,

    /// Show what would be downloaded without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Page renderer to use
    #[arg(long, value_enum)]
    renderer: Option<RendererArg>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(Args, Debug)]
struct DedupArgs {
    /// Directory to deduplicate
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Report duplicates without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RendererArg {
    /// Headless Chromium
    Browser,
    /// Static HTML over plain HTTP
    Http,
}

impl From<RendererArg> for RendererKind {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Browser => RendererKind::Browser,
            RendererArg::Http => RendererKind::Http,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Dedup(args)) => {
            setup_logging(args.log.verbose, args.log.quiet);
            handle_dedup(args).await
        }
        None => {
            setup_logging(cli.harvest.log.verbose, cli.harvest.log.quiet);
            handle_harvest(cli.harvest).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
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

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file if one was given, otherwise the defaults
fn base_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Layers command-line flags over the loaded configuration
fn apply_overrides(config: &mut Config, args: &HarvestArgs) {
    if let Some(depth) = args.depth {
        config.crawler.depth = depth;
    }
    if let Some(renderer) = args.renderer {
        config.crawler.renderer = renderer.into();
    }
    if let Some(concurrency) = args.concurrency {
        config.download.concurrency = concurrency;
    }
    if let Some(dim) = args.min_dim {
        config.download.min_width = dim;
        config.download.min_height = dim;
    }
    if let Some(width) = args.min_width {
        config.download.min_width = width;
    }
    if let Some(height) = args.min_height {
        config.download.min_height = height;
    }
    if args.allow_duplicates {
        config.download.content_dedup = false;
    }
    if args.no_visual_dedup {
        config.dedup.visual = false;
    }
}

/// Shutdown token cancelled on Ctrl-C
fn shutdown_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight downloads");
            trigger.cancel();
        }
    });

    token
}

/// Handles the default mode: harvest a site
async fn handle_harvest(args: HarvestArgs) -> anyhow::Result<()> {
    let raw_url = args.url.as_deref().context("a seed URL is required")?;
    let seed = parse_seed_url(raw_url).with_context(|| format!("Invalid seed URL: {}", raw_url))?;

    let mut config = base_config(args.config.as_ref())?;
    apply_overrides(&mut config, &args);
    validate(&config).context("Invalid options")?;

    let output = match &args.output {
        Some(dir) => dir.clone(),
        None => PathBuf::from(extract_domain(&seed).context("Seed URL has no host")?),
    };

    let shutdown = shutdown_on_interrupt();
    let harvester = Harvester::launch(config, output, args.dry_run, shutdown)
        .await
        .context("Failed to start harvest")?;

    match harvester.run(&seed).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the `dedup` subcommand: deduplicate an existing directory
async fn handle_dedup(args: DedupArgs) -> anyhow::Result<()> {
    let config = base_config(args.config.as_ref())?;

    tracing::info!("Deduplicating {}", args.dir.display());
    let report = run_dedup(&args.dir, &config.dedup, args.dry_run).await?;
    print_dedup_report(&report);

    Ok(())
}
