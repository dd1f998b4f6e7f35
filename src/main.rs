//! Draft Advisor
//!
//! Command-line front end: classifies the draft screen in a screenshot and
//! prints the ranked suggestion payload as JSON.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use draft_advisor::vision::{Classifier, ReferenceClassifier};
use draft_advisor::{paths, AdvisorConfig, DraftSession, LayoutConfig, SnapshotRepository};

const LOG_FILE: &str = "draft_advisor.log";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to config.json next to the executable)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Slot layout file, overriding the config
    #[arg(global = true, short, long)]
    layout: Option<PathBuf>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initial scan of a screenshot, then optional rescans
    Scan(ScanArgs),
    /// Check a layout against a screen resolution
    ValidateLayout(ValidateArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Screenshot of the draft screen
    #[arg(short, long)]
    screenshot: PathBuf,

    /// Later screenshots to read picked abilities from, in order
    #[arg(short, long)]
    rescan: Vec<PathBuf>,

    /// Statistics snapshot (JSON)
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Rank suggestions for the hero at this screen position
    #[arg(long)]
    leader: Option<u8>,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Resolution key, e.g. 1920x1080
    #[arg(short, long)]
    resolution: String,
}

/// Logs to stderr and appends to `<exe_dir>/logs/draft_advisor.log`.
fn init_logging(debug: bool) -> Result<()> {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let log_path = paths::get_logs_dir().join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(std::io::stderr.and(Mutex::new(file)))
        .init();
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let thread = std::thread::current();
        error!(
            "[PANIC] thread '{}'{} {}",
            thread.name().unwrap_or("<unnamed>"),
            location,
            msg
        );
    }));
}

fn load_config(cli: &Cli) -> AdvisorConfig {
    let mut config = match &cli.config {
        Some(path) => AdvisorConfig::load(path),
        None => AdvisorConfig::load_default(),
    };
    if let Some(layout) = &cli.layout {
        config.layout_path = layout.clone();
    }
    config
}

fn run_scan(config: AdvisorConfig, args: &ScanArgs) -> Result<()> {
    let repo = match &args.stats {
        Some(path) => SnapshotRepository::load(path)
            .with_context(|| format!("Failed to load statistics from {}", path.display()))?,
        None => {
            info!("No statistics snapshot given; scores will be neutral");
            SnapshotRepository::default()
        }
    };

    let input_size = config.input_size;
    let factory = move || -> Box<dyn Classifier> { Box::new(ReferenceClassifier::new(input_size)) };
    let mut session = DraftSession::open(config, Arc::new(factory), repo)?;
    session.set_preferred_leader(args.leader);
    session.start().context("Classifier failed to start")?;

    let screenshot = image::open(&args.screenshot)
        .with_context(|| format!("Failed to open screenshot {}", args.screenshot.display()))?
        .to_rgba8();
    let mut payload = session.initial_scan(screenshot)?;

    for path in &args.rescan {
        let image = image::open(path)
            .with_context(|| format!("Failed to open screenshot {}", path.display()))?
            .to_rgba8();
        match session.rescan(image) {
            Ok(next) => payload = next,
            Err(e) if e.is_timeout() => {
                // Keep the previous payload; the next trigger will retry
                error!("Rescan of {} timed out: {}", path.display(), e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    session.shutdown();

    let json = if args.pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{}", json);
    Ok(())
}

fn run_validate(config: &AdvisorConfig, args: &ValidateArgs) -> Result<()> {
    let (width, height) = args
        .resolution
        .split_once('x')
        .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)))
        .ok_or_else(|| anyhow!("Invalid resolution '{}', expected WIDTHxHEIGHT", args.resolution))?;

    let layouts = LayoutConfig::load(&config.layout_path)?;
    let layout = layouts.for_dimensions(width, height)?;
    let validation = layout.validate(width, height);

    println!("{}", serde_json::to_string_pretty(&validation)?);
    for warning in &validation.warnings {
        info!("Warning: {}", warning);
    }
    if !validation.passed() {
        bail!("Layout has {} error(s)", validation.errors.len());
    }
    info!("Layout {} passed validation", args.resolution);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure output directories exist
    paths::ensure_directories()?;
    init_logging(cli.debug)?;
    install_panic_hook();

    let config = load_config(&cli);
    let result = match &cli.command {
        Commands::Scan(args) => run_scan(config, args),
        Commands::ValidateLayout(args) => run_validate(&config, args),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
