//! Chat Exporter CLI
//!
//! Exports the conversation open in the browser tab to a Markdown file.
//! The browser extension connects to the local bridge; this binary is the
//! trigger that starts a session.
//!
//! Usage:
//!   chat-exporter export                       # Export to the Downloads folder
//!   chat-exporter export --out-dir ./chats     # Export somewhere else
//!   chat-exporter export --config exporter.json
//!   chat-exporter config > exporter.json       # Dump the default configuration

use anyhow::{Context, Result};
use chat_exporter::extension_bridge::{PageBridge, DEFAULT_WS_ADDR};
use chat_exporter::platforms::browser::{BrowserPage, PageOverlay};
use chat_exporter::status::CompositeObserver;
use chat_exporter::{ChatPage, Exporter, ExporterConfig, FileSink};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

mod terminal;

#[derive(Parser)]
#[command(name = "chat-exporter")]
#[command(about = "📥 Chat Exporter - save a conversation as Markdown")]
#[command(
    long_about = "Chat Exporter drives the conversation page through the browser extension, recovers every human and assistant message, and writes them as one Markdown transcript."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the conversation open in the connected tab
    Export(ExportArgs),
    /// Print the default configuration as JSON
    Config,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Directory the transcript is written to (defaults to the Downloads folder)
    #[clap(long, short = 'o')]
    out_dir: Option<PathBuf>,

    /// JSON configuration file; missing fields keep their defaults
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Address the extension bridge listens on
    #[clap(long, env = "CHAT_EXPORTER_BRIDGE_ADDR", default_value = DEFAULT_WS_ADDR)]
    bridge_addr: String,

    /// Seconds to wait for the extension to connect
    #[clap(long, default_value_t = 30)]
    connect_timeout: u64,

    /// Let intercepted writes reach the real clipboard too
    #[clap(long)]
    forward_clipboard: bool,

    /// Milliseconds the final status stays visible before teardown
    #[clap(long)]
    teardown_delay: Option<u64>,

    /// Verbose output
    #[clap(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export(args) => run_export(args).await,
        Commands::Config => print_default_config(),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn print_default_config() -> Result<bool> {
    let json = ExporterConfig::default()
        .to_json_pretty()
        .context("Failed to serialize default configuration")?;
    println!("{json}");
    Ok(true)
}

fn load_config(args: &ExportArgs) -> Result<ExporterConfig> {
    let mut config = match &args.config {
        Some(path) => ExporterConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExporterConfig::default(),
    };

    if args.forward_clipboard {
        config.capture.forward_to_clipboard = true;
    }
    if let Some(ms) = args.teardown_delay {
        config.delays.teardown_ms = ms;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn output_dir(args: &ExportArgs) -> Result<PathBuf> {
    if let Some(dir) = &args.out_dir {
        return Ok(dir.clone());
    }
    match dirs::download_dir() {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Failed to resolve current directory"),
    }
}

/// Returns whether the session completed
async fn run_export(args: ExportArgs) -> Result<bool> {
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let out_dir = output_dir(&args)?;
    debug!(?config, out_dir = %out_dir.display(), "Resolved export settings");

    let bridge = if args.bridge_addr == DEFAULT_WS_ADDR {
        PageBridge::global().await
    } else {
        PageBridge::bind(&args.bridge_addr).await
    }
    .with_context(|| format!("Failed to start extension bridge on {}", args.bridge_addr))?;

    println!(
        "⏳ Waiting for the browser extension on ws://{} ...",
        bridge.local_addr()
    );
    bridge
        .wait_for_client(Duration::from_secs(args.connect_timeout))
        .await
        .context("Browser extension did not connect")?;
    info!("Extension connected");

    let page: Arc<dyn ChatPage> = Arc::new(BrowserPage::new(
        bridge.clone(),
        config.selectors.clone(),
    ));
    let observer = CompositeObserver::new()
        .with(Arc::new(terminal::TerminalObserver))
        .with(Arc::new(PageOverlay::new(bridge.clone())));
    let sink = FileSink::new(out_dir);

    let exporter = Exporter::new(page, config);
    let report = exporter
        .export(Arc::new(observer), Arc::new(sink))
        .await
        .context("Failed to start export session")?;

    terminal::print_report(&report);
    Ok(report.is_success())
}
