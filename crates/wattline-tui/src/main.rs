//! `wattline-tui` — Real-time terminal dashboard for plant energy monitoring.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `wattline-core`'s [`Monitor`](wattline_core::Monitor). Screens are
//! navigable via number keys (1-3): Dashboard, Diagram, and Devices.
//!
//! Logs are written to a file (default `/tmp/wattline-tui.log`) to avoid
//! corrupting the terminal UI. A background data bridge task forwards
//! every poll result from the monitor into the TUI action loop.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and app launch.

mod action;
mod app;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wattline_core::{Monitor, MonitorConfig, TlsVerification};

use crate::app::App;

/// Terminal dashboard for realtime plant energy monitoring.
#[derive(Parser, Debug)]
#[command(name = "wattline-tui", version, about)]
struct Cli {
    /// Energy backend URL (e.g., http://emon.plant.local:8080)
    #[arg(short = 'u', long, env = "WATTLINE_URL")]
    url: Option<String>,

    /// Config profile name (falls back to the file's default_profile)
    #[arg(short = 'p', long)]
    profile: Option<String>,

    /// Realtime poll cadence in seconds
    #[arg(short = 'i', long)]
    interval: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Log file path (defaults to /tmp/wattline-tui.log)
    #[arg(long, default_value = "/tmp/wattline-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that would
/// corrupt the TUI output. Returns a guard that must be held for the
/// lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wattline_tui={log_level}")));

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("wattline-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Build a [`MonitorConfig`] from CLI args, if a URL was provided.
fn config_from_cli(cli: &Cli) -> Result<Option<MonitorConfig>> {
    let Some(url_str) = cli.url.as_deref() else {
        return Ok(None);
    };
    let url = url_str
        .parse()
        .map_err(|e| eyre!("invalid backend URL '{url_str}': {e}"))?;

    let mut config = MonitorConfig::new(url);
    if let Some(secs) = cli.interval {
        config.poll_interval = Duration::from_secs(secs.max(1));
    }
    if cli.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(Some(config))
}

/// Load a [`MonitorConfig`] from the shared config file.
fn config_from_file(cli: &Cli) -> Result<MonitorConfig> {
    let config = wattline_config::load_config()?;
    let (name, profile) = wattline_config::select_profile(&config, cli.profile.as_deref())?;
    info!(profile = name, "using config file profile");

    let mut monitor_config =
        wattline_config::profile_to_monitor_config(profile, &config.defaults)?;
    if let Some(secs) = cli.interval {
        monitor_config.poll_interval = Duration::from_secs(secs.max(1));
    }
    if cli.insecure {
        monitor_config.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(monitor_config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    info!(
        url = cli.url.as_deref().unwrap_or("(not set)"),
        "starting wattline-tui"
    );

    // Priority: CLI flags > config file
    let config = match config_from_cli(&cli)? {
        Some(config) => config,
        None => config_from_file(&cli)?,
    };

    let monitor = Monitor::new(config)?;
    let mut app = App::new(monitor);
    app.run().await?;

    Ok(())
}
