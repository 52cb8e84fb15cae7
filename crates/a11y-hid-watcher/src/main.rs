//! a11y-hid-watcher entry point.
//!
//! Loads the config, sets up logging, and runs the watcher until Ctrl-C or
//! SIGTERM.
//!
//! # Usage
//!
//! ```text
//! a11y-hid-watcher [OPTIONS]
//!
//! Options:
//!   -c, --config <PATH>   Configuration file [default: a11y-hid-watcher.toml]
//! ```
//!
//! `A11Y_HID_WATCHER_CONFIG` sets the config path when `--config` is absent.
//! If the file does not exist a commented default is written and the program
//! exits so the user can fill in the keyboard's ids.
//!
//! `RUST_LOG`, when set, overrides the `[logging] level` from the file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use a11y_hid_watcher::application::play_cues::CueDispatcher;
use a11y_hid_watcher::application::watch::{WatchTiming, Watcher};
use a11y_hid_watcher::domain::{
    load_config, write_default_config, LoggingConfig, DEFAULT_CONFIG_PATH,
};
use a11y_hid_watcher::infrastructure::sound::CommandCuePlayer;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Plays audio cues for keyboard layer and Caps Word changes.
#[derive(Debug, Parser)]
#[command(name = "a11y-hid-watcher", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(
        short,
        long,
        env = "A11Y_HID_WATCHER_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !cli.config.exists() {
        write_default_config(&cli.config)
            .with_context(|| format!("failed to create {}", cli.config.display()))?;
        println!("Default configuration file created at {}.", cli.config.display());
        println!("Please edit the configuration file and run a11y-hid-watcher again.");
        return Ok(());
    }

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    init_logging(&config.logging)?;

    println!("Starting a11y-hid-watcher...");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let player = Arc::new(CommandCuePlayer::from_config(&config.sounds));
    let cues = CueDispatcher::new(config.sounds.clone(), config.enabled_sounds.clone(), player);
    let opener = device_opener()?;

    Watcher::new(opener, config.device.clone(), cues, WatchTiming::default())
        .run(shutdown_rx)
        .await;
    Ok(())
}

/// Structured logging to stdout and the configured log file.  The level
/// comes from `RUST_LOG` if set, otherwise from the config.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logging.file)
        .with_context(|| format!("failed to open log file {}", logging.file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::io::stdout.and(Mutex::new(file)))
        .init();
    Ok(())
}

#[cfg(target_os = "linux")]
fn device_opener() -> anyhow::Result<a11y_hid_watcher::infrastructure::device::hidraw::HidrawOpener>
{
    Ok(a11y_hid_watcher::infrastructure::device::hidraw::HidrawOpener::new())
}

#[cfg(not(target_os = "linux"))]
fn device_opener() -> anyhow::Result<a11y_hid_watcher::infrastructure::device::mock::MockDevice> {
    anyhow::bail!("raw HID access is only implemented for Linux hidraw")
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
