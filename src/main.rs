//! # Procon Bridge
//!
//! Exposes wired Nintendo Pro Controller 2 pads as standard Linux gamepads.

use anyhow::{Context, Result};
use procon_bridge::config::Config;
use procon_bridge::manager::{format_players, DeviceManager};
use procon_bridge::platform::Platform;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// Config file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for Procon Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber (`RUST_LOG` overrides)
///    - Load configuration from the first argument or `config/default.toml`
///    - Open the Linux USB, hidraw and uinput backends
///
/// 2. **Main Loop**
///    - Scan for controllers on the configured interval
///    - One polling task per controller, up to four players
///
/// 3. **Graceful Shutdown**
///    - On Ctrl+C or SIGTERM, stop every driver
///    - Virtual gamepads destroyed, USB interfaces released
///
/// # Errors
///
/// Returns error if:
/// - The configuration file cannot be read or is invalid
/// - USB enumeration is unavailable (no usbfs access)
///
/// # Examples
///
/// ```bash
/// sudo RUST_LOG=procon_bridge=debug procon-bridge /etc/procon-bridge.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Procon Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(std::env::args_os().nth(1).map(PathBuf::from))?;
    let platform = Platform::linux().context("Failed to open USB backend")?;
    let manager = Arc::new(DeviceManager::new(platform, &config));

    let scanner = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.run().await })
    };

    info!("Press Ctrl+C to exit");
    wait_for_shutdown().await?;

    info!("Shutting down...");
    manager.shutdown().await;
    if let Err(e) = scanner.await {
        warn!("Scan loop ended abnormally: {}", e);
    }
    info!("Players at exit: {}", format_players(&manager.active_players()));

    Ok(())
}

/// Loads `path`, else the default config file if present, else built-in defaults.
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH)),
        None => {
            info!("No config file, using defaults");
            Ok(Config::default())
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn wait_for_shutdown() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C");
        }
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
    Ok(())
}
