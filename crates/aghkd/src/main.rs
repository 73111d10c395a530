// # aghkd - AdGuard Home HomeKit bridge daemon
//
// The daemon is a thin integration layer:
// 1. Parse the CLI flag and load the JSON configuration
// 2. Initialize tracing
// 3. Fetch the initial protection state (fatal on failure)
// 4. Register the switch accessory and start the HAP transport
// 5. Run the reconciliation engine until a termination signal
//
// All bridge logic lives in aghk-core; the HTTP and HomeKit specifics live
// in aghk-adguard and aghk-hap.
//
// ## Configuration
//
// A JSON file selected with `--config` (default: config.json):
//
// ```json
// {
//   "url": "http://adguard.local",
//   "username": "admin",
//   "password": "secret",
//   "storage_path": "/var/lib/aghk",
//   "homekit_pin": "00102003"
// }
// ```
//
// `url`, `username`, and `password` are required; the other fields have
// defaults. Set the `HAP_DEBUG` environment variable to enable verbose
// logging in the accessory library.

use aghk_adguard::AdGuardClient;
use aghk_core::traits::ProtectionClient;
use aghk_core::{BridgeConfig, BridgeEngine};
use aghk_hap::HapTransport;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum BridgeExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<BridgeExitCode> for ExitCode {
    fn from(code: BridgeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(
    name = "aghkd",
    about = "Bridge the AdGuard Home protection flag to a HomeKit switch"
)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Load and validate configuration before anything else
    let config = match BridgeConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return BridgeExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return BridgeExitCode::ConfigError.into();
    }

    // Initialize tracing; HAP_DEBUG raises the accessory library's targets
    // to debug, RUST_LOG overrides everything
    let default_filter = if std::env::var_os("HAP_DEBUG").is_some() {
        "info,hap=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BridgeExitCode::ConfigError.into();
    }

    info!("Starting aghkd");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BridgeExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            BridgeExitCode::RuntimeError
        } else {
            BridgeExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: BridgeConfig) -> Result<()> {
    let client = AdGuardClient::from_config(&config);

    // Establish the initial mirrored value before the accessory is
    // registered; a failure here is fatal to startup
    let enabled = client
        .protection_enabled()
        .await
        .context("initial status fetch failed")?;
    info!("Connected to AdGuard Home, protection enabled: {}", enabled);

    let (transport, switch) = HapTransport::new(&config, enabled)
        .await
        .context("accessory transport initialization failed")?;

    let (engine, mut event_rx) = BridgeEngine::new(Box::new(client), Box::new(switch));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let engine_task =
        tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    // Drain engine events into the log
    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::debug!(?event, "engine event");
        }
    });

    let mut transport_task = tokio::spawn(transport.run());

    // Run until a termination signal arrives or the transport dies
    let outcome = tokio::select! {
        signal_name = wait_for_shutdown() => {
            let signal_name = signal_name?;
            info!("Received {}, shutting down", signal_name);
            Ok(())
        }

        result = &mut transport_task => {
            match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("transport stopped unexpectedly")),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("transport failed")),
                Err(e) => Err(anyhow::Error::new(e).context("transport task panicked")),
            }
        }
    };

    // Stop the poll loop first, then the transport; in-flight HTTP calls
    // finish or error out on their own
    let _ = shutdown_tx.send(());
    if let Err(e) = engine_task.await.context("engine task panicked")? {
        error!("Engine error during shutdown: {}", e);
    }

    if !transport_task.is_finished() {
        transport_task.abort();
        let _ = transport_task.await;
    }

    event_task.abort();
    let _ = event_task.await;

    if outcome.is_ok() {
        info!("Shutdown complete");
    }
    outcome
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal_name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal_name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
