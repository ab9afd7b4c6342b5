//! Launchkey GW - Rust implementation
//!
//! Bridges a Launchkey Mini MK4 (real or virtual) to WebSocket clients and
//! mirrors its OLED display.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use launchkey_gw::config::AppConfig;
use launchkey_gw::gateway::Gateway;
use launchkey_gw::ports::discovery::list_ports_formatted;
use launchkey_gw::ports::{MidirBackend, PortTopology, PORT_EVENT_CAPACITY};
use launchkey_gw::server::{self, ServerState};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Launchkey GW - Bridge a Launchkey Mini MK4 to WebSocket clients
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply without one)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// HTTP/WebSocket port (overrides the config file)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Bind address (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Console log format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Also write a daily-rolling log file into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// List available MIDI ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Skip hardware discovery and run with virtual ports only
    #[arg(long)]
    no_hardware: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(&args.log_level, args.log_format, args.log_dir.as_deref())?;

    info!("Starting Launchkey GW v{}...", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;
    let names = config.port_names();
    let backend = MidirBackend::new(&config.device.client_name);

    if args.list_ports {
        list_ports_formatted(&backend, &names);
        return Ok(());
    }

    let (port_tx, port_rx) = mpsc::channel(PORT_EVENT_CAPACITY);
    let topology = PortTopology::open(&backend, &names, config.device.discover_hardware, port_tx)
        .context("Failed to open virtual MIDI ports")?;

    let (gateway, handle) = Gateway::new(topology, port_rx);
    let signals = shutdown_signal();

    let listener = server::bind(&config.server.host, config.server.port).await?;
    let state = Arc::new(ServerState {
        gateway: handle,
        static_dir: config.server.static_dir.clone(),
    });
    let mut server_task = tokio::spawn(server::serve(listener, state));

    // The gateway owns the MIDI connections and runs on the main task
    let shutdown = async {
        tokio::select! {
            _ = signals => {}
            result = &mut server_task => match result {
                Ok(Ok(())) => info!("HTTP server stopped"),
                Ok(Err(e)) => error!("HTTP server failed: {:#}", e),
                Err(e) => error!("HTTP server task failed: {}", e),
            },
        }
    };
    gateway.run(shutdown).await;

    server_task.abort();
    info!("Launchkey GW shutdown complete");
    Ok(())
}

/// Load the optional config file and apply command-line overrides
async fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let config = AppConfig::load(path).await?;
            info!("Configuration loaded from {}", path);
            config
        }
        None => {
            info!("No configuration file given, using defaults");
            AppConfig::default()
        }
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if args.no_hardware {
        config.device.discover_hardware = false;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(
    level: &str,
    format: LogFormat,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "launchkey-gw.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(false)).try_init(),
    }
    .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Resolve on Ctrl+C or, on unix, SIGTERM. Handlers are installed when this
/// is called, not when the future is first polled.
fn shutdown_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let terminate = signal(SignalKind::terminate());

    async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C received"),
                Err(e) => {
                    error!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match terminate {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("SIGTERM received");
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_resolves_shutdown() {
        let shutdown = shutdown_signal();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("shutdown future did not resolve on SIGTERM");
    }
}
