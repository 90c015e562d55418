//! prefix-gateway
//!
//! ```text
//! prefix-gateway serve --config gateway.toml [--listen 0.0.0.0:8080] [--watch]
//! prefix-gateway check --config gateway.toml
//! ```
//!
//! Exit codes: 0 clean shutdown, 1 startup failure, 2 configuration error.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;

use prefix_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use prefix_gateway::lifecycle::{SignalEvent, SignalListener};
use prefix_gateway::observability::{logging, metrics, outcome, ChannelSink};
use prefix_gateway::state::Snapshot;
use prefix_gateway::{Gateway, GatewayServer, Shutdown};

const EXIT_STARTUP: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "prefix-gateway", version)]
#[command(about = "Path-prefix HTTP gateway with health-checked upstream pools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway
    Serve(ServeArgs),
    /// Validate a configuration file and print its route table
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Listen address, overriding `listener.bind_address`
    #[arg(short, long)]
    listen: Option<String>,

    /// Reload when the configuration file changes
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Check { config } => check(&config),
    }
}

fn check(path: &Path) -> ExitCode {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("prefix-gateway: {}: {e}", path.display());
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    match Snapshot::build(&config, 0, None) {
        Ok(snapshot) => {
            for route in snapshot.routes.iter() {
                let upstreams = snapshot
                    .pool
                    .group(route.group)
                    .map(|g| g.members().iter().map(|u| u.address()).collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                println!(
                    "{:<24} strip={:<5} timeout={}ms -> {}",
                    route.prefix(),
                    route.strip_prefix,
                    route.timeout.as_millis(),
                    upstreams
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("prefix-gateway: {}: {e}", path.display());
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

async fn serve(args: ServeArgs) -> ExitCode {
    let mut config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("prefix-gateway: {}: {e}", args.config.display());
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Some(listen) = &args.listen {
        config.listener.bind_address = listen.clone();
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "prefix-gateway starting");

    if let Some(addr) = &config.observability.metrics_address {
        let started = addr
            .parse::<SocketAddr>()
            .map_err(|e| e.to_string())
            .and_then(|addr| metrics::init_metrics(addr).map_err(|e| e.to_string()));
        if let Err(e) = started {
            tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter");
            return ExitCode::from(EXIT_STARTUP);
        }
    }

    let (sink, outcomes) = ChannelSink::new(config.observability.outcome_buffer);
    tokio::spawn(outcome::log_outcomes(outcomes));

    let gateway = match Gateway::new(&config, Arc::new(sink)) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %config.listener.bind_address, error = %e, "Failed to bind listener");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    let mut signals = match SignalListener::new() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    let _watcher = if args.watch {
        match spawn_watcher(&args.config, gateway.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start config watcher");
                return ExitCode::from(EXIT_STARTUP);
            }
        }
    } else {
        None
    };

    let shutdown = Shutdown::new(Duration::from_millis(config.timeouts.shutdown_grace_ms));
    let server = GatewayServer::new(gateway.clone());
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    loop {
        tokio::select! {
            event = signals.next() => match event {
                SignalEvent::Reload => {
                    if let Ok(generation) = gateway.reload_from(&args.config) {
                        tracing::info!(generation, "Configuration reloaded");
                    }
                }
                SignalEvent::Shutdown => break,
            },
            result = &mut server_task => {
                return match result {
                    Ok(Ok(())) => ExitCode::SUCCESS,
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "HTTP server failed");
                        ExitCode::from(EXIT_STARTUP)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "HTTP server task panicked");
                        ExitCode::from(EXIT_STARTUP)
                    }
                };
            }
        }
    }

    shutdown.trigger();
    gateway.stop_health_checks();
    if !shutdown.drain(&mut server_task).await {
        server_task.abort();
    }
    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

/// Watch the config file and apply every version that parses and validates.
fn spawn_watcher(
    path: &Path,
    gateway: Arc<Gateway>,
) -> Result<notify::RecommendedWatcher, notify::Error> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let handle = watcher.run()?;
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            apply_update(&gateway, &config);
        }
    });
    Ok(handle)
}

fn apply_update(gateway: &Gateway, config: &GatewayConfig) {
    if let Ok(generation) = gateway.apply(config) {
        tracing::info!(generation, "Configuration reloaded from file change");
    }
}
