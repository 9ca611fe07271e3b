//! Main entry point for the squad-queue matchmaking service
//!
//! Standalone runs wire the engine to the logging notification sink and the
//! in-memory gateway implementations; a platform front end embeds the
//! library crate and supplies its own.

use anyhow::Result;
use clap::Parser;
use squad_queue::config::AppConfig;
use squad_queue::gateway::provisioner::InMemorySubChannelProvisioner;
use squad_queue::gateway::sink::LogSink;
use squad_queue::rating::provider::InMemoryRatingProvider;
use squad_queue::service::App;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Squad Queue - time-boxed squad matchmaking with ranked room partitioning
#[derive(Parser)]
#[command(
    name = "squad-queue",
    version,
    about = "Matchmaking engine for time-boxed squad events",
    long_about = "Squad Queue coordinates capacity-limited matchmaking sessions: players \
                 register into fixed-size squads, squads confirm participation, and confirmed \
                 squads are partitioned into skill-ranked rooms either on operator command or \
                 by a background scheduler driven by configured time offsets."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    Ok(config)
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Squad Queue Matchmaking Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Intake: opens {}m before start, joining {}m, extension {}m",
        config.schedule.queue_open_minutes,
        config.schedule.joining_minutes,
        config.schedule.extension_minutes
    );
    info!("   Scheduler tick: {}s", config.schedule.tick_seconds);
    info!(
        "   Notifications: {} chars max, flushed every {}s",
        config.messaging.max_chunk_chars, config.messaging.flush_interval_seconds
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(&config.service.log_level)?;
    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration valid, exiting (dry run)");
        return Ok(());
    }

    let app = App::new(
        config,
        Arc::new(LogSink),
        Arc::new(InMemorySubChannelProvisioner::new()),
        Arc::new(InMemoryRatingProvider::new()),
    );
    app.start();

    wait_for_shutdown_signal().await;
    info!("Shutting down...");
    app.shutdown().await;

    Ok(())
}
