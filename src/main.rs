//! CLI entry point for the transit tracker.
//!
//! `serve` keeps a live map of the configured routes behind an HTTP server;
//! `snapshot` renders the map once to a file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_tracker::{
    cache::SnapshotCache,
    config::Config,
    infra::onebusaway::OneBusAwayClient,
    render::MapRenderer,
    scheduler::{Pipeline, spawn_scheduler},
    server::{AppState, router},
};

#[derive(Parser)]
#[command(name = "transit_tracker")]
#[command(about = "Live transit vehicle map for a fixed set of routes", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the map in the background and serve it over HTTP
    Serve,
    /// Fetch and render the map once, writing the full page to a file
    Snapshot {
        /// HTML file to write
        #[arg(short, long, default_value = "map.html")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = cli.config;
    config.validate()?;

    info!(
        routes = ?config.route_ids,
        interval_secs = config.update_interval,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Snapshot { output } => {
            let pipeline = build_pipeline(&config)?;
            let fragment = pipeline.run().await?;
            std::fs::write(&output, pipeline.renderer().wrap(&fragment))?;
            info!(output = %output, "Map written");
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config) -> Result<Arc<Pipeline>> {
    let client =
        OneBusAwayClient::with_api_key(&config.base_url, &config.api_key, config.fetch_timeout())?;

    Ok(Arc::new(Pipeline::new(
        Arc::new(client),
        config.route_ids.clone(),
        MapRenderer::new(config.render_config()),
        config.fetch_timeout(),
    )))
}

/// Starts the scheduler, holds back the listener until the first map is
/// published, then serves until Ctrl+C.
#[tracing::instrument(skip_all, fields(listen = %config.listen))]
async fn serve(config: Config) -> Result<()> {
    let pipeline = build_pipeline(&config)?;
    let cache = SnapshotCache::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = spawn_scheduler(
        Arc::clone(&pipeline),
        cache.clone(),
        config.refresh_period(),
        shutdown_rx,
    );

    info!("Waiting for the first map before accepting traffic");
    tokio::select! {
        _ = cache.read() => {}
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(true);
            scheduler.await?;
            return Ok(());
        }
    }

    let listener = TcpListener::bind(&config.listen).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(AppState::new(cache, pipeline)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    scheduler.await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
}
