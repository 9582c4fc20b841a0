//! docid HTTP server
//!
//! Identifies scanned PDFs by their first-page code and fronts the remote
//! two-layer OCR service.

mod app;
mod error;
mod extract;
mod routes;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use state::AppState;

const DEFAULT_LOG_FILTER: &str = "info,docid=debug,docid_server=debug";

#[derive(Parser, Debug)]
#[command(name = "docid-server", version, about)]
struct Args {
    /// Config file (JSON or YAML). Falls back to $DOCID_CONFIG, then the
    /// user config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config.
    #[arg(long)]
    bind: Option<String>,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Installs the fmt subscriber and routes `log` records from the library
/// into it.
fn init_tracing() -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

async fn run(args: Args) -> Result<(), BoxError> {
    let mut config = docid::load_effective_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    tracing::info!("Starting docid-server v{}", env!("CARGO_PKG_VERSION"));
    match config.source_root_path() {
        Some(root) => tracing::info!("Source root: {}", root.display()),
        None => tracing::warn!("DATA_SRC_PATH is not set; identification requests will fail"),
    }

    let state = AppState::from_config(&config)?;
    state.warm_up();

    let router = app::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
