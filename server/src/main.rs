use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docsum::api::{self, AppState};
use docsum::config::ModelProvider;
use docsum::orchestrator::Pipeline;
use docsum::ServiceConfig;

/// Document summarization service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file (defaults to config/docsum.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000.
    #[arg(long)]
    bind: Option<String>,

    /// Summarization runtime: huggingface, ollama or stub.
    #[arg(long)]
    model_provider: Option<ModelProvider>,

    /// Directory for persisted summaries.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory for retained uploads and scratch files.
    #[arg(long)]
    input_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(provider) = self.model_provider {
            config.model.set_provider(provider);
        }
        if let Some(dir) = self.output_dir {
            config.storage.output_dir = dir;
        }
        if let Some(dir) = self.input_dir {
            config.storage.input_dir = dir;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("docsum=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;

    // Loading probes the model; a failure here stops startup before binding.
    let pipeline = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Pipeline::new(&config))
            .await
            .context("model loading task panicked")??
    };

    let app = api::router(AppState::new(pipeline), &config.server);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        %addr,
        provider = ?config.model.provider,
        model = %config.model.model_id(),
        output_dir = %config.storage.output_dir.display(),
        "docsum listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("docsum stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
