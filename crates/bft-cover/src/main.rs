use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bft_cover::config::Config;
use bft_cover::cover::CoverRegistry;
use bft_cover::gate::HttpGateClient;
use bft_cover::server::{AppState, build_app};

#[derive(Parser)]
#[command(name = "bft-cover", version, about = "Supervisor for BFT U-Control gates")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "bft-cover.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,
        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the state of every cover as JSON and exit
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let client = Arc::new(
        HttpGateClient::new(&config.api.client_config()).context("building gate client")?,
    );
    let covers = CoverRegistry::connect_all(&config, client.clone(), client).await;
    if covers.is_empty() {
        warn!("No covers available; check the covers section of the config");
    }
    for cover in covers.iter() {
        let state = cover.state().await;
        info!(cover = %cover.slug(), state = ?state, "Cover ready");
    }

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Status => {
            let attributes = covers.attributes().await;
            println!("{}", serde_json::to_string_pretty(&attributes)?);
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
                .parse()
                .context("invalid server address")?;

            let app = build_app(
                AppState {
                    covers: covers.clone(),
                },
                config.server.request_timeout_seconds,
            );
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            info!(%addr, "Listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    covers.dispose_all().await;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
