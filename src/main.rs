use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sketchpad_rs::config::load_config;
use sketchpad_rs::{room, AppState};

#[derive(Parser, Debug)]
#[command(name = "sketchpad")]
#[command(about = "Collaborative drawing relay with shareable rooms")]
#[command(version)]
struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ids = config
        .rooms
        .id_generator()
        .context("Failed to build room id generator")?;
    tracing::debug!(
        "Room ids: length {}, space {}, a={}, c={}",
        config.rooms.id_length,
        ids.range(),
        ids.multiplier(),
        ids.increment()
    );

    let registry = room::RoomRegistry::new(ids, config.canvas)
        .with_max_id_attempts(config.rooms.max_id_attempts);
    let state = AppState::in_memory(registry);

    let _janitor = room::janitor::spawn_eviction_timer(
        Arc::clone(&state.registry),
        Duration::from_secs(config.rooms.idle_ttl_secs),
        Duration::from_secs(config.rooms.sweep_interval_secs),
    );

    let app = sketchpad_rs::router(state, config.server.static_dir.as_deref());

    let addr = config.server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("🎨 Sketchpad server running on http://{}", addr);
    tracing::info!(
        "   Canvas limit: {}x{} (+{} growth margin)",
        config.canvas.max_width,
        config.canvas.max_height,
        config.canvas.growth_margin
    );

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
