pub mod config;
pub mod drawing;
pub mod error;
pub mod id;
pub mod protocol;
pub mod room;
pub mod session;
pub mod websocket;

use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use room::RoomRegistry;
use session::{Broadcaster, InMemoryBroadcaster, SessionHandler};

/// Application state shared across all connections
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub sessions: Arc<SessionHandler>,
}

impl AppState {
    pub fn new(registry: Arc<RoomRegistry>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        let sessions = Arc::new(SessionHandler::new(Arc::clone(&registry), broadcaster));
        Self { registry, sessions }
    }

    /// State backed by the in-process broadcaster
    pub fn in_memory(registry: RoomRegistry) -> Self {
        Self::new(Arc::new(registry), Arc::new(InMemoryBroadcaster::new()))
    }
}

/// Build the HTTP router: `/ws`, `/health`, and optionally static files at `/`
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(websocket::handler::ws_handler))
        .route("/health", get(health));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
