//! World Director - autonomous content and event director
//!
//! The director:
//! - Generates characters, items, quests and locations through a layered pipeline
//! - Gates proposals behind validation and optional human approval
//! - Runs timed world events and grows the map chunk by chunk
//! - Rolls its own personality on a tick to act without being asked
//! - Serves a control panel over HTTP and WebSocket

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::services::AutomationLoop;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::http;
use crate::infrastructure::state::AppState;
use crate::infrastructure::workers::{event_sweep_worker, guardrail_change_worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "world_director=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting World Director");

    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Database: {}", config.database_url);
    tracing::info!(
        "  Backend: {}",
        config.backend_base_url.as_deref().unwrap_or("(routing table only)")
    );

    let state = Arc::new(AppState::new(config).await?);
    tracing::info!("Application state initialized");

    let director = state.director.clone();
    let config = &state.config;

    let automation_worker = {
        let automation = Arc::new(AutomationLoop::new(director.clone(), config.automation_seed));
        let period = Duration::from_secs(config.tick_interval_secs.max(1));
        tokio::spawn(automation.run(period))
    };

    let sweep_worker = tokio::spawn(event_sweep_worker(
        director.clone(),
        Duration::from_secs(config.sweep_interval_secs.max(1)),
    ));

    let activity_worker = {
        let activity = director.activity();
        let events = director.subscribe_domain_events();
        tokio::spawn(async move {
            tracing::info!("Starting activity subscriber");
            activity.run_subscriber(events).await;
        })
    };

    let decay_worker = tokio::spawn(
        director
            .activity()
            .run_decay(Duration::from_secs(config.decay_interval_secs.max(1))),
    );

    let watcher_worker = {
        let guardrails = director.guardrail_service();
        let period = Duration::from_secs(config.config_poll_interval_secs.max(1));
        tokio::spawn(async move {
            tracing::info!("Watching guardrail config every {:?}", period);
            guardrails.run_watcher(period).await;
        })
    };

    let guardrail_log_worker = tokio::spawn(guardrail_change_worker(director.clone()));

    tracing::info!("Background workers started");

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(infrastructure::websocket::ws_handler))
        .merge(http::create_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping workers...");
            automation_worker.abort();
            sweep_worker.abort();
            activity_worker.abort();
            decay_worker.abort();
            watcher_worker.abort();
            guardrail_log_worker.abort();
            tracing::info!("Workers stopped");
        }
    }

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
