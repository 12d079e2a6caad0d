use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod api_engine;
mod api_findings;
mod api_research;
mod api_topics;
mod app_state;
mod clock;
mod config;
mod researcher;
mod responses;
mod router;
mod tasks;
mod ws;

pub(crate) use app_state::AppState;

use scout_engine::ResearchEngine;
use scout_events::NotifyHub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("SCOUT_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    let _ = fmt().with_env_filter(filter).try_init();

    let cfg = config::ServerConfig::from_env()?;
    let hub = Arc::new(NotifyHub::new(cfg.channel_capacity));
    let researcher = Arc::new(researcher::StubResearcher::default());
    let engine = ResearchEngine::new(cfg.engine_config(), researcher, hub);

    let state = AppState::new(engine.clone(), cfg.heartbeat_interval);
    let mut manager = tasks::TaskManager::new();
    manager.push(clock::start(state.clone()));

    let app = router::build()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    info!(addr = %cfg.addr, tick_secs = cfg.tick_interval.as_secs(), "scout-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    manager.shutdown_with_grace(Duration::from_secs(2)).await;
    engine.shutdown().await;
    Ok(())
}
