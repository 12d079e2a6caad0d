use std::sync::Arc;
use std::time::Duration;

use scout_engine::ResearchEngine;
use scout_events::NotifyHub;

#[derive(Clone)]
pub(crate) struct AppState {
    engine: Arc<ResearchEngine>,
    heartbeat_interval: Duration,
}

impl AppState {
    pub fn new(engine: Arc<ResearchEngine>, heartbeat_interval: Duration) -> Self {
        Self {
            engine,
            heartbeat_interval,
        }
    }

    pub fn engine(&self) -> &Arc<ResearchEngine> {
        &self.engine
    }

    pub fn hub(&self) -> Arc<NotifyHub> {
        self.engine.hub()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }
}
