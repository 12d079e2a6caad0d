//! Placeholder search/synthesis collaborator.
//!
//! The production deployment wires a real multi-source search service behind
//! `scout_engine::Researcher`; this stub keeps the engine runnable without
//! one. Latency is simulated so dispatcher concurrency behaves realistically.

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Duration;

use scout_engine::{CycleOutput, EngineError, Researcher};
use scout_protocol::Topic;

pub struct StubResearcher {
    latency: Duration,
}

impl StubResearcher {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for StubResearcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[async_trait]
impl Researcher for StubResearcher {
    async fn research(&self, topic: &Topic) -> Result<CycleOutput, EngineError> {
        tokio::time::sleep(self.latency).await;
        // Quality tracks suggestion confidence so drive feedback stays
        // plausible end to end.
        let quality = (0.4 + 0.5 * topic.confidence_score).clamp(0.0, 1.0);
        Ok(CycleOutput {
            quality_score: quality,
            content: json!({
                "summary": format!("Background notes on {}", topic.name),
                "topic_id": topic.topic_id,
            }),
            key_insights: vec![format!("{} is worth a deeper look", topic.name)],
            sources: Vec::new(),
        })
    }
}
