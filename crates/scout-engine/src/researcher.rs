//! Seam to the external search/synthesis collaborator.

use async_trait::async_trait;
use serde_json::Value;

use scout_protocol::Topic;

use crate::error::EngineError;

/// What one research cycle produces on success.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    /// Quality of the synthesis, in `[0,1]`; feeds drive satisfaction.
    pub quality_score: f64,
    /// Synthesized content; opaque to the engine.
    pub content: Value,
    pub key_insights: Vec<String>,
    pub sources: Vec<String>,
}

/// External multi-source search and synthesis. Long-running; the dispatcher
/// always awaits it off the actor's message loop.
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, topic: &Topic) -> Result<CycleOutput, EngineError>;
}
