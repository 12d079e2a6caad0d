use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// RFC7807-style error payload used at service edges.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, ToSchema)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: Option<String>,
    pub code: Option<String>,
}

/// A research topic suggested from conversation or created by hand.
///
/// `is_active_research` marks whether the topic currently counts against the
/// per-user capacity cap; a parked topic keeps `false` until explicitly
/// enabled.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, ToSchema)]
pub struct Topic {
    pub topic_id: String,
    pub session_id: String,
    pub name: String,
    pub description: String,
    pub confidence_score: f64,
    /// RFC3339 time the topic was suggested.
    pub suggested_at: String,
    pub is_active_research: bool,
}

/// Output of one successful research cycle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema, ToSchema)]
pub struct ResearchFinding {
    pub finding_id: String,
    pub topic_id: String,
    pub topic_name: String,
    pub quality_score: f64,
    /// RFC3339 time the cycle completed.
    pub research_time: String,
    pub read: bool,
    pub bookmarked: bool,
    pub integrated: bool,
    /// Synthesized content; opaque to the engine.
    pub content: Value,
}

/// The four bounded drive scalars, each clamped to `[0,1]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, JsonSchema, ToSchema)]
pub struct Drives {
    pub boredom: f64,
    pub curiosity: f64,
    pub tiredness: f64,
    pub satisfaction: f64,
}

/// Per-second drive rates; all non-negative.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, JsonSchema, ToSchema)]
pub struct DriveRates {
    pub boredom_rate: f64,
    pub curiosity_decay: f64,
    pub tiredness_decay: f64,
    pub satisfaction_decay: f64,
}

/// Snapshot returned by the status read.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, ToSchema)]
pub struct ResearchStatus {
    pub user_id: String,
    pub running: bool,
    pub drives: Drives,
    /// Derived on read; may be negative.
    pub impetus: f64,
    pub threshold: f64,
    pub rates: DriveRates,
    pub active_topics: usize,
    pub running_cycles: usize,
    pub updated_ms: u64,
}

/// Partial reconfiguration of threshold and rates.
#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema, ToSchema)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub boredom_rate: Option<f64>,
    #[serde(default)]
    pub curiosity_decay: Option<f64>,
    #[serde(default)]
    pub tiredness_decay: Option<f64>,
    #[serde(default)]
    pub satisfaction_decay: Option<f64>,
}

/// Direct drive override; every provided value must be in `[0,1]`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema, ToSchema)]
pub struct DriveOverride {
    #[serde(default)]
    pub boredom: Option<f64>,
    #[serde(default)]
    pub curiosity: Option<f64>,
    #[serde(default)]
    pub tiredness: Option<f64>,
    #[serde(default)]
    pub satisfaction: Option<f64>,
}

/// Candidate produced by the topic-extraction collaborator or a manual
/// custom-topic form.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, ToSchema)]
pub struct TopicCandidate {
    pub session_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// Result of proposing a new topic for activation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionOutcome {
    Activated,
    Parked,
}

impl AdmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Activated => "activated",
            AdmissionOutcome::Parked => "parked",
        }
    }
}

/// Response to a topic proposal.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, ToSchema)]
pub struct ProposeResponse {
    pub topic: Topic,
    pub outcome: AdmissionOutcome,
}

/// Response to a manual trigger request.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, ToSchema)]
pub struct TriggerResponse {
    pub topics_researched: usize,
}

/// Capacity details attached to a capacity-exceeded problem payload.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, JsonSchema, ToSchema)]
pub struct CapacityInfo {
    pub active_count: usize,
    pub cap: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_match_type_names() {
        assert_eq!(<Topic as ToSchema>::name(), "Topic");
        assert_eq!(<ResearchFinding as ToSchema>::name(), "ResearchFinding");
        assert_eq!(<ResearchStatus as ToSchema>::name(), "ResearchStatus");
        assert_eq!(<ProposeResponse as ToSchema>::name(), "ProposeResponse");
        assert_eq!(<TriggerResponse as ToSchema>::name(), "TriggerResponse");
    }

    #[test]
    fn findings_compare_by_value() {
        let finding = ResearchFinding {
            finding_id: "f1".into(),
            topic_id: "t1".into(),
            topic_name: "caches".into(),
            quality_score: 0.6,
            research_time: "2026-01-01T00:00:00.000Z".into(),
            read: false,
            bookmarked: false,
            integrated: false,
            content: serde_json::json!({"summary": "stub"}),
        };
        assert_eq!(finding, finding.clone());
    }
}
