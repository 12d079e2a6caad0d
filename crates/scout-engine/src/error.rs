use thiserror::Error;

/// Engine error taxonomy.
///
/// `CapacityExceeded` is user-actionable and carries the numbers needed for
/// direct display. `CycleInProgress` is an internal skip signal and never
/// reaches callers of the trigger surface.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("active topic capacity exceeded ({active_count}/{cap})")]
    CapacityExceeded { active_count: usize, cap: usize },
    #[error("topic not found: {0}")]
    TopicNotFound(String),
    #[error("finding not found: {0}")]
    FindingNotFound(String),
    #[error("research cycle already in progress for topic {0}")]
    CycleInProgress(String),
    #[error("research cycle failed: {0}")]
    CycleFailed(String),
    #[error("invalid value for {field}: {value} (expected {expected})")]
    InvalidValue {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("engine actor unavailable for user {0}")]
    ActorUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_signal_names_the_topic() {
        let err = EngineError::CycleInProgress("t-42".into());
        assert!(err.to_string().contains("t-42"));
    }
}
