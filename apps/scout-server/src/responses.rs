use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use scout_engine::EngineError;

pub fn problem(status: StatusCode, title: &str, detail: Option<String>) -> axum::response::Response {
    (
        status,
        Json(json!({
            "type": "about:blank",
            "title": title,
            "status": status.as_u16(),
            "detail": detail,
        })),
    )
        .into_response()
}

/// Map engine errors to HTTP problem payloads. Capacity violations get their
/// own code and the numbers the client renders; they must never look like a
/// generic failure.
pub fn engine_error(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::CapacityExceeded { active_count, cap } => (
            StatusCode::CONFLICT,
            Json(json!({
                "type": "about:blank",
                "title": "Active Topic Capacity Exceeded",
                "status": 409,
                "code": "capacity_exceeded",
                "detail": format!("{active_count} of {cap} research slots are in use; disable a topic first"),
                "active_count": active_count,
                "cap": cap,
            })),
        )
            .into_response(),
        EngineError::TopicNotFound(id) => problem(
            StatusCode::NOT_FOUND,
            "Topic Not Found",
            Some(format!("no topic with id {id}; refresh the topic list")),
        ),
        EngineError::FindingNotFound(id) => problem(
            StatusCode::NOT_FOUND,
            "Finding Not Found",
            Some(format!("no finding with id {id}")),
        ),
        EngineError::InvalidValue { field, value, expected } => problem(
            StatusCode::BAD_REQUEST,
            "Invalid Value",
            Some(format!("{field} = {value} is out of range (expected {expected})")),
        ),
        EngineError::ActorUnavailable(user) => problem(
            StatusCode::SERVICE_UNAVAILABLE,
            "Engine Unavailable",
            Some(format!("research engine for {user} is not available")),
        ),
        other => problem(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Error",
            Some(other.to_string()),
        ),
    }
}
