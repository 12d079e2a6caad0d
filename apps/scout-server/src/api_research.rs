use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use scout_protocol::{ConfigUpdate, DriveOverride, TriggerResponse};

use crate::{responses, AppState};

/// Current drive values, impetus, threshold, rates, and engine run state.
#[utoipa::path(get, path = "/state/research/{user}", tag = "Research",
    responses((status = 200, body = scout_protocol::ResearchStatus)))]
pub async fn research_status(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.status().await {
        Ok(status) => Json(status).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Update threshold and/or decay rates; applies on the next tick.
#[utoipa::path(post, path = "/research/{user}/config", tag = "Research",
    request_body = ConfigUpdate,
    responses((status = 200, body = scout_protocol::ResearchStatus), (status = 400)))]
pub async fn research_config(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(update): Json<ConfigUpdate>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.set_config(update).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Direct drive override; every value must be within `[0,1]`.
#[utoipa::path(post, path = "/research/{user}/drives", tag = "Research",
    request_body = DriveOverride,
    responses((status = 200, body = scout_protocol::ResearchStatus), (status = 400)))]
pub async fn research_drives(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(update): Json<DriveOverride>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.override_drives(update).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Conversation-activity stimulus; bumps curiosity.
#[utoipa::path(post, path = "/research/{user}/activity", tag = "Research",
    responses((status = 202)))]
pub async fn research_activity(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.record_activity().await {
        Ok(()) => (axum::http::StatusCode::ACCEPTED, Json(json!({"ok": true}))).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Manual "research now": starts cycles for eligible active topics,
/// bypassing the impetus threshold.
#[utoipa::path(post, path = "/research/{user}/trigger", tag = "Research",
    responses((status = 200, body = TriggerResponse)))]
pub async fn research_trigger(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.trigger().await {
        Ok(topics_researched) => Json(TriggerResponse { topics_researched }).into_response(),
        Err(err) => responses::engine_error(err),
    }
}
