use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::{responses, AppState};

/// Resume decay and dispatch from the last known drive values.
#[utoipa::path(post, path = "/engine/{user}/start", tag = "Engine",
    responses((status = 200, body = scout_protocol::ResearchStatus)))]
pub async fn engine_start(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.start().await {
        Ok(status) => Json(status).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Freeze drives and stop starting cycles; in-flight cycles drain.
#[utoipa::path(post, path = "/engine/{user}/stop", tag = "Engine",
    responses((status = 200, body = scout_protocol::ResearchStatus)))]
pub async fn engine_stop(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.stop().await {
        Ok(status) => Json(status).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

#[utoipa::path(post, path = "/engine/{user}/restart", tag = "Engine",
    responses((status = 200, body = scout_protocol::ResearchStatus)))]
pub async fn engine_restart(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.restart().await {
        Ok(status) => Json(status).into_response(),
        Err(err) => responses::engine_error(err),
    }
}
