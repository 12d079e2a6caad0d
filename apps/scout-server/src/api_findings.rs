use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::{responses, AppState};

/// Findings for a user, newest first.
#[utoipa::path(get, path = "/findings/{user}", tag = "Findings",
    responses((status = 200, body = [scout_protocol::ResearchFinding])))]
pub async fn finding_list(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let findings = state.engine().list_findings(&user).await;
    let unread = findings.iter().filter(|f| !f.read).count();
    Json(json!({"findings": findings, "unread": unread}))
}

/// Idempotent: marking an already-read finding succeeds unchanged.
#[utoipa::path(post, path = "/findings/{user}/{finding}/read", tag = "Findings",
    responses((status = 200, body = scout_protocol::ResearchFinding), (status = 404)))]
pub async fn finding_read(
    State(state): State<AppState>,
    Path((user, finding)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.engine().mark_finding_read(&user, &finding).await {
        Ok(finding) => Json(finding).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

#[utoipa::path(post, path = "/findings/{user}/{finding}/bookmark", tag = "Findings",
    responses((status = 200, body = scout_protocol::ResearchFinding), (status = 404)))]
pub async fn finding_bookmark(
    State(state): State<AppState>,
    Path((user, finding)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.engine().mark_finding_bookmarked(&user, &finding).await {
        Ok(finding) => Json(finding).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

#[utoipa::path(post, path = "/findings/{user}/{finding}/integrate", tag = "Findings",
    responses((status = 200, body = scout_protocol::ResearchFinding), (status = 404)))]
pub async fn finding_integrate(
    State(state): State<AppState>,
    Path((user, finding)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.engine().mark_finding_integrated(&user, &finding).await {
        Ok(finding) => Json(finding).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

#[utoipa::path(delete, path = "/findings/{user}/{finding}", tag = "Findings",
    responses((status = 200), (status = 404)))]
pub async fn finding_delete(
    State(state): State<AppState>,
    Path((user, finding)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.engine().delete_finding(&user, &finding).await {
        Ok(finding) => Json(json!({"deleted": finding.finding_id})).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Bulk delete of every finding for one topic.
#[utoipa::path(delete, path = "/findings/{user}/topic/{topic}", tag = "Findings",
    responses((status = 200)))]
pub async fn finding_delete_topic(
    State(state): State<AppState>,
    Path((user, topic)): Path<(String, String)>,
) -> impl IntoResponse {
    let removed = state.engine().delete_findings_for_topic(&user, &topic).await;
    Json(json!({"removed": removed}))
}
