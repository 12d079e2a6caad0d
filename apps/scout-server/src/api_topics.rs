use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use scout_protocol::{ProposeResponse, TopicCandidate};

use crate::{responses, AppState};

/// Suggest or hand-create a topic; activates immediately when a slot is
/// free, otherwise parks it.
#[utoipa::path(post, path = "/topics/{user}", tag = "Topics",
    request_body = TopicCandidate,
    responses((status = 200, body = ProposeResponse)))]
pub async fn topic_create(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(candidate): Json<TopicCandidate>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.propose(candidate).await {
        Ok((topic, outcome)) => Json(ProposeResponse { topic, outcome }).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// All topics for a user, newest first.
#[utoipa::path(get, path = "/topics/{user}", tag = "Topics",
    responses((status = 200, body = [scout_protocol::Topic])))]
pub async fn topic_list(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.list_topics().await {
        Ok(topics) => Json(topics).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Activate a topic. Fails with a distinct capacity payload when all slots
/// are taken.
#[utoipa::path(post, path = "/topics/{user}/{topic}/enable", tag = "Topics",
    responses((status = 200, body = scout_protocol::Topic), (status = 409), (status = 404)))]
pub async fn topic_enable(
    State(state): State<AppState>,
    Path((user, topic)): Path<(String, String)>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.enable(topic).await {
        Ok(topic) => Json(topic).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

#[utoipa::path(post, path = "/topics/{user}/{topic}/disable", tag = "Topics",
    responses((status = 200, body = scout_protocol::Topic), (status = 404)))]
pub async fn topic_disable(
    State(state): State<AppState>,
    Path((user, topic)): Path<(String, String)>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.disable(topic).await {
        Ok(topic) => Json(topic).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Delete a topic and its findings; frees its slot without promoting any
/// parked topic.
#[utoipa::path(delete, path = "/topics/{user}/{topic}", tag = "Topics",
    responses((status = 200), (status = 404)))]
pub async fn topic_delete(
    State(state): State<AppState>,
    Path((user, topic)): Path<(String, String)>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.delete(topic).await {
        Ok(topic) => Json(json!({"deleted": topic.topic_id})).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Bulk delete of every topic belonging to a session.
#[utoipa::path(delete, path = "/topics/{user}/session/{session}", tag = "Topics",
    responses((status = 200)))]
pub async fn topic_delete_session(
    State(state): State<AppState>,
    Path((user, session)): Path<(String, String)>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.delete_session(session).await {
        Ok(removed) => Json(json!({"removed": removed})).into_response(),
        Err(err) => responses::engine_error(err),
    }
}

/// Remove duplicate topics sharing a name.
#[utoipa::path(post, path = "/topics/{user}/cleanup", tag = "Topics",
    responses((status = 200)))]
pub async fn topic_cleanup(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let actor = state.engine().user(&user).await;
    match actor.cleanup_duplicates().await {
        Ok(removed) => Json(json!({"removed": removed})).into_response(),
        Err(err) => responses::engine_error(err),
    }
}
