use axum::{
    routing::{delete, get, post},
    Router,
};
use serde_json::json;

use crate::{
    api_engine, api_findings, api_research, api_topics, ws, AppState,
};

pub fn build() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(|| async { axum::Json(json!({"ok": true})) }))
        .route("/state/research/{user}", get(api_research::research_status))
        .route("/research/{user}/config", post(api_research::research_config))
        .route("/research/{user}/drives", post(api_research::research_drives))
        .route("/research/{user}/activity", post(api_research::research_activity))
        .route("/research/{user}/trigger", post(api_research::research_trigger))
        .route(
            "/topics/{user}",
            get(api_topics::topic_list).post(api_topics::topic_create),
        )
        .route("/topics/{user}/cleanup", post(api_topics::topic_cleanup))
        .route(
            "/topics/{user}/session/{session}",
            delete(api_topics::topic_delete_session),
        )
        .route("/topics/{user}/{topic}", delete(api_topics::topic_delete))
        .route("/topics/{user}/{topic}/enable", post(api_topics::topic_enable))
        .route("/topics/{user}/{topic}/disable", post(api_topics::topic_disable))
        .route("/findings/{user}", get(api_findings::finding_list))
        .route(
            "/findings/{user}/topic/{topic}",
            delete(api_findings::finding_delete_topic),
        )
        .route(
            "/findings/{user}/{finding}",
            delete(api_findings::finding_delete),
        )
        .route(
            "/findings/{user}/{finding}/read",
            post(api_findings::finding_read),
        )
        .route(
            "/findings/{user}/{finding}/bookmark",
            post(api_findings::finding_bookmark),
        )
        .route(
            "/findings/{user}/{finding}/integrate",
            post(api_findings::finding_integrate),
        )
        .route("/engine/{user}/start", post(api_engine::engine_start))
        .route("/engine/{user}/stop", post(api_engine::engine_stop))
        .route("/engine/{user}/restart", post(api_engine::engine_restart))
        .route("/ws/{user}", get(ws::channel_ws))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use scout_engine::{EngineConfig, ResearchEngine};
    use scout_events::NotifyHub;

    use super::*;
    use crate::researcher::StubResearcher;

    fn app() -> Router {
        let hub = Arc::new(NotifyHub::default());
        let researcher = Arc::new(StubResearcher::new(Duration::from_millis(1)));
        let engine = ResearchEngine::new(EngineConfig::default(), researcher, hub);
        build().with_state(AppState::new(engine, Duration::from_secs(1)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&v).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn candidate(name: &str) -> Value {
        json!({"session_id": "s1", "name": name, "confidence_score": 0.8})
    }

    #[tokio::test]
    async fn capacity_error_surfaces_distinctly() {
        let app = app();
        let mut sixth_id = String::new();
        for i in 0..6 {
            let (status, body) =
                send(&app, "POST", "/topics/uma", Some(candidate(&format!("t{i}")))).await;
            assert_eq!(status, StatusCode::OK);
            if i == 5 {
                assert_eq!(body["outcome"], "parked");
                sixth_id = body["topic"]["topic_id"].as_str().unwrap().to_string();
            } else {
                assert_eq!(body["outcome"], "activated");
            }
        }

        let (status, body) = send(
            &app,
            "POST",
            &format!("/topics/uma/{sixth_id}/enable"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "capacity_exceeded");
        assert_eq!(body["active_count"], 5);
        assert_eq!(body["cap"], 5);

        // The sixth topic stayed parked.
        let (_, topics) = send(&app, "GET", "/topics/uma", None).await;
        let parked = topics
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["topic_id"] == sixth_id.as_str())
            .unwrap();
        assert_eq!(parked["is_active_research"], false);
    }

    #[tokio::test]
    async fn status_reads_and_empty_trigger() {
        let app = app();
        let (status, body) = send(&app, "GET", "/state/research/vic", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["running"], true);
        assert_eq!(body["impetus"], 0.0);
        assert_eq!(body["threshold"], 1.0);

        let (status, body) = send(&app, "POST", "/research/vic/trigger", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["topics_researched"], 0);
    }

    #[tokio::test]
    async fn out_of_range_override_is_rejected() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/research/wes/drives",
            Some(json!({"boredom": 2.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["title"], "Invalid Value");
    }

    #[tokio::test]
    async fn unknown_topic_is_not_found() {
        let app = app();
        let (status, _) = send(&app, "POST", "/topics/xan/nope/enable", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn engine_stop_and_restart_roundtrip() {
        let app = app();
        let (_, stopped) = send(&app, "POST", "/engine/yui/stop", None).await;
        assert_eq!(stopped["running"], false);
        let (_, resumed) = send(&app, "POST", "/engine/yui/restart", None).await;
        assert_eq!(resumed["running"], true);
    }

    #[tokio::test]
    async fn marking_findings_read_is_idempotent_over_http() {
        let app = app();
        let (_, body) = send(&app, "POST", "/topics/zoe", Some(candidate("caches"))).await;
        assert_eq!(body["outcome"], "activated");

        let (_, trigger) = send(&app, "POST", "/research/zoe/trigger", None).await;
        assert_eq!(trigger["topics_researched"], 1);

        // Wait for the stubbed cycle to complete.
        let finding_id = loop {
            let (_, listing) = send(&app, "GET", "/findings/zoe", None).await;
            let findings = listing["findings"].as_array().unwrap().clone();
            if let Some(f) = findings.first() {
                break f["finding_id"].as_str().unwrap().to_string();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        };

        let uri = format!("/findings/zoe/{finding_id}/read");
        let (status, first) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["read"], true);
        let (status, second) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["read"], true);

        let (_, listing) = send(&app, "GET", "/findings/zoe", None).await;
        assert_eq!(listing["unread"], 0);
    }
}
