//! API Router configuration

pub mod handlers;
pub mod middleware;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        .route("/status", get(handlers::system_status))
        .route("/evolution/status", get(handlers::evolution_status))
        .route("/evolution/trigger", post(handlers::trigger_evolution))
        .route("/evolution/history", get(handlers::evolution_history))
        .route("/evolution/metrics", post(handlers::record_metrics));

    // Build router with middleware
    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::record_request_metrics,
        ))
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlersConfig;
    use crate::error::ApiError;
    use crate::server::build_registry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use jarvis_evolution::{EngineConfig, EvolutionEngine};
    use jarvis_storage::MemoryHistory;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn state() -> AppState {
        let engine = EvolutionEngine::open(
            EngineConfig::default(),
            Arc::new(MemoryHistory::new()),
            build_registry(&HandlersConfig::default()),
        )
        .await
        .unwrap();
        AppState::new(Arc::new(engine))
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state.clone(), true).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn router_regression() -> Value {
        let base = chrono::Utc::now() - chrono::Duration::seconds(100);
        let values = [100.0, 100.0, 100.0, 100.0, 150.0, 160.0, 170.0, 180.0];
        let samples: Vec<Value> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                json!({
                    "module": "router",
                    "metric_name": "latency_ms",
                    "value": v,
                    "timestamp": (base + chrono::Duration::seconds(i as i64)).to_rfc3339(),
                })
            })
            .collect();
        json!({ "samples": samples })
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let state = state().await;
        let (status, body) = send(&state, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(&state, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("online"));
    }

    #[tokio::test]
    async fn test_system_status_reports_paused_evolution() {
        let state = state().await;
        let (status, body) = send(&state, get("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["modules"]["evolution"], "paused");

        state.engine.set_active(true);
        let (_, body) = send(&state, get("/api/status")).await;
        assert_eq!(body["modules"]["evolution"], "active");
    }

    #[tokio::test]
    async fn test_trigger_applies_router_improvement() {
        let state = state().await;
        let (status, body) = send(&state, post_json("/api/evolution/metrics", router_regression())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["recorded"], 8);

        let (status, body) = send(&state, post_json("/api/evolution/trigger", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        let summary = &body["improvements"];
        assert_eq!(summary["success"], true);
        assert_eq!(summary["improvements_identified"], 1);
        assert_eq!(summary["improvements_applied"], 1);
        assert_eq!(summary["evolution_log_size"], 1);
        assert_eq!(summary["learning_patterns"], 1);
        assert_eq!(summary["improvements"][0]["type"], "performance_enhancement");
        assert_eq!(summary["improvements"][0]["priority"], "high");
        assert_eq!(summary["improvements"][0]["target_module"], "router");

        let (_, status_body) = send(&state, get("/api/evolution/status")).await;
        assert_eq!(status_body["total_evolutions"], 1);
        assert_eq!(status_body["learning_patterns"], 1);
        assert_eq!(status_body["evolution_active"], false);
        assert_eq!(status_body["state"], "idle");
    }

    #[tokio::test]
    async fn test_history_newest_first_and_by_module() {
        let state = state().await;
        send(&state, post_json("/api/evolution/trigger", json!({}))).await;
        send(&state, post_json("/api/evolution/metrics", router_regression())).await;
        let (_, trigger) = send(&state, post_json("/api/evolution/trigger", json!({}))).await;

        let (status, body) = send(&state, get("/api/evolution/history")).await;
        assert_eq!(status, StatusCode::OK);
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["evolution_id"], trigger["improvements"]["evolution_id"]);
        assert_eq!(history[0]["improvement"]["target_module"], "router");
        assert_eq!(history[0]["trigger"], "manual");
        assert!(history[1]["improvement"].is_null());

        let (_, body) = send(&state, get("/api/evolution/history?limit=1")).await;
        assert_eq!(body["history"].as_array().unwrap().len(), 1);

        let (_, body) = send(&state, get("/api/evolution/history?module=router")).await;
        assert_eq!(body["history"].as_array().unwrap().len(), 1);

        let (_, body) = send(&state, get("/api/evolution/history?module=memory")).await;
        assert!(body["history"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_input_is_rejected() {
        let state = state().await;
        let (status, body) = send(&state, get("/api/evolution/history?limit=lots")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");

        let sample = json!({"module": " ", "metric_name": "latency_ms", "value": 1.0});
        let (status, _) = send(&state, post_json("/api/evolution/metrics", sample)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&state, post_json("/api/evolution/metrics", json!({"value": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_single_sample_is_accepted() {
        let state = state().await;
        let sample = json!({"module": "memory", "metric_name": "resource_load", "value": 0.4});
        let (status, body) = send(&state, post_json("/api/evolution/metrics", sample)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["recorded"], 1);
    }

    #[tokio::test]
    async fn test_requests_are_recorded_as_http_metrics() {
        let state = state().await;
        send(&state, get("/health")).await;

        let snapshot = state.engine.metrics().snapshot();
        let http: Vec<_> = snapshot
            .samples()
            .iter()
            .filter(|s| s.module == middleware::HTTP_MODULE)
            .collect();
        assert_eq!(http.len(), 2);
        assert!(http.iter().any(|s| s.metric_name == "success_rate" && s.value == 1.0));
    }

    #[tokio::test]
    async fn test_status_polling_does_not_trigger_http_improvements() {
        let state = state().await;
        for _ in 0..5 {
            for _ in 0..6 {
                send(&state, get("/api/evolution/status")).await;
            }
            let (status, body) = send(&state, post_json("/api/evolution/trigger", json!({}))).await;
            assert_eq!(status, StatusCode::OK);
            let improvements = body["improvements"]["improvements"].as_array().unwrap();
            assert!(improvements.iter().all(|i| i["target_module"] != middleware::HTTP_MODULE));
        }
    }

    #[tokio::test]
    async fn test_busy_maps_to_conflict() {
        let response = ApiError::Busy.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "busy");
    }
}
