use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::v1;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the full router with application state
///
/// Every response carries an `x-request-id`, generated when the client did
/// not send one.
pub fn create_router(state: AppState, metrics: Option<PrometheusMetrics>, cors: bool) -> Router {
    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // OpenAI-compatible v1 API
        .nest("/v1", v1::create_v1_router())
        // Admin API
        .nest("/admin", admin::create_admin_router())
        .with_state(state);

    if let Some(metrics) = metrics {
        router = router.merge(create_metrics_router(metrics));
    }

    if cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::state::test_support::{cached_state, simple_model, state_with, ADMIN_KEY};
    use crate::domain::llm::MockModelAdapter;
    use crate::domain::{ComplexityTier, ModelProfile};

    fn app(state: AppState) -> Router {
        create_router(state, None, false)
    }

    fn chat_body(text: &str, stream: bool) -> Body {
        Body::from(
            json!({
                "model": "auto",
                "messages": [{"role": "user", "content": text}],
                "stream": stream
            })
            .to_string(),
        )
    }

    fn post_json(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    fn admin(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn wait_for_entries(state: &AppState, expected: usize) {
        let cache = state.cache().unwrap();
        for _ in 0..100 {
            if cache.size().await.unwrap() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache never reached {} entries", expected);
    }

    #[tokio::test]
    async fn test_chat_completion_json_with_router_headers() {
        let state = cached_state("Use the reset link");

        let response = app(state)
            .oneshot(post_json("/v1/chat/completions", chat_body("How do I reset my password?", false)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["x-router-tier"], "simple");
        assert_eq!(headers["x-router-cache-hit"], "false");
        assert_eq!(headers["x-router-cache-status"], "miss");
        assert_eq!(headers["x-router-model"], "mock/small");
        assert_eq!(headers["x-router-attempts"], "1");
        assert!(headers.contains_key("x-router-latency-ms"));
        assert!(headers.contains_key("x-request-id"));

        let body = body_json(response).await;
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["model"], "mock/small");
        assert_eq!(body["choices"][0]["message"]["content"], "Use the reset link");
    }

    #[tokio::test]
    async fn test_repeated_query_is_served_from_cache() {
        let state = cached_state("Use the reset link");
        let router = app(state.clone());

        router
            .clone()
            .oneshot(post_json("/v1/chat/completions", chat_body("How do I reset my password?", false)))
            .await
            .unwrap();
        wait_for_entries(&state, 1).await;

        let response = router
            .oneshot(post_json("/v1/chat/completions", chat_body("How do I reset my password?", false)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-router-cache-hit"], "true");
        assert_eq!(response.headers()["x-router-attempts"], "0");
        let body = body_json(response).await;
        assert_eq!(body["choices"][0]["message"]["content"], "Use the reset link");
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let mut request = post_json("/v1/chat/completions", chat_body("hello", false));
        request
            .headers_mut()
            .insert("x-request-id", "req-123".parse().unwrap());

        let response = app(cached_state("hi")).oneshot(request).await.unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-123");
        let body = body_json(response).await;
        assert_eq!(body["id"], "chatcmpl-req-123");
    }

    #[tokio::test]
    async fn test_chat_completion_streams_sse() {
        let response = app(cached_state("Use the reset link"))
            .oneshot(post_json("/v1/chat/completions", chat_body("reset password", true)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()["x-router-tier"], "simple");

        let text = body_text(response).await;
        assert!(text.contains("chat.completion.chunk"));
        assert!(text.contains("reset "));
        assert!(text.trim_end().ends_with("data: [DONE]"));
    }

    #[tokio::test]
    async fn test_empty_messages_is_bad_request() {
        let body = Body::from(json!({"messages": []}).to_string());

        let response = app(cached_state("hi"))
            .oneshot(post_json("/v1/chat/completions", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["param"], "messages");
    }

    #[tokio::test]
    async fn test_all_models_failing_is_bad_gateway() {
        let failing = simple_model("small", "unused").with_error("connection refused");
        let state = state_with(vec![Arc::new(failing)], None);

        let response = app(state)
            .oneshot(post_json("/v1/chat/completions", chat_body("hello", false)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "upstream_exhausted");
    }

    #[tokio::test]
    async fn test_list_models_includes_profiles() {
        let large = MockModelAdapter::new(
            ModelProfile::new("mock", "large", ComplexityTier::Reasoning).with_cost(10.0),
        );
        let state = state_with(
            vec![Arc::new(simple_model("small", "hi")), Arc::new(large)],
            None,
        );

        let response = app(state)
            .oneshot(Request::get("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["object"], "list");
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"mock/small"));
        assert!(ids.contains(&"mock/large"));
    }

    #[tokio::test]
    async fn test_admin_requires_key() {
        let response = app(cached_state("hi"))
            .oneshot(
                Request::post("/admin/cache/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_clear_cache_reports_count() {
        let state = cached_state("Use the reset link");
        let router = app(state.clone());

        router
            .clone()
            .oneshot(post_json("/v1/chat/completions", chat_body("reset password", false)))
            .await
            .unwrap();
        wait_for_entries(&state, 1).await;

        let response = router
            .clone()
            .oneshot(admin(Method::POST, "/admin/cache/clear"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(state.cache().unwrap().size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cache_is_clear_alias() {
        let response = app(cached_state("hi"))
            .oneshot(admin(Method::DELETE, "/admin/cache"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_clear_without_cache_is_server_error() {
        let state = state_with(vec![Arc::new(simple_model("small", "hi"))], None);

        let response = app(state)
            .oneshot(admin(Method::POST, "/admin/cache/clear"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let response = app(cached_state("hi"))
            .oneshot(admin(Method::GET, "/admin/cache/stats"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["entries"], 0);
    }

    #[tokio::test]
    async fn test_purge_cache() {
        let response = app(cached_state("hi"))
            .oneshot(admin(Method::POST, "/admin/cache/purge"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_route_preview() {
        let mut request = post_json(
            "/admin/route/preview",
            Body::from(json!({"query": "How do I reset my password?"}).to_string()),
        );
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {}", ADMIN_KEY).parse().unwrap(),
        );

        let response = app(cached_state("hi")).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["tier"], "simple");
        assert_eq!(body["candidates"], json!(["mock/small"]));
        assert_eq!(body["cache_enabled"], true);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let router = app(cached_state("hi"));

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let live = router
            .clone()
            .oneshot(Request::get("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(live.status(), StatusCode::OK);

        let ready = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::OK);
        let body = body_json(ready).await;
        assert_eq!(body["checks"][1]["name"], "semantic_cache");
    }
}
